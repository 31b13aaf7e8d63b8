//! `narrator-project` -- durable library storage for the narrator engine.
//!
//! - **Stores**: [`DocumentStore`] with a directory-backed [`JsonDirStore`]
//!   and an in-process [`MemoryStore`]
//! - **Adapter**: [`PersistenceAdapter`] loads the library, reconciles saves
//!   as deltas, and signals hydration once
//! - **Migration**: one-time import of the legacy flat document
//! - **Export/Import**: versioned `.narrator` files with ordered validation
//! - **Settings**: `settings.json` with default fallback
//!
//! # Usage
//!
//! ```rust,no_run
//! use narrator_project::{JsonDirStore, PersistenceAdapter};
//!
//! # async fn demo() -> narrator_project::PersistenceResult<()> {
//! let adapter = PersistenceAdapter::new(JsonDirStore::open("library").await?);
//! let library = adapter.load().await?;
//! adapter
//!     .save(&library.saved_presentations, library.active_presentation_id.as_ref())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
mod atomic;
pub mod error;
pub mod export;
pub mod migrate;
pub mod settings;
pub mod store;

pub use adapter::{ACTIVE_ID_KEY, LoadedLibrary, PersistenceAdapter, SaveReport};
pub use error::{PersistenceError, PersistenceResult, ValidationError};
pub use export::{
    EXPORT_EXTENSION, EXPORT_VERSION, ExportDocument, ImportPreview, MAX_IMPORT_BYTES,
    check_import_file, create_export, parse_import_str, read_import_file, sanitize_filename,
    validate_import_value, write_export_file,
};
pub use migrate::{LEGACY_MIGRATION_KEY, MigrationReport, migrate_legacy_document};
pub use settings::{load_settings, save_settings};
pub use store::{DocumentStore, JsonDirStore, MemoryStore};
