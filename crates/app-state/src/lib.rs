//! `narrator-app-state` -- Session state management for the narrator engine.
//!
//! This crate provides:
//!
//! - **`SessionStore`**: Central state container holding the editing session, viewer
//!   transport, narration audio, and the in-memory library of saved presentations.
//! - **`HistoryManager`**: Bounded snapshot-based undo/redo over presentation content.
//! - **`ContentHash`**: Content hashing that decides whether narration is stale.
//! - **`PlaybackState`**: Viewer transport (current slide, play/pause, mute).
//! - **`RoutingController`**: Location hash <-> screen sync with echo suppression.
//!
//! # Architecture
//!
//! ```text
//! RoutingController                  (URL events in, URL commands out)
//!         │
//!         ▼
//! SessionStore (central state)
//! ├── app_state / content / style / voice
//! ├── presentation: Option<PresentationData>
//! ├── playback: PlaybackState        (viewer transport)
//! ├── audio_urls + last hash         (dirty tracking)
//! ├── saved: Vec<SavedPresentation>  (library, revision-counted)
//! └── history: HistoryManager
//!     ├── past: VecDeque<HistoryEntry>   (bounded)
//!     └── future: Vec<HistoryEntry>
//! ```

pub mod dirty;
pub mod error;
pub mod history;
pub mod playback;
pub mod routing;
pub mod state;

pub use dirty::{ContentHash, content_hash, is_dirty};
pub use error::{StoreError, StoreResult};
pub use history::{DEFAULT_HISTORY_LIMIT, HistoryEntry, HistoryManager};
pub use playback::PlaybackState;
pub use routing::{
    InputTab, NO_PRESENTATION_NOTICE, Route, RouteOutcome, RoutingController, SyncOrigin,
    SyncPhase, UrlCommand,
};
pub use state::{AppState, ImportMode, LoadingState, SessionStore};
