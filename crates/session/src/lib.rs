//! `narrator-session` -- orchestration layer of the narrator engine.
//!
//! [`NarratorSession`] owns one of each component and exposes the user
//! actions (generate, narrate, present, navigate, save, import, export):
//!
//! - **State**: `SessionStore` and `RoutingController` from `narrator-app-state`
//! - **Playback**: `AudioEngine` over any `PlaybackResource` from `narrator-audio`
//! - **Storage**: `PersistenceAdapter` over any `DocumentStore` from `narrator-project`
//! - **Services**: [`ContentGenerator`] and [`NarrationGenerator`], each with a
//!   degraded fallback
//!
//! # Usage
//!
//! ```rust,no_run
//! use narrator_audio::SilentResource;
//! use narrator_common::NarratorConfig;
//! use narrator_project::MemoryStore;
//! use narrator_session::{NarratorSession, Offline};
//!
//! # async fn demo() {
//! let mut session = NarratorSession::new(
//!     NarratorConfig::default(),
//!     MemoryStore::new(),
//!     SilentResource::new(),
//!     Box::new(Offline),
//!     Box::new(Offline),
//! );
//! session.init().await;
//! session.end_tick();
//! session.store_mut().set_content("My talk\nIntro\n- a point that is long enough to count as a bullet");
//! session.generate_presentation().await.ok();
//! # }
//! ```

pub mod collaborators;
pub mod error;
pub mod notice;
pub mod session;

pub use collaborators::{
    ContentGenerator, LOCAL_SUBTITLE, LocalGenerator, NarrationGenerator, Offline,
    UNTITLED_PRESENTATION, generate_local_presentation,
};
pub use error::{CollaboratorError, CollaboratorResult, SessionError, SessionResult};
pub use notice::{Notice, NoticeLevel, NoticeQueue};
pub use session::{MIN_CONTENT_CHARS, NarratorSession};
