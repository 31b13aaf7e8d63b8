//! `narrator-common` -- Shared types, configuration, and errors for the
//! narrator session engine.
//!
//! Every other narrator crate depends on this one:
//!
//! - **Types**: `PresentationData`, `Slide`, `SavedPresentation`, `Style`, `Voice`,
//!   `PresentationId`, patches for partial edits
//! - **Config**: `NarratorConfig` (engine tunables, TOML) and `UserSettings`
//!   (playback and caption preferences)
//! - **Errors**: `CommonError`

pub mod config;
pub mod error;
pub mod types;

pub use config::{CaptionSettings, NarratorConfig, PlaybackSettings, UserSettings};
pub use error::{CommonError, CommonResult};
pub use types::{
    AudioUrls, MetadataPatch, PLACEHOLDER_POINT, PortablePresentation, PresentationData,
    PresentationId, PresentationMetadata, SavedPresentation, Slide, SlidePatch, Style, Voice,
    now_millis,
};
