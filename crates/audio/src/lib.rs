//! `narrator-audio` -- Narration playback and caption timing for the narrator engine.
//!
//! - **Engine**: one shared [`PlaybackResource`] driven through two channels,
//!   transport (play state, slide, audio map) and live parameters (volume,
//!   speed, mute), plus the polled auto-advance timer
//! - **Captions**: sentence splitting and word-proportional timing estimates
//!
//! # Architecture
//!
//! ```text
//! SessionStore ──transport──▶ AudioEngine ──▶ PlaybackResource
//! UserSettings ──live───────▶     │
//!                                 ├─ on_ended / poll ─▶ PlaybackTransition
//!                                 └─ progress ─▶ CaptionTrack::active_index
//! ```

pub mod captions;
pub mod engine;
pub mod error;

pub use captions::{CaptionTrack, SentencePhase, active_sentence_index, count_words, split_sentences};
pub use engine::{
    AudioEngine, LiveParams, PlaybackResource, PlaybackTransition, SilentResource, TransportState,
    effective_volume,
};
pub use error::{AudioError, AudioResult};
