//! Content hashing for the "does narration need regenerating?" decision.
//!
//! The hash covers exactly what ends up in the audio: slide text, scripts,
//! and the narration voice. Style and playback fields are excluded.

use std::fmt;

use narrator_common::{PresentationData, PresentationMetadata, Slide, Voice};
use serde::{Deserialize, Serialize};

/// 32-bit rolling hash of narrated content.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub u32);

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

#[derive(Serialize)]
struct HashInput<'a> {
    metadata: &'a PresentationMetadata,
    slides: &'a [Slide],
    voice: Voice,
}

/// `h = h * 31 + unit` over the UTF-16 units of the canonical JSON of
/// `{metadata, slides, voice}`, wrapping at 32 bits.
pub fn content_hash(data: &PresentationData, voice: Voice) -> ContentHash {
    let input = HashInput {
        metadata: &data.metadata,
        slides: &data.slides,
        voice,
    };
    // Infallible for plain string structs.
    let json = serde_json::to_string(&input).unwrap_or_default();
    ContentHash(rolling_hash(&json))
}

fn rolling_hash(text: &str) -> u32 {
    text.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)))
}

/// Narration is stale when none was generated or the content moved on.
pub fn is_dirty(live: ContentHash, recorded: Option<ContentHash>, has_audio: bool) -> bool {
    match recorded {
        Some(recorded) if has_audio => recorded != live,
        _ => true,
    }
}
