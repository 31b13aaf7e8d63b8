//! Core presentation types shared by every narrator crate.
//!
//! These mirror the JSON shape used by the export file format and the
//! durable store (camelCase field names), so the same structs serve the
//! in-memory session, persistence, and import/export.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

/// Placeholder point inserted when a slide would otherwise have no bullets.
pub const PLACEHOLDER_POINT: &str = "Add your first point";

/// Mapping from slide index (0 = title slide) to a playable audio reference.
pub type AudioUrls = BTreeMap<usize, String>;

/// Title-slide metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationMetadata {
    pub title: String,
    pub subtitle: String,
    /// Narration script read over the title slide.
    pub title_script: String,
}

/// A single content slide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    /// Bullet points, never empty once the slide is inside a session.
    pub points: Vec<String>,
    /// Narration script for this slide.
    pub script: String,
}

impl Slide {
    pub fn new(
        title: impl Into<String>,
        points: Vec<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            points,
            script: script.into(),
        }
    }

    /// Apply a partial update. Fields left as `None` are untouched.
    pub fn apply(&mut self, patch: SlidePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(points) = patch.points {
            self.points = points;
        }
        if let Some(script) = patch.script {
            self.script = script;
        }
    }
}

/// Partial update for a [`Slide`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlidePatch {
    pub title: Option<String>,
    pub points: Option<Vec<String>>,
    pub script: Option<String>,
}

impl SlidePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn points(points: Vec<String>) -> Self {
        Self {
            points: Some(points),
            ..Self::default()
        }
    }

    pub fn script(script: impl Into<String>) -> Self {
        Self {
            script: Some(script.into()),
            ..Self::default()
        }
    }
}

/// Partial update for [`PresentationMetadata`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub title_script: Option<String>,
}

impl MetadataPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn subtitle(subtitle: impl Into<String>) -> Self {
        Self {
            subtitle: Some(subtitle.into()),
            ..Self::default()
        }
    }

    pub fn title_script(script: impl Into<String>) -> Self {
        Self {
            title_script: Some(script.into()),
            ..Self::default()
        }
    }
}

impl PresentationMetadata {
    pub fn apply(&mut self, patch: MetadataPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(subtitle) = patch.subtitle {
            self.subtitle = subtitle;
        }
        if let Some(script) = patch.title_script {
            self.title_script = script;
        }
    }
}

/// Complete generated presentation: title metadata plus content slides.
///
/// The title slide is not stored in `slides`; it is conceptually slide 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationData {
    pub metadata: PresentationMetadata,
    pub slides: Vec<Slide>,
}

impl PresentationData {
    /// Number of slides including the title slide.
    pub fn total_slides(&self) -> usize {
        self.slides.len() + 1
    }

    /// Narration scripts in playback order: title script first.
    pub fn scripts(&self) -> Vec<String> {
        std::iter::once(self.metadata.title_script.clone())
            .chain(self.slides.iter().map(|s| s.script.clone()))
            .collect()
    }

    /// Script for a playback index (0 = title slide). `None` if out of range.
    pub fn script_at(&self, index: usize) -> Option<&str> {
        if index == 0 {
            return Some(&self.metadata.title_script);
        }
        self.slides.get(index - 1).map(|s| s.script.as_str())
    }

    /// Restore the structural invariants: at least one slide, and at least
    /// one point per slide. Returns `true` if anything had to be added.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        if self.slides.is_empty() {
            self.slides.push(Slide::new(
                "Key Points",
                vec![PLACEHOLDER_POINT.to_string()],
                "",
            ));
            changed = true;
        }
        for slide in &mut self.slides {
            if slide.points.is_empty() {
                slide.points.push(PLACEHOLDER_POINT.to_string());
                changed = true;
            }
        }
        if changed {
            tracing::debug!(
                slides = self.slides.len(),
                "Presentation normalized to restore slide/point invariants"
            );
        }
        changed
    }
}

/// Presentation style used when generating content.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Narrative,
    Minimal,
    Educational,
    Creative,
}

impl Style {
    pub const ALL: [Style; 4] = [
        Style::Narrative,
        Style::Minimal,
        Style::Educational,
        Style::Creative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Style::Narrative => "narrative",
            Style::Minimal => "minimal",
            Style::Educational => "educational",
            Style::Creative => "creative",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Style::Narrative => "Narrative",
            Style::Minimal => "Minimal",
            Style::Educational => "Educational",
            Style::Creative => "Creative",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Style::Narrative => "Story-driven, persuasive flow",
            Style::Minimal => "Clean, factual presentation",
            Style::Educational => "Learning-focused with examples",
            Style::Creative => "Thought-provoking and inspiring",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Style::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| CommonError::UnknownStyle(s.to_string()))
    }
}

/// Narration voice.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    #[default]
    Nova,
    Shimmer,
    Echo,
    Onyx,
    Fable,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Nova,
        Voice::Shimmer,
        Voice::Echo,
        Voice::Onyx,
        Voice::Fable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
            Voice::Echo => "echo",
            Voice::Onyx => "onyx",
            Voice::Fable => "fable",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Voice::Alloy => "Alloy",
            Voice::Nova => "Nova",
            Voice::Shimmer => "Shimmer",
            Voice::Echo => "Echo",
            Voice::Onyx => "Onyx",
            Voice::Fable => "Fable",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Voice::Alloy => "Neutral and balanced",
            Voice::Nova => "Warm and engaging",
            Voice::Shimmer => "Clear and expressive",
            Voice::Echo => "Soft and calm",
            Voice::Onyx => "Deep and authoritative",
            Voice::Fable => "British and narrative",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .into_iter()
            .find(|voice| voice.as_str() == s)
            .ok_or_else(|| CommonError::UnknownVoice(s.to_string()))
    }
}

/// Opaque identifier of a saved presentation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresentationId(pub String);

impl PresentationId {
    /// Prefix for explicitly saved and imported presentations.
    pub const SAVED_PREFIX: &'static str = "pres";
    /// Prefix for auto-saved drafts.
    pub const DRAFT_PREFIX: &'static str = "draft";

    /// Generate a fresh id of the form `<prefix>_<millis>_<7 base36 chars>`.
    pub fn generate(prefix: &str) -> Self {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..7)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(format!("{prefix}_{}_{suffix}", now_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PresentationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PresentationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A presentation stored in the library, with its generated narration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPresentation {
    pub id: PresentationId,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub saved_at: i64,
    pub presentation_data: PresentationData,
    #[serde(default)]
    pub audio_urls: AudioUrls,
    pub style: Style,
    pub voice: Voice,
    /// `Some(true)` for auto-saved drafts; cleared on explicit save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_draft: Option<bool>,
}

impl SavedPresentation {
    pub fn is_draft(&self) -> bool {
        self.is_draft.unwrap_or(false)
    }

    pub fn has_audio(&self) -> bool {
        !self.audio_urls.is_empty()
    }
}

/// Presentation content as carried by an export file, before it has a
/// library id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortablePresentation {
    pub name: String,
    pub presentation_data: PresentationData,
    pub audio_urls: AudioUrls,
    pub style: Style,
    pub voice: Voice,
}

impl PortablePresentation {
    pub fn into_saved(self, id: PresentationId, saved_at: i64) -> SavedPresentation {
        SavedPresentation {
            id,
            name: self.name,
            saved_at,
            presentation_data: self.presentation_data,
            audio_urls: self.audio_urls,
            style: self.style,
            voice: self.voice,
            is_draft: None,
        }
    }
}

impl From<&SavedPresentation> for PortablePresentation {
    fn from(saved: &SavedPresentation) -> Self {
        Self {
            name: saved.name.clone(),
            presentation_data: saved.presentation_data.clone(),
            audio_urls: saved.audio_urls.clone(),
            style: saved.style,
            voice: saved.voice,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
