//! Generation services consumed by the session.
//!
//! Both services are remote in practice and may fail or stall; the session
//! bounds every call with a timeout and degrades instead of erroring:
//! content generation falls back to [`generate_local_presentation`], and
//! narration falls back to presenting without audio.

use async_trait::async_trait;
use narrator_common::{PresentationData, PresentationMetadata, Slide, Style, Voice};

use crate::error::{CollaboratorError, CollaboratorResult};

/// Turns raw notes into a structured presentation.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, raw_text: &str, style: Style) -> CollaboratorResult<PresentationData>;
}

/// Produces one audio reference per script, in order.
#[async_trait]
pub trait NarrationGenerator: Send + Sync {
    async fn narrate(&self, scripts: &[String], voice: Voice) -> CollaboratorResult<Vec<String>>;
}

/// Deterministic offline generator.
#[derive(Copy, Clone, Debug, Default)]
pub struct LocalGenerator;

#[async_trait]
impl ContentGenerator for LocalGenerator {
    async fn generate(&self, raw_text: &str, _style: Style) -> CollaboratorResult<PresentationData> {
        Ok(generate_local_presentation(raw_text))
    }
}

/// Stand-in for a service that is not configured. Every call fails.
#[derive(Copy, Clone, Debug, Default)]
pub struct Offline;

#[async_trait]
impl ContentGenerator for Offline {
    async fn generate(&self, _raw_text: &str, _style: Style) -> CollaboratorResult<PresentationData> {
        Err(CollaboratorError::Unavailable("no content service configured".into()))
    }
}

#[async_trait]
impl NarrationGenerator for Offline {
    async fn narrate(&self, _scripts: &[String], _voice: Voice) -> CollaboratorResult<Vec<String>> {
        Err(CollaboratorError::Unavailable("no narration service configured".into()))
    }
}

pub const UNTITLED_PRESENTATION: &str = "Untitled Presentation";
pub const LOCAL_SUBTITLE: &str = "Generated with AI";
const KEY_POINTS_TITLE: &str = "Key Points";
const MAX_HEADING_CHARS: usize = 60;
const KEY_POINTS_LINES: usize = 4;

/// Build a presentation from plain text without any service.
///
/// The first non-blank line is the title. Short lines that do not look
/// like list items open a slide; other lines become that slide's points
/// and are read out in its script.
pub fn generate_local_presentation(text: &str) -> PresentationData {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let title = lines.first().copied().unwrap_or(UNTITLED_PRESENTATION);
    let body = lines.get(1..).unwrap_or_default();

    let mut slides = Vec::new();
    let mut current: Option<Slide> = None;
    for line in body {
        if is_heading(line) {
            slides.extend(current.take());
            current = Some(Slide::new(strip_heading_suffix(line), Vec::new(), String::new()));
        } else if let Some(slide) = current.as_mut() {
            let point = strip_list_marker(line);
            if !point.is_empty() {
                slide.script.push_str(point);
                slide.script.push_str(". ");
                slide.points.push(point.to_string());
            }
        }
    }
    slides.extend(current);

    if slides.is_empty() {
        let points: Vec<String> = body
            .iter()
            .take(KEY_POINTS_LINES)
            .map(|l| l.to_string())
            .collect();
        let script = points.join(". ");
        slides.push(Slide::new(KEY_POINTS_TITLE, points, script));
    }
    for slide in &mut slides {
        if slide.script.is_empty() {
            slide.script = format!("Let's discuss {}.", slide.title);
        }
    }

    let mut data = PresentationData {
        metadata: PresentationMetadata {
            title: title.to_string(),
            subtitle: LOCAL_SUBTITLE.to_string(),
            title_script: format!("Welcome to this presentation about {title}. Let's dive in."),
        },
        slides,
    };
    data.normalize();
    tracing::debug!(slides = data.slides.len(), "Local presentation generated");
    data
}

fn is_heading(line: &str) -> bool {
    line.chars().count() < MAX_HEADING_CHARS
        && !line.starts_with('-')
        && !line.starts_with('•')
        && !is_numbered(line)
}

/// `12. text` style list item.
fn is_numbered(line: &str) -> bool {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && line.as_bytes().get(digits) == Some(&b'.')
}

fn strip_heading_suffix(line: &str) -> &str {
    line.strip_suffix(':')
        .or_else(|| line.strip_suffix('.'))
        .unwrap_or(line)
}

fn strip_list_marker(line: &str) -> &str {
    line.trim_start_matches(|c: char| {
        matches!(c, '-' | '•' | '.' | ')') || c.is_ascii_digit() || c.is_whitespace()
    })
    .trim()
}
