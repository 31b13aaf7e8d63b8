//! Portable `.narrator` export and import.
//!
//! An export is a single JSON document:
//!
//! ```text
//! { "version": "1.0", "exportedAt": "2026-01-01T00:00:00Z",
//!   "name": ..., "presentationData": ..., "audioUrls": ..., "style": ..., "voice": ... }
//! ```
//!
//! Imports are checked at the file level (size, extension) before reading
//! and structurally before deserializing, so every rejection maps to one
//! [`ValidationError`].

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use narrator_common::{AudioUrls, PortablePresentation, PresentationData, Style, Voice};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::error::{PersistenceResult, ValidationError};

pub const EXPORT_VERSION: &str = "1.0";
pub const EXPORT_EXTENSION: &str = "narrator";
pub const MAX_IMPORT_BYTES: u64 = 10 * 1024 * 1024;

const ACCEPTED_EXTENSIONS: [&str; 2] = [EXPORT_EXTENSION, "json"];
const REQUIRED_KEYS: [&str; 5] = ["name", "presentationData", "audioUrls", "style", "voice"];
const REQUIRED_METADATA: [&str; 3] = ["title", "subtitle", "titleScript"];
const MAX_FILE_STEM: usize = 50;
const FALLBACK_FILE_STEM: &str = "presentation";

/// The on-disk export format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub exported_at: String,
    pub name: String,
    pub presentation_data: PresentationData,
    pub audio_urls: AudioUrls,
    pub style: Style,
    pub voice: Voice,
}

impl ExportDocument {
    /// Wrap `presentation` with the current version and timestamp.
    pub fn new(presentation: PortablePresentation) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            name: presentation.name,
            presentation_data: presentation.presentation_data,
            audio_urls: presentation.audio_urls,
            style: presentation.style,
            voice: presentation.voice,
        }
    }

    pub fn into_presentation(self) -> PortablePresentation {
        PortablePresentation {
            name: self.name,
            presentation_data: self.presentation_data,
            audio_urls: self.audio_urls,
            style: self.style,
            voice: self.voice,
        }
    }

    pub fn to_pretty_json(&self) -> PersistenceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// File name for this export: sanitized name plus `.narrator`.
    pub fn file_name(&self) -> String {
        format!("{}.{EXPORT_EXTENSION}", sanitize_filename(&self.name))
    }

    pub fn preview(&self) -> ImportPreview {
        ImportPreview {
            name: self.name.clone(),
            slide_count: self.presentation_data.total_slides(),
            style: self.style,
            voice: self.voice,
        }
    }
}

/// Summary shown before an import is confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportPreview {
    pub name: String,
    /// Content slides plus the title slide.
    pub slide_count: usize,
    pub style: Style,
    pub voice: Voice,
}

impl From<&PortablePresentation> for ImportPreview {
    fn from(p: &PortablePresentation) -> Self {
        Self {
            name: p.name.clone(),
            slide_count: p.presentation_data.total_slides(),
            style: p.style,
            voice: p.voice,
        }
    }
}

/// Build an export document.
pub fn create_export(presentation: PortablePresentation) -> ExportDocument {
    ExportDocument::new(presentation)
}

/// Structural checks, in order; the first failure wins.
pub fn validate_import_value(value: &Value) -> Result<(), ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::Corrupted)?;

    if obj.get("version").and_then(Value::as_str) != Some(EXPORT_VERSION) {
        return Err(ValidationError::IncompatibleVersion);
    }

    if REQUIRED_KEYS
        .iter()
        .any(|key| obj.get(*key).is_none_or(is_falsy))
    {
        return Err(ValidationError::MissingData);
    }

    let metadata = obj
        .get("presentationData")
        .and_then(|data| data.get("metadata"))
        .ok_or(ValidationError::MissingData)?;
    if REQUIRED_METADATA
        .iter()
        .any(|key| metadata.get(*key).is_none_or(is_falsy))
    {
        return Err(ValidationError::MissingData);
    }

    let slides = obj
        .get("presentationData")
        .and_then(|data| data.get("slides"))
        .and_then(Value::as_array)
        .filter(|slides| !slides.is_empty())
        .ok_or(ValidationError::MissingData)?;
    if !slides.iter().all(is_valid_slide) {
        return Err(ValidationError::MissingData);
    }

    let known_style = obj
        .get("style")
        .and_then(Value::as_str)
        .is_some_and(|s| s.parse::<Style>().is_ok());
    if !known_style {
        return Err(ValidationError::MissingData);
    }
    let known_voice = obj
        .get("voice")
        .and_then(Value::as_str)
        .is_some_and(|v| v.parse::<Voice>().is_ok());
    if !known_voice {
        return Err(ValidationError::MissingData);
    }

    Ok(())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn is_valid_slide(slide: &Value) -> bool {
    slide.get("title").is_some_and(Value::is_string)
        && slide.get("points").is_some_and(Value::is_array)
        && slide.get("script").is_some_and(Value::is_string)
}

/// Parse and validate an export document from JSON text.
pub fn parse_import_str(json: &str) -> Result<ExportDocument, ValidationError> {
    let value: Value = serde_json::from_str(json).map_err(|_| ValidationError::Corrupted)?;
    validate_import_value(&value)?;
    serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "Validated import failed to deserialize");
        ValidationError::Corrupted
    })
}

/// File-level checks that need no content: size, then extension.
pub fn check_import_file(path: &Path, size: u64) -> Result<(), ValidationError> {
    if size > MAX_IMPORT_BYTES {
        return Err(ValidationError::TooLarge);
    }
    let accepted = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        });
    if !accepted {
        return Err(ValidationError::UnsupportedFile);
    }
    Ok(())
}

/// Check, read, parse and validate an import file.
pub async fn read_import_file(path: &Path) -> PersistenceResult<ExportDocument> {
    let size = tokio::fs::metadata(path).await?.len();
    check_import_file(path, size)?;
    let json = tokio::fs::read_to_string(path).await?;
    let document = parse_import_str(&json)?;
    info!(
        path = %path.display(),
        name = %document.name,
        "Import file accepted"
    );
    Ok(document)
}

/// Write `document` into `dir` under its sanitized file name.
pub async fn write_export_file(dir: &Path, document: &ExportDocument) -> PersistenceResult<PathBuf> {
    let path = dir.join(document.file_name());
    write_atomic(&path, document.to_pretty_json()?.as_bytes()).await?;
    info!(path = %path.display(), "Presentation exported");
    Ok(path)
}

/// Lowercase file stem: ASCII letters, digits and `-` survive, whitespace
/// runs become `-`, capped at 50 characters.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::new();
    let mut pending_gap = false;
    for c in name.chars() {
        if c.is_whitespace() {
            pending_gap = true;
        } else if c.is_ascii_alphanumeric() || c == '-' {
            if pending_gap {
                out.push('-');
                pending_gap = false;
            }
            out.push(c.to_ascii_lowercase());
        }
    }
    if pending_gap {
        out.push('-');
    }
    out.truncate(MAX_FILE_STEM);
    if out.is_empty() {
        FALLBACK_FILE_STEM.to_string()
    } else {
        out
    }
}
