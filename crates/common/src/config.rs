//! Engine configuration and user preferences.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Engine tunables, loadable from a TOML file.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorConfig {
    /// Root of the durable document store and the settings file.
    pub storage_dir: PathBuf,
    /// Maximum undo depth.
    pub history_limit: usize,
    /// Delay between the end of a slide's narration and the auto-advance.
    pub auto_advance_delay_ms: u64,
    /// Upper bound for a single content or narration generation call.
    pub collaborator_timeout_secs: u64,
    /// Legacy flat document to migrate on first start, if any.
    pub legacy_document: Option<PathBuf>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            history_limit: 50,
            auto_advance_delay_ms: 800,
            collaborator_timeout_secs: 30,
            legacy_document: None,
        }
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("narrator")
}

impl NarratorConfig {
    pub fn from_toml_str(text: &str) -> CommonResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> CommonResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CommonError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded narrator config");
        Ok(config)
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.storage_dir.join("settings.json")
    }

    /// Directory of the durable presentation library.
    pub fn library_dir(&self) -> PathBuf {
        self.storage_dir.join("library")
    }
}

/// Playback preferences applied live to the audio engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaybackSettings {
    /// Linear slider value in [0, 1]; the engine applies a square curve.
    pub volume: f32,
    /// Playback rate in [0.5, 2.5].
    pub speed: f32,
    pub auto_advance: bool,
}

impl PlaybackSettings {
    pub const MIN_SPEED: f32 = 0.5;
    pub const MAX_SPEED: f32 = 2.5;
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: 0.6,
            speed: 1.2,
            auto_advance: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptionSettings {
    pub enabled: bool,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// User preferences persisted next to the document store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub playback: PlaybackSettings,
    pub captions: CaptionSettings,
}

impl UserSettings {
    pub fn set_volume(&mut self, volume: f32) {
        self.playback.volume = clamp_or(volume, 0.0, 1.0, PlaybackSettings::default().volume);
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.playback.speed = clamp_or(
            speed,
            PlaybackSettings::MIN_SPEED,
            PlaybackSettings::MAX_SPEED,
            PlaybackSettings::default().speed,
        );
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.playback.auto_advance = enabled;
    }

    pub fn set_captions_enabled(&mut self, enabled: bool) {
        self.captions.enabled = enabled;
    }

    /// Re-apply the setter clamps to values read from disk.
    pub fn sanitized(mut self) -> Self {
        let (volume, speed) = (self.playback.volume, self.playback.speed);
        self.set_volume(volume);
        self.set_speed(speed);
        self
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NarratorConfig::default();
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.auto_advance_delay(), Duration::from_millis(800));
        assert_eq!(config.collaborator_timeout(), Duration::from_secs(30));
        assert!(config.storage_dir.ends_with("narrator"));
        assert!(config.legacy_document.is_none());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = NarratorConfig::from_toml_str(
            "storage_dir = \"/var/lib/narrator\"\nauto_advance_delay_ms = 250\n",
        )
        .unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/narrator"));
        assert_eq!(config.auto_advance_delay_ms, 250);
        assert_eq!(config.history_limit, 50);
        assert_eq!(
            config.settings_path(),
            PathBuf::from("/var/lib/narrator/settings.json")
        );
        assert_eq!(config.library_dir(), PathBuf::from("/var/lib/narrator/library"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(NarratorConfig::from_toml_str("history_limit = \"lots\"").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narrator.toml");
        std::fs::write(&path, "collaborator_timeout_secs = 5\n").unwrap();
        let config = NarratorConfig::load(&path).unwrap();
        assert_eq!(config.collaborator_timeout(), Duration::from_secs(5));

        let missing = NarratorConfig::load(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(CommonError::ConfigRead { .. })));
    }

    #[test]
    fn settings_clamp() {
        let mut settings = UserSettings::default();
        assert_eq!(settings.playback.volume, 0.6);
        assert_eq!(settings.playback.speed, 1.2);
        assert!(settings.playback.auto_advance);
        assert!(settings.captions.enabled);

        settings.set_volume(1.7);
        assert_eq!(settings.playback.volume, 1.0);
        settings.set_volume(-0.2);
        assert_eq!(settings.playback.volume, 0.0);
        settings.set_speed(9.0);
        assert_eq!(settings.playback.speed, 2.5);
        settings.set_speed(0.1);
        assert_eq!(settings.playback.speed, 0.5);
        settings.set_speed(f32::NAN);
        assert_eq!(settings.playback.speed, 1.2);
    }

    #[test]
    fn stored_settings_merge_with_defaults() {
        let settings: UserSettings =
            serde_json::from_str(r#"{"playback":{"volume":0.3}}"#).unwrap();
        assert_eq!(settings.playback.volume, 0.3);
        assert_eq!(settings.playback.speed, 1.2);
        assert!(settings.captions.enabled);

        let settings: UserSettings =
            serde_json::from_str(r#"{"playback":{"speed":4.0,"autoAdvance":false}}"#).unwrap();
        let settings = settings.sanitized();
        assert_eq!(settings.playback.speed, 2.5);
        assert!(!settings.playback.auto_advance);
    }
}
