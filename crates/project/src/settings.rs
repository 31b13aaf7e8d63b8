//! User settings file (`settings.json`).
//!
//! Missing or unreadable files fall back to defaults; partially written
//! files keep whatever fields they do have.

use std::path::Path;

use narrator_common::UserSettings;
use tracing::{debug, warn};

use crate::atomic::write_atomic;
use crate::error::PersistenceResult;

/// Load settings from `path`, never failing.
pub async fn load_settings(path: &Path) -> UserSettings {
    let settings = match tokio::fs::read_to_string(path).await {
        Ok(json) => match serde_json::from_str::<UserSettings>(&json) {
            Ok(settings) => {
                debug!(path = %path.display(), "Loaded user settings");
                settings
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse settings file, using defaults");
                UserSettings::default()
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "Failed to read settings file");
            }
            UserSettings::default()
        }
    };
    settings.sanitized()
}

/// Persist settings atomically, creating the parent directory if needed.
pub async fn save_settings(path: &Path, settings: &UserSettings) -> PersistenceResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(settings)?;
    write_atomic(path, &json).await?;
    debug!(path = %path.display(), "Saved user settings");
    Ok(())
}
