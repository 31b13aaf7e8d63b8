//! One-time import of the legacy flat document.
//!
//! Older builds kept the whole library in a single JSON file:
//!
//! ```text
//! { "state": { "savedPresentations": [...], "activePresentationId": "..." },
//!   "version": 0 }
//! ```
//!
//! On first start with the per-record store, those entries are copied in
//! (records already in the store win), the legacy active id is adopted if the
//! store has none, a marker is written so the import never runs again, and
//! the legacy file is renamed with a `.migrated` suffix.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use narrator_common::{PresentationId, SavedPresentation};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::adapter::ACTIVE_ID_KEY;
use crate::error::{PersistenceError, PersistenceResult};
use crate::store::DocumentStore;

/// Meta key marking the legacy import as done.
pub const LEGACY_MIGRATION_KEY: &str = "migration.legacy_flat_document";

/// Newest legacy layout this importer understands.
pub const LEGACY_MAX_VERSION: u64 = 1;

/// What a migration run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub imported: usize,
    /// Entries whose id already existed in the store.
    pub skipped_existing: usize,
    /// Entries that could not be read.
    pub skipped_invalid: usize,
    pub adopted_active: bool,
    /// Where the legacy file was moved.
    pub archived_to: Option<PathBuf>,
}

/// Import the legacy document at `path` unless that already happened.
///
/// Returns `Ok(None)` when the marker is set or there is no legacy file.
pub async fn migrate_legacy_document<S>(
    store: &S,
    path: &Path,
) -> PersistenceResult<Option<MigrationReport>>
where
    S: DocumentStore + ?Sized,
{
    if store.get_meta(LEGACY_MIGRATION_KEY).await?.is_some() {
        debug!("Legacy document already migrated");
        return Ok(None);
    }

    let json = match tokio::fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No legacy document to migrate");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let mut value: Value = serde_json::from_str(&json)?;
    let root = value
        .as_object_mut()
        .ok_or_else(|| invalid(path, "legacy document root must be a JSON object"))?;
    let version = extract_version(root, path)?;
    if version > LEGACY_MAX_VERSION {
        return Err(invalid(path, &format!("unsupported legacy version {version}")));
    }

    let state = match root.remove("state") {
        Some(Value::Object(state)) => state,
        Some(_) => return Err(invalid(path, "`state` must be an object")),
        None => Map::new(),
    };
    let (entries, legacy_active) = split_state(state);

    let existing: Vec<PresentationId> = store.get_all().await?.into_iter().map(|r| r.id).collect();
    let mut report = MigrationReport::default();
    let mut known = existing;

    for entry in entries {
        let record: SavedPresentation = match serde_json::from_value(entry) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable legacy entry");
                report.skipped_invalid += 1;
                continue;
            }
        };
        if known.contains(&record.id) {
            report.skipped_existing += 1;
            continue;
        }
        store.put(&record).await?;
        known.push(record.id);
        report.imported += 1;
    }

    if let Some(active) = legacy_active {
        let store_has_active = store.get_meta(ACTIVE_ID_KEY).await?.is_some();
        if !store_has_active && known.contains(&active) {
            store.set_meta(ACTIVE_ID_KEY, active.as_str()).await?;
            report.adopted_active = true;
        }
    }

    store
        .set_meta(LEGACY_MIGRATION_KEY, &chrono::Utc::now().to_rfc3339())
        .await?;

    let archive = archive_path(path);
    match tokio::fs::rename(path, &archive).await {
        Ok(()) => report.archived_to = Some(archive),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not archive legacy document"),
    }

    info!(
        version,
        imported = report.imported,
        skipped_existing = report.skipped_existing,
        skipped_invalid = report.skipped_invalid,
        adopted_active = report.adopted_active,
        "Legacy document migrated"
    );
    Ok(Some(report))
}

fn split_state(mut state: Map<String, Value>) -> (Vec<Value>, Option<PresentationId>) {
    let entries = match state.remove("savedPresentations") {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };
    let active = match state.remove("activePresentationId") {
        Some(Value::String(id)) if !id.is_empty() => Some(PresentationId::from(id)),
        _ => None,
    };
    (entries, active)
}

/// Read the `version` field; a missing field means version 0.
fn extract_version(obj: &Map<String, Value>, path: &Path) -> PersistenceResult<u64> {
    match obj.get("version") {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| invalid(path, "version must be a non-negative integer")),
        Some(Value::String(s)) => s
            .parse::<u64>()
            .map_err(|_| invalid(path, &format!("cannot parse version string: {s}"))),
        Some(_) => Err(invalid(path, "version field has unexpected type")),
        None => {
            warn!("Legacy document has no version field, assuming version 0");
            Ok(0)
        }
    }
}

fn archive_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("legacy"));
    name.push(".migrated");
    path.with_file_name(name)
}

fn invalid(path: &Path, reason: &str) -> PersistenceError {
    PersistenceError::InvalidRecord {
        key: path.display().to_string(),
        reason: reason.to_string(),
    }
}
