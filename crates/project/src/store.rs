//! Durable document stores.
//!
//! [`DocumentStore`] is the async seam between the persistence adapter and
//! whatever keeps the bytes: one record per saved presentation plus a small
//! string key/value area for metadata (active id, migration markers).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use narrator_common::{PresentationId, SavedPresentation};
use tokio::fs;
use tokio::sync::Mutex;

use crate::atomic::{remove_if_exists, write_atomic};
use crate::error::{PersistenceError, PersistenceResult};

/// Async key/value store for saved presentations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every stored record, in no particular order.
    async fn get_all(&self) -> PersistenceResult<Vec<SavedPresentation>>;

    /// Insert or replace the record with `record.id`.
    async fn put(&self, record: &SavedPresentation) -> PersistenceResult<()>;

    /// Remove a record. Removing an unknown id is not an error.
    async fn delete(&self, id: &PresentationId) -> PersistenceResult<()>;

    /// Remove every record and every metadata value.
    async fn clear(&self) -> PersistenceResult<()>;

    async fn get_meta(&self, key: &str) -> PersistenceResult<Option<String>>;

    async fn set_meta(&self, key: &str, value: &str) -> PersistenceResult<()>;

    async fn remove_meta(&self, key: &str) -> PersistenceResult<()>;
}

/// Directory-backed store.
///
/// Directory structure:
/// ```text
/// root/
/// ├── presentations/
/// │   ├── pres_1712000000000_abc1234.json
/// │   └── draft_1712000000000_xyz9876.json
/// └── meta/
///     ├── activePresentationId
///     └── migration.legacy_flat_document
/// ```
#[derive(Clone, Debug)]
pub struct JsonDirStore {
    root: PathBuf,
}

const RECORDS_DIR: &str = "presentations";
const META_DIR: &str = "meta";
const RECORD_EXTENSION: &str = "json";

impl JsonDirStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> PersistenceResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(RECORDS_DIR)).await?;
        fs::create_dir_all(root.join(META_DIR)).await?;
        tracing::debug!(root = %root.display(), "Document store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn records_dir(&self) -> PathBuf {
        self.root.join(RECORDS_DIR)
    }

    fn record_path(&self, id: &PresentationId) -> PathBuf {
        self.records_dir()
            .join(format!("{}.{RECORD_EXTENSION}", encode_file_stem(id.as_str())))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(encode_file_stem(key))
    }

    async fn read_record(path: &Path) -> PersistenceResult<SavedPresentation> {
        let json = fs::read_to_string(path).await?;
        serde_json::from_str(&json).map_err(|e| PersistenceError::InvalidRecord {
            key: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Map an id or key to a file name: ASCII alphanumerics, `_`, `-` and `.`
/// pass through, everything else becomes `%XX`. A leading `.` is escaped
/// so no key can name a hidden file or a parent directory.
fn encode_file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, byte) in key.bytes().enumerate() {
        let plain = byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'-')
            || (byte == b'.' && i > 0);
        if plain {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[async_trait]
impl DocumentStore for JsonDirStore {
    async fn get_all(&self) -> PersistenceResult<Vec<SavedPresentation>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(self.records_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                }
            }
        }
        tracing::debug!(count = records.len(), "Records read from store");
        Ok(records)
    }

    async fn put(&self, record: &SavedPresentation) -> PersistenceResult<()> {
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.record_path(&record.id), &json).await
    }

    async fn delete(&self, id: &PresentationId) -> PersistenceResult<()> {
        remove_if_exists(&self.record_path(id)).await
    }

    async fn clear(&self) -> PersistenceResult<()> {
        for dir in [self.records_dir(), self.root.join(META_DIR)] {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    remove_if_exists(&entry.path()).await?;
                }
            }
        }
        tracing::info!(root = %self.root.display(), "Document store cleared");
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> PersistenceResult<Option<String>> {
        match fs::read_to_string(self.meta_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_meta(&self, key: &str, value: &str) -> PersistenceResult<()> {
        write_atomic(&self.meta_path(key), value.as_bytes()).await
    }

    async fn remove_meta(&self, key: &str) -> PersistenceResult<()> {
        remove_if_exists(&self.meta_path(key)).await
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: BTreeMap<PresentationId, SavedPresentation>,
    meta: BTreeMap<String, String>,
}

/// In-process store with failure injection and write counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store.
    pub fn with_records(records: impl IntoIterator<Item = SavedPresentation>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
                meta: BTreeMap::new(),
            }),
            ..Self::default()
        }
    }

    /// Make every subsequent read fail until turned off.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write (put, delete, clear, meta) fail until turned off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful `put` calls so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Successful `delete` calls so far.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn record(&self, id: &PresentationId) -> Option<SavedPresentation> {
        self.inner.lock().await.records.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_read(&self) -> PersistenceResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> PersistenceResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_all(&self) -> PersistenceResult<Vec<SavedPresentation>> {
        self.check_read()?;
        Ok(self.inner.lock().await.records.values().cloned().collect())
    }

    async fn put(&self, record: &SavedPresentation) -> PersistenceResult<()> {
        self.check_write()?;
        self.inner
            .lock()
            .await
            .records
            .insert(record.id.clone(), record.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: &PresentationId) -> PersistenceResult<()> {
        self.check_write()?;
        self.inner.lock().await.records.remove(id);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> PersistenceResult<()> {
        self.check_write()?;
        let mut inner = self.inner.lock().await;
        inner.records.clear();
        inner.meta.clear();
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> PersistenceResult<Option<String>> {
        self.check_read()?;
        Ok(self.inner.lock().await.meta.get(key).cloned())
    }

    async fn set_meta(&self, key: &str, value: &str) -> PersistenceResult<()> {
        self.check_write()?;
        self.inner
            .lock()
            .await
            .meta
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_meta(&self, key: &str) -> PersistenceResult<()> {
        self.check_write()?;
        self.inner.lock().await.meta.remove(key);
        Ok(())
    }
}
