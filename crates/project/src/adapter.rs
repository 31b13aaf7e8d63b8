//! Reconciling persistence adapter.
//!
//! The in-memory library is authoritative. [`PersistenceAdapter::save`]
//! receives the whole list and writes only what differs from the last
//! durable state it knows about, so a failed write leaves the remaining
//! delta to be retried by the next call.

use std::collections::BTreeMap;
use std::path::PathBuf;

use narrator_common::{PresentationId, SavedPresentation};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::error::PersistenceResult;
use crate::migrate::migrate_legacy_document;
use crate::store::DocumentStore;

/// Meta key holding the active presentation id.
pub const ACTIVE_ID_KEY: &str = "activePresentationId";

/// Result of [`PersistenceAdapter::load`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedLibrary {
    /// Newest first by `saved_at`.
    pub saved_presentations: Vec<SavedPresentation>,
    pub active_presentation_id: Option<PresentationId>,
}

/// What a [`PersistenceAdapter::save`] call actually wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub written: usize,
    pub deleted: usize,
    pub active_changed: bool,
}

impl SaveReport {
    pub fn is_noop(&self) -> bool {
        self.written == 0 && self.deleted == 0 && !self.active_changed
    }
}

/// Last state known to be on disk.
#[derive(Debug, Default)]
struct Durable {
    records: BTreeMap<PresentationId, SavedPresentation>,
    active: Option<PresentationId>,
}

/// Bridges the in-memory library and a [`DocumentStore`].
pub struct PersistenceAdapter<S> {
    store: S,
    durable: Mutex<Durable>,
    hydrated: watch::Sender<bool>,
    legacy_document: Option<PathBuf>,
}

impl<S: DocumentStore> PersistenceAdapter<S> {
    pub fn new(store: S) -> Self {
        let (hydrated, _) = watch::channel(false);
        Self {
            store,
            durable: Mutex::new(Durable::default()),
            hydrated,
            legacy_document: None,
        }
    }

    /// Import this legacy flat document on the first [`load`](Self::load).
    pub fn with_legacy_document(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_document = Some(path.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the whole library. Signals hydration after the first success.
    pub async fn load(&self) -> PersistenceResult<LoadedLibrary> {
        let mut durable = self.durable.lock().await;

        if let Some(path) = &self.legacy_document {
            if let Err(e) = migrate_legacy_document(&self.store, path).await {
                warn!(path = %path.display(), error = %e, "Legacy migration failed");
            }
        }

        let mut saved_presentations = self.store.get_all().await?;
        saved_presentations.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        let active_presentation_id = self
            .store
            .get_meta(ACTIVE_ID_KEY)
            .await?
            .filter(|id| !id.is_empty())
            .map(PresentationId::from);

        durable.records = saved_presentations
            .iter()
            .map(|r| (r.id.clone(), r.clone()))
            .collect();
        durable.active = active_presentation_id.clone();
        drop(durable);

        info!(
            count = saved_presentations.len(),
            active = ?active_presentation_id.as_ref().map(PresentationId::as_str),
            "Library loaded"
        );
        self.mark_hydrated();

        Ok(LoadedLibrary {
            saved_presentations,
            active_presentation_id,
        })
    }

    /// Write the difference between `presentations`/`active` and the durable state.
    ///
    /// Calls are serialized, so writes land in call order.
    pub async fn save(
        &self,
        presentations: &[SavedPresentation],
        active: Option<&PresentationId>,
    ) -> PersistenceResult<SaveReport> {
        let mut durable = self.durable.lock().await;
        let mut report = SaveReport::default();

        let removed: Vec<PresentationId> = durable
            .records
            .keys()
            .filter(|id| !presentations.iter().any(|p| &p.id == *id))
            .cloned()
            .collect();
        for id in removed {
            self.store.delete(&id).await?;
            durable.records.remove(&id);
            report.deleted += 1;
        }

        for record in presentations {
            if durable.records.get(&record.id) == Some(record) {
                continue;
            }
            self.store.put(record).await?;
            durable.records.insert(record.id.clone(), record.clone());
            report.written += 1;
        }

        if durable.active.as_ref() != active {
            match active {
                Some(id) => self.store.set_meta(ACTIVE_ID_KEY, id.as_str()).await?,
                None => self.store.remove_meta(ACTIVE_ID_KEY).await?,
            }
            durable.active = active.cloned();
            report.active_changed = true;
        }

        if report.is_noop() {
            debug!("Library unchanged, nothing to persist");
        } else {
            info!(
                written = report.written,
                deleted = report.deleted,
                active_changed = report.active_changed,
                "Library persisted"
            );
        }
        Ok(report)
    }

    /// Remove everything from the durable store.
    pub async fn clear(&self) -> PersistenceResult<()> {
        let mut durable = self.durable.lock().await;
        self.store.clear().await?;
        *durable = Durable::default();
        info!("Library cleared");
        Ok(())
    }

    pub fn is_hydrated(&self) -> bool {
        *self.hydrated.borrow()
    }

    /// Resolves once the first load has succeeded. Returns `false` only if
    /// the adapter is dropped first.
    pub async fn wait_hydrated(&self) -> bool {
        let mut rx = self.hydrated.subscribe();
        rx.wait_for(|hydrated| *hydrated).await.is_ok()
    }

    pub fn subscribe_hydrated(&self) -> watch::Receiver<bool> {
        self.hydrated.subscribe()
    }

    fn mark_hydrated(&self) {
        let fired = self.hydrated.send_if_modified(|hydrated| {
            if *hydrated {
                false
            } else {
                *hydrated = true;
                true
            }
        });
        if fired {
            debug!("Persistence hydrated");
        }
    }
}
