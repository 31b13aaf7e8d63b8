//! The narrator session: one owner for state, routing, playback and storage.
//!
//! Every user action is a method on [`NarratorSession`]. After mutating the
//! [`SessionStore`] an action re-syncs the two derived channels:
//!
//! ```text
//! action ──► SessionStore ──► RoutingController ──► UrlCommand queue
//!                │
//!                ├──────────► AudioEngine (transport / live params)
//!                │
//!                └──────────► PersistenceAdapter (when the library revision moved)
//! ```
//!
//! Notices and URL commands are queued for the host to drain.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use narrator_app_state::{
    AppState, ImportMode, InputTab, RouteOutcome, RoutingController, SessionStore, StoreError,
    UrlCommand,
};
use narrator_audio::{
    AudioEngine, CaptionTrack, LiveParams, PlaybackResource, PlaybackTransition, TransportState,
};
use narrator_common::{
    AudioUrls, NarratorConfig, PortablePresentation, PresentationId, UserSettings,
};
use narrator_project::{
    DocumentStore, ImportPreview, PersistenceAdapter, SaveReport, create_export, load_settings,
    read_import_file, save_settings, write_export_file,
};
use tracing::{debug, info, warn};

use crate::collaborators::{ContentGenerator, NarrationGenerator, generate_local_presentation};
use crate::error::{CollaboratorError, CollaboratorResult, SessionError, SessionResult};
use crate::notice::{Notice, NoticeLevel, NoticeQueue};

/// Shortest raw text accepted for generation.
pub const MIN_CONTENT_CHARS: usize = 50;

pub struct NarratorSession<S: DocumentStore, R: PlaybackResource> {
    config: NarratorConfig,
    settings: UserSettings,
    store: SessionStore,
    router: RoutingController,
    engine: AudioEngine<R>,
    persistence: PersistenceAdapter<S>,
    content_service: Box<dyn ContentGenerator>,
    narration_service: Box<dyn NarrationGenerator>,
    notices: NoticeQueue,
    url_commands: Vec<UrlCommand>,
    persisted_revision: Option<u64>,
}

impl<S: DocumentStore, R: PlaybackResource> NarratorSession<S, R> {
    pub fn new(
        config: NarratorConfig,
        document_store: S,
        resource: R,
        content_service: Box<dyn ContentGenerator>,
        narration_service: Box<dyn NarrationGenerator>,
    ) -> Self {
        let persistence = match &config.legacy_document {
            Some(path) => PersistenceAdapter::new(document_store).with_legacy_document(path),
            None => PersistenceAdapter::new(document_store),
        };
        Self {
            settings: UserSettings::default(),
            store: SessionStore::with_history_limit(config.history_limit),
            router: RoutingController::new(),
            engine: AudioEngine::new(resource, config.auto_advance_delay()),
            persistence,
            content_service,
            narration_service,
            notices: NoticeQueue::default(),
            url_commands: Vec::new(),
            persisted_revision: None,
            config,
        }
    }

    // --- Lifecycle ---

    /// Load settings and the library, then evaluate the startup route.
    ///
    /// A library that cannot be read leaves the session empty but usable.
    pub async fn init(&mut self) -> RouteOutcome {
        self.settings = load_settings(&self.config.settings_path()).await;
        self.engine.update_live(self.live_params());

        match self.persistence.load().await {
            Ok(library) => {
                self.store
                    .hydrate(library.saved_presentations, library.active_presentation_id);
            }
            Err(e) => {
                warn!(error = %e, "Library could not be loaded, starting empty");
                self.notices
                    .push(NoticeLevel::Warning, "Saved presentations could not be loaded");
            }
        }

        let outcome = self.router.on_hydrated(&mut self.store);
        self.absorb_route(&outcome);
        info!(
            saved = self.store.saved_presentations().len(),
            route = ?outcome.applied,
            "Session initialized"
        );
        outcome
    }

    /// Release audio and flush the library.
    pub async fn dispose(&mut self) {
        self.engine.dispose();
        self.store.set_is_playing(false);
        self.persist_if_changed().await;
        debug!("Session disposed");
    }

    // --- Accessors ---

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Direct access for fine-grained edits. Prefer [`edit`](Self::edit) so
    /// the change is undoable.
    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn router(&self) -> &RoutingController {
        &self.router
    }

    pub fn engine(&self) -> &AudioEngine<R> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine<R> {
        &mut self.engine
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    pub fn take_url_commands(&mut self) -> Vec<UrlCommand> {
        std::mem::take(&mut self.url_commands)
    }

    /// Edits made in the preview that could still be undone.
    pub fn has_unsaved_edits(&self) -> bool {
        self.store.app_state() == AppState::Preview && self.store.history().can_undo()
    }

    // --- Editing ---

    /// Snapshot for undo, then apply `change`.
    pub fn edit<T>(&mut self, label: &str, change: impl FnOnce(&mut SessionStore) -> T) -> T {
        self.store.push_history(label);
        let result = change(&mut self.store);
        self.sync_transport();
        result
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.store.undo();
        if undone {
            self.sync_transport();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.store.redo();
        if redone {
            self.sync_transport();
        }
        redone
    }

    // --- Generation ---

    /// Turn the raw content into slides and open the preview. A failing or
    /// slow service falls back to local generation in demo mode.
    pub async fn generate_presentation(&mut self) -> SessionResult<()> {
        let content = self.store.content().trim().to_string();
        if content.is_empty() {
            self.notices.push(NoticeLevel::Error, SessionError::EmptyContent.to_string());
            return Err(SessionError::EmptyContent);
        }
        let actual = content.chars().count();
        if actual < MIN_CONTENT_CHARS {
            return Err(SessionError::ContentTooShort {
                min: MIN_CONTENT_CHARS,
                actual,
            });
        }

        self.store.set_loading(
            true,
            "Generating your presentation...",
            "AI is structuring your content into slides",
        );
        self.store.set_loading_progress(20.0);

        let style = self.store.style();
        let limit = self.config.collaborator_timeout();
        let result = bounded(limit, self.content_service.generate(&content, style)).await;
        self.store.set_loading_progress(100.0);

        let demo = match result {
            Ok(data) => {
                self.install_generated(data);
                self.notices
                    .push(NoticeLevel::Success, "Slides generated successfully!");
                false
            }
            Err(e) => {
                warn!(error = %e, "Content service failed, generating locally");
                self.install_generated(generate_local_presentation(&content));
                self.notices.push(
                    NoticeLevel::Info,
                    "Using local generation (API unavailable)",
                );
                true
            }
        };
        self.store.set_demo_mode(demo);
        self.store.set_loading(false, "", "");
        self.store.set_app_state(AppState::Preview);
        self.sync_url();
        self.persist_if_changed().await;
        info!(
            slides = self.store.total_slides(),
            demo,
            "Presentation generated"
        );
        Ok(())
    }

    /// A freshly generated deck is a new presentation: detach from the
    /// active library entry and drop stale narration.
    fn install_generated(&mut self, data: narrator_common::PresentationData) {
        self.store.set_active_presentation_id(None);
        self.store.set_audio_urls(AudioUrls::new());
        self.store.set_last_generated_content_hash(None);
        self.store.set_presentation_data(Some(data));
        self.store.set_current_slide(0);
    }

    /// Narrate every slide and enter the viewer. Returns whether audio was
    /// produced; without it the deck is presented silently.
    pub async fn generate_narration(&mut self) -> SessionResult<bool> {
        let Some(presentation) = self.store.presentation() else {
            return Err(StoreError::NothingLoaded.into());
        };
        let scripts = presentation.scripts();
        let voice = self.store.voice();
        let hash = self.store.content_hash();

        self.store.set_loading(
            true,
            "Generating audio narration...",
            "Creating natural voice for each slide",
        );
        self.store.set_loading_progress(10.0);

        let limit = self.config.collaborator_timeout();
        let result = bounded(limit, self.narration_service.narrate(&scripts, voice))
            .await
            .and_then(|urls| validate_narration(urls, scripts.len()));
        self.store.set_loading_progress(100.0);

        let has_audio = match result {
            Ok(urls) => {
                self.store.set_audio_urls(urls.into_iter().enumerate().collect());
                self.store.set_last_generated_content_hash(hash);
                self.store.save_as_draft();
                self.notices.push(
                    NoticeLevel::Success,
                    "Audio generated! Starting presentation...",
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "Narration service failed, presenting without audio");
                self.store.set_audio_urls(AudioUrls::new());
                self.store.set_last_generated_content_hash(hash);
                self.notices.push(
                    NoticeLevel::Info,
                    "Presenting without audio (API unavailable)",
                );
                false
            }
        };

        self.store.set_current_slide(0);
        self.store.set_loading(false, "", "");
        self.enter_viewer();
        self.persist_if_changed().await;
        Ok(has_audio)
    }

    /// Open the viewer, narrating first if the content changed since the
    /// last narration. Returns whether narration was regenerated.
    pub async fn present(&mut self) -> SessionResult<bool> {
        if !self.store.has_presentation() {
            return Err(StoreError::NothingLoaded.into());
        }
        if self.store.is_content_dirty() {
            self.generate_narration().await?;
            return Ok(true);
        }
        self.store.set_current_slide(0);
        self.enter_viewer();
        Ok(false)
    }

    fn enter_viewer(&mut self) {
        self.store.set_app_state(AppState::Viewer);
        self.sync_url();
        self.sync_transport();
    }

    // --- Viewer ---

    pub fn play(&mut self) {
        self.store.set_is_playing(true);
        self.sync_transport();
    }

    pub fn pause(&mut self) {
        self.store.set_is_playing(false);
        self.sync_transport();
    }

    pub fn toggle_play(&mut self) {
        if self.store.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// User navigation to a slide. Cancels any pending auto-advance.
    pub fn go_to_slide(&mut self, index: usize) -> bool {
        if index >= self.store.total_slides() || index == self.store.current_slide() {
            return false;
        }
        self.engine.notify_manual_navigation();
        self.store.set_current_slide(index);
        self.sync_transport();
        true
    }

    pub fn next_slide(&mut self) -> bool {
        self.go_to_slide(self.store.current_slide() + 1)
    }

    pub fn previous_slide(&mut self) -> bool {
        match self.store.current_slide().checked_sub(1) {
            Some(index) => self.go_to_slide(index),
            None => false,
        }
    }

    /// Pause and rewind the current narration.
    pub fn stop(&mut self) {
        self.engine.stop();
        self.store.set_is_playing(false);
        self.sync_transport();
    }

    /// Stop playback, release audio and go back to the preview.
    pub fn exit_viewer(&mut self) {
        self.stop();
        self.engine.dispose();
        self.store.set_app_state(AppState::Preview);
        self.sync_url();
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.store.is_muted();
        self.store.set_is_muted(muted);
        self.engine.update_live(self.live_params());
    }

    pub fn toggle_script_panel(&mut self) {
        let open = !self.store.playback().script_panel_open;
        self.store.set_script_panel_open(open);
    }

    /// The current narration finished playing.
    pub fn on_audio_ended(&mut self, now: Instant) -> Option<PlaybackTransition> {
        let transition = self.engine.on_ended(
            now,
            self.store.current_slide(),
            self.store.total_slides(),
            self.settings.playback.auto_advance,
        );
        if transition == Some(PlaybackTransition::Stop) {
            self.store.set_is_playing(false);
            self.sync_transport();
        }
        transition
    }

    /// Drive the auto-advance timer. Call periodically while in the viewer.
    pub fn poll(&mut self, now: Instant) -> Option<PlaybackTransition> {
        let transition = self.engine.poll(now)?;
        if let PlaybackTransition::AdvanceTo(index) = transition {
            if !self.store.is_playing() {
                return None;
            }
            self.store.set_current_slide(index);
            self.sync_transport();
        }
        Some(transition)
    }

    /// Sentences of the current slide's script.
    pub fn caption_track(&self) -> CaptionTrack {
        CaptionTrack::new(self.store.current_script())
    }

    /// Sentence being spoken now. `None` when captions are off or the
    /// script is empty.
    pub fn active_caption(&self) -> Option<String> {
        if !self.settings.captions.enabled {
            return None;
        }
        self.caption_track()
            .active_sentence(self.engine.progress())
            .map(str::to_string)
    }

    // --- Settings ---

    pub fn set_volume(&mut self, volume: f32) {
        self.settings.set_volume(volume);
        self.engine.update_live(self.live_params());
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.settings.set_speed(speed);
        self.engine.update_live(self.live_params());
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.settings.set_auto_advance(enabled);
    }

    pub fn set_captions_enabled(&mut self, enabled: bool) {
        self.settings.set_captions_enabled(enabled);
    }

    pub async fn save_settings(&self) -> SessionResult<()> {
        save_settings(&self.config.settings_path(), &self.settings).await?;
        Ok(())
    }

    fn live_params(&self) -> LiveParams {
        LiveParams {
            volume: self.settings.playback.volume,
            speed: self.settings.playback.speed,
            muted: self.store.is_muted(),
        }
    }

    // --- Routing ---

    /// The location hash changed outside the session.
    pub fn handle_url_change(&mut self, hash: &str) -> RouteOutcome {
        let was_viewing = self.store.app_state() == AppState::Viewer;
        let outcome = self.router.on_url_changed(hash, &mut self.store);
        self.absorb_route(&outcome);
        if was_viewing && self.store.app_state() != AppState::Viewer {
            self.store.set_is_playing(false);
            self.engine.dispose();
        } else if self.store.app_state() == AppState::Viewer {
            self.sync_transport();
        }
        outcome
    }

    pub fn select_tab(&mut self, tab: InputTab) {
        if let Some(command) = self.router.select_tab(tab, &mut self.store) {
            self.url_commands.push(command);
        }
    }

    /// The host finished handling the current event turn.
    pub fn end_tick(&mut self) {
        self.router.end_tick();
    }

    fn absorb_route(&mut self, outcome: &RouteOutcome) {
        if let Some(command) = &outcome.url {
            self.url_commands.push(command.clone());
        }
        if let Some(message) = &outcome.notice {
            self.notices.push(NoticeLevel::Warning, message.clone());
        }
    }

    fn sync_url(&mut self) {
        if let Some(command) = self.router.on_state_changed(&self.store) {
            self.url_commands.push(command);
        }
    }

    // --- Library ---

    /// Save the loaded presentation under `name`.
    pub async fn save_presentation(&mut self, name: &str) -> SessionResult<PresentationId> {
        let id = match self.store.save_current_presentation(name) {
            Ok(id) => id,
            Err(e) => {
                self.notices.push(NoticeLevel::Error, e.to_string());
                return Err(e.into());
            }
        };
        self.notices.push(NoticeLevel::Success, "Presentation saved");
        self.persist_if_changed().await;
        Ok(id)
    }

    /// Open a library entry in the preview.
    pub async fn open_presentation(&mut self, id: &PresentationId) -> SessionResult<()> {
        if !self.store.load_presentation(id) {
            return Err(StoreError::NotFound(id.clone()).into());
        }
        self.sync_url();
        self.persist_if_changed().await;
        Ok(())
    }

    pub async fn delete_presentation(&mut self, id: &PresentationId) -> SessionResult<()> {
        if !self.store.delete_presentation(id) {
            return Err(StoreError::NotFound(id.clone()).into());
        }
        self.notices.push(NoticeLevel::Success, "Presentation deleted");
        self.persist_if_changed().await;
        Ok(())
    }

    /// Drop the loaded presentation and return to the create tab.
    pub async fn new_presentation(&mut self) {
        self.engine.dispose();
        self.store.clear_active_session();
        self.select_tab(InputTab::Create);
        self.persist_if_changed().await;
    }

    /// Validate an import file without changing anything.
    pub async fn preview_import(&mut self, path: &Path) -> SessionResult<ImportPreview> {
        match read_import_file(path).await {
            Ok(document) => Ok(document.preview()),
            Err(e) => Err(self.reject_import(e.into())),
        }
    }

    /// Import a `.narrator` file into the library and open it.
    pub async fn import_file(&mut self, path: &Path, mode: ImportMode) -> SessionResult<PresentationId> {
        let document = match read_import_file(path).await {
            Ok(document) => document,
            Err(e) => return Err(self.reject_import(e.into())),
        };
        let name = document.name.clone();
        let id = self
            .store
            .import_presentation(document.into_presentation(), mode);
        self.notices
            .push(NoticeLevel::Success, format!("Imported \"{name}\""));
        self.sync_url();
        if self.store.app_state() == AppState::Viewer {
            self.sync_transport();
        }
        self.persist_if_changed().await;
        Ok(id)
    }

    fn reject_import(&mut self, error: SessionError) -> SessionError {
        let message = match error.validation() {
            Some(reason) => reason.to_string(),
            None => format!("Import failed: {error}"),
        };
        warn!(error = %error, "Import rejected");
        self.notices.push(NoticeLevel::Error, message);
        error
    }

    /// Write a library entry as a `.narrator` file into `dir`.
    pub async fn export_presentation(&mut self, id: &PresentationId, dir: &Path) -> SessionResult<PathBuf> {
        let saved = self.store.get_saved(id)?;
        let document = create_export(PortablePresentation::from(saved));
        let path = write_export_file(dir, &document).await?;
        self.notices.push(NoticeLevel::Success, "Presentation exported");
        Ok(path)
    }

    /// Persist the library if it changed since the last successful save.
    /// Failures are logged and retried on the next call.
    pub async fn persist_if_changed(&mut self) -> Option<SaveReport> {
        let revision = self.store.library_revision();
        if self.persisted_revision == Some(revision) {
            return None;
        }
        let result = self
            .persistence
            .save(
                self.store.saved_presentations(),
                self.store.active_presentation_id(),
            )
            .await;
        match result {
            Ok(report) => {
                self.persisted_revision = Some(revision);
                Some(report)
            }
            Err(e) => {
                warn!(error = %e, revision, "Library save failed, will retry");
                None
            }
        }
    }

    /// Wipe the durable library and the in-memory one.
    pub async fn clear_library(&mut self) -> SessionResult<()> {
        self.persistence.clear().await?;
        self.engine.dispose();
        self.store.reset();
        self.store.hydrate(Vec::new(), None);
        self.persisted_revision = Some(self.store.library_revision());
        self.sync_url();
        Ok(())
    }

    // --- Audio sync ---

    /// Push the transport key to the engine while the viewer is showing.
    fn sync_transport(&mut self) {
        if self.store.app_state() != AppState::Viewer {
            return;
        }
        let next = TransportState {
            is_playing: self.store.is_playing(),
            current_slide: self.store.current_slide(),
            audio_urls: self.store.audio_urls().clone(),
        };
        if let Err(e) = self.engine.update_transport(next) {
            self.notices
                .push(NoticeLevel::Warning, format!("Narration could not be played: {e}"));
        }
    }
}

/// Run a collaborator call under a deadline.
async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = CollaboratorResult<T>>,
) -> CollaboratorResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(CollaboratorError::Timeout(limit)))
}

fn validate_narration(urls: Vec<String>, expected: usize) -> CollaboratorResult<Vec<String>> {
    if urls.len() != expected {
        return Err(CollaboratorError::InvalidResponse(format!(
            "expected {expected} audio references, got {}",
            urls.len()
        )));
    }
    Ok(urls)
}
