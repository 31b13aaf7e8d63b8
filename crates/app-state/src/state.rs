//! Central session state container.
//!
//! `SessionStore` owns the editing session (raw input, generated content,
//! viewer transport, narration audio), its undo history, and the in-memory
//! library of saved presentations. All modifications go through controlled
//! mutation methods; content edits are silent no-ops when nothing is loaded
//! or an index is out of range.

use narrator_common::{
    AudioUrls, MetadataPatch, PLACEHOLDER_POINT, PortablePresentation, PresentationData,
    PresentationId, SavedPresentation, Slide, SlidePatch, Style, Voice, now_millis,
};
use serde::{Deserialize, Serialize};

use crate::dirty::{self, ContentHash};
use crate::error::{StoreError, StoreResult};
use crate::history::HistoryManager;
use crate::playback::PlaybackState;

pub const NEW_SLIDE_TITLE: &str = "New Slide";
pub const NEW_SLIDE_SCRIPT: &str = "Add your speaker notes here.";
pub const NEW_BULLET: &str = "New point";
pub const UNTITLED_DRAFT: &str = "Untitled Draft";

/// Top-level screen.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    #[default]
    Input,
    Preview,
    Viewer,
}

/// Where an imported presentation opens.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Straight into the viewer.
    #[default]
    View,
    /// Into the editable preview.
    Edit,
}

/// Progress overlay shown during generation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadingState {
    pub active: bool,
    pub text: String,
    pub subtext: String,
    /// Percent in [0, 100].
    pub progress: f32,
}

/// The session engine's single source of truth.
#[derive(Debug)]
pub struct SessionStore {
    app_state: AppState,
    content: String,
    style: Style,
    voice: Voice,
    presentation: Option<PresentationData>,
    playback: PlaybackState,
    audio_urls: AudioUrls,
    last_generated_hash: Option<ContentHash>,
    demo_mode: bool,
    loading: LoadingState,

    saved: Vec<SavedPresentation>,
    active_id: Option<PresentationId>,
    library_revision: u64,

    history: HistoryManager,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(HistoryManager::default())
    }
}

impl SessionStore {
    pub fn new(history: HistoryManager) -> Self {
        Self {
            app_state: AppState::Input,
            content: String::new(),
            style: Style::default(),
            voice: Voice::default(),
            presentation: None,
            playback: PlaybackState::new(),
            audio_urls: AudioUrls::new(),
            last_generated_hash: None,
            demo_mode: false,
            loading: LoadingState::default(),
            saved: Vec::new(),
            active_id: None,
            library_revision: 0,
            history,
        }
    }

    pub fn with_history_limit(limit: usize) -> Self {
        Self::new(HistoryManager::new(limit))
    }

    // --- Read access ---

    pub fn app_state(&self) -> AppState {
        self.app_state
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }

    pub fn presentation(&self) -> Option<&PresentationData> {
        self.presentation.as_ref()
    }

    pub fn has_presentation(&self) -> bool {
        self.presentation.is_some()
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn current_slide(&self) -> usize {
        self.playback.current_slide
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing
    }

    pub fn is_muted(&self) -> bool {
        self.playback.is_muted
    }

    pub fn audio_urls(&self) -> &AudioUrls {
        &self.audio_urls
    }

    pub fn last_generated_content_hash(&self) -> Option<ContentHash> {
        self.last_generated_hash
    }

    pub fn is_demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub fn loading(&self) -> &LoadingState {
        &self.loading
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn saved_presentations(&self) -> &[SavedPresentation] {
        &self.saved
    }

    pub fn has_saved_presentations(&self) -> bool {
        !self.saved.is_empty()
    }

    pub fn active_presentation_id(&self) -> Option<&PresentationId> {
        self.active_id.as_ref()
    }

    pub fn active_presentation(&self) -> Option<&SavedPresentation> {
        self.active_id.as_ref().and_then(|id| self.find_saved(id))
    }

    pub fn find_saved(&self, id: &PresentationId) -> Option<&SavedPresentation> {
        self.saved.iter().find(|s| &s.id == id)
    }

    pub fn get_saved(&self, id: &PresentationId) -> StoreResult<&SavedPresentation> {
        self.find_saved(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Monotonic counter bumped on every change to the library or active id.
    pub fn library_revision(&self) -> u64 {
        self.library_revision
    }

    /// Slides including the title slide; 0 when nothing is loaded.
    pub fn total_slides(&self) -> usize {
        self.presentation
            .as_ref()
            .map_or(0, PresentationData::total_slides)
    }

    /// Script for the current slide, or empty when out of range.
    pub fn current_script(&self) -> &str {
        self.presentation
            .as_ref()
            .and_then(|p| p.script_at(self.playback.current_slide))
            .unwrap_or("")
    }

    // --- Atomic setters ---

    pub fn set_app_state(&mut self, state: AppState) {
        if self.app_state != state {
            tracing::debug!(from = ?self.app_state, to = ?state, "App state changed");
            self.app_state = state;
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    pub fn set_voice(&mut self, voice: Voice) {
        self.voice = voice;
    }

    /// Replace the content wholesale. Not an edit: history is cleared.
    pub fn set_presentation_data(&mut self, data: Option<PresentationData>) {
        self.presentation = data.map(|mut d| {
            d.normalize();
            d
        });
        self.history.clear();
        self.clamp_current_slide();
        tracing::debug!(slides = self.total_slides(), "Presentation data replaced");
    }

    pub fn set_audio_urls(&mut self, urls: AudioUrls) {
        tracing::debug!(tracks = urls.len(), "Audio urls set");
        self.audio_urls = urls;
    }

    /// Ignored unless `index` addresses an existing slide.
    pub fn set_current_slide(&mut self, index: usize) {
        let total = self.total_slides();
        self.playback.go_to(index, total);
    }

    pub fn set_is_playing(&mut self, playing: bool) {
        if playing {
            self.playback.play();
        } else {
            self.playback.pause();
        }
    }

    pub fn set_is_muted(&mut self, muted: bool) {
        self.playback.is_muted = muted;
    }

    pub fn set_script_panel_open(&mut self, open: bool) {
        self.playback.script_panel_open = open;
    }

    pub fn set_loading(&mut self, active: bool, text: impl Into<String>, subtext: impl Into<String>) {
        self.loading = LoadingState {
            active,
            text: text.into(),
            subtext: subtext.into(),
            progress: 0.0,
        };
    }

    pub fn set_loading_progress(&mut self, progress: f32) {
        self.loading.progress = progress.clamp(0.0, 100.0);
    }

    pub fn set_demo_mode(&mut self, demo: bool) {
        self.demo_mode = demo;
    }

    pub fn set_last_generated_content_hash(&mut self, hash: Option<ContentHash>) {
        self.last_generated_hash = hash;
    }

    /// Point the session at a library entry. An id that does not resolve
    /// clears the reference instead of dangling.
    pub fn set_active_presentation_id(&mut self, id: Option<PresentationId>) {
        let resolved = id.filter(|id| self.find_saved(id).is_some());
        if resolved != self.active_id {
            self.active_id = resolved;
            self.bump_library();
        }
    }

    // --- Content editing ---

    pub fn update_slide(&mut self, index: usize, patch: SlidePatch) {
        let Some(slide) = self
            .presentation
            .as_mut()
            .and_then(|p| p.slides.get_mut(index))
        else {
            return;
        };
        slide.apply(patch);
        if slide.points.is_empty() {
            slide.points.push(PLACEHOLDER_POINT.to_string());
        }
    }

    pub fn update_metadata(&mut self, patch: MetadataPatch) {
        if let Some(p) = self.presentation.as_mut() {
            p.metadata.apply(patch);
        }
    }

    /// Insert a placeholder slide after `after_index` (`-1` = at the start;
    /// past the end appends). Returns the new slide's position in `slides`.
    pub fn add_slide(&mut self, after_index: isize) -> Option<usize> {
        let presentation = self.presentation.as_mut()?;
        let at = if after_index < 0 {
            0
        } else {
            (after_index as usize)
                .saturating_add(1)
                .min(presentation.slides.len())
        };
        presentation.slides.insert(
            at,
            Slide::new(NEW_SLIDE_TITLE, vec![PLACEHOLDER_POINT.to_string()], NEW_SLIDE_SCRIPT),
        );
        tracing::debug!(at, slides = presentation.slides.len(), "Slide added");
        Some(at)
    }

    /// Remove a slide. The last remaining slide is never removed.
    pub fn remove_slide(&mut self, index: usize) {
        let Some(presentation) = self.presentation.as_mut() else {
            return;
        };
        if presentation.slides.len() <= 1 || index >= presentation.slides.len() {
            return;
        }
        presentation.slides.remove(index);
        tracing::debug!(index, slides = presentation.slides.len(), "Slide removed");
        self.clamp_current_slide();
    }

    /// Move a slide: remove at `from`, then insert at `to`.
    pub fn reorder_slides(&mut self, from: usize, to: usize) {
        let Some(presentation) = self.presentation.as_mut() else {
            return;
        };
        let len = presentation.slides.len();
        if from >= len || to >= len || from == to {
            return;
        }
        let slide = presentation.slides.remove(from);
        presentation.slides.insert(to, slide);
        tracing::debug!(from, to, "Slides reordered");
    }

    pub fn add_bullet(&mut self, slide_index: usize) {
        if let Some(slide) = self.slide_mut(slide_index) {
            slide.points.push(NEW_BULLET.to_string());
        }
    }

    /// Remove a bullet. The last bullet of a slide is never removed.
    pub fn remove_bullet(&mut self, slide_index: usize, bullet_index: usize) {
        if let Some(slide) = self.slide_mut(slide_index) {
            if slide.points.len() > 1 && bullet_index < slide.points.len() {
                slide.points.remove(bullet_index);
            }
        }
    }

    fn slide_mut(&mut self, index: usize) -> Option<&mut Slide> {
        self.presentation.as_mut()?.slides.get_mut(index)
    }

    fn clamp_current_slide(&mut self) {
        let total = self.total_slides();
        if total == 0 {
            self.playback.current_slide = 0;
        } else if self.playback.current_slide >= total {
            self.playback.current_slide = total - 1;
        }
    }

    // --- History ---

    /// Snapshot the content before a logical edit begins.
    pub fn push_history(&mut self, label: &str) {
        if let Some(p) = &self.presentation {
            self.history.push(label, p.clone());
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.presentation.is_none() || !self.history.can_undo() {
            return false;
        }
        if let Some(current) = self.presentation.take() {
            self.presentation = self.history.undo(current);
        }
        self.clamp_current_slide();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.presentation.is_none() || !self.history.can_redo() {
            return false;
        }
        if let Some(current) = self.presentation.take() {
            self.presentation = self.history.redo(current);
        }
        self.clamp_current_slide();
        true
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // --- Dirty tracking ---

    pub fn content_hash(&self) -> Option<ContentHash> {
        self.presentation
            .as_ref()
            .map(|p| dirty::content_hash(p, self.voice))
    }

    /// Whether narration must be (re)generated before presenting.
    pub fn is_content_dirty(&self) -> bool {
        match self.content_hash() {
            Some(live) => dirty::is_dirty(
                live,
                self.last_generated_hash,
                !self.audio_urls.is_empty(),
            ),
            None => true,
        }
    }

    /// Record the live content as the version the current audio was made from.
    pub fn mark_narration_generated(&mut self) {
        self.last_generated_hash = self.content_hash();
    }

    // --- Library ---

    /// Save the loaded presentation under `name`, updating the active entry
    /// in place when there is one.
    pub fn save_current_presentation(&mut self, name: &str) -> StoreResult<PresentationId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let data = self.presentation.clone().ok_or(StoreError::NothingLoaded)?;
        let (audio, style, voice) = (self.audio_urls.clone(), self.style, self.voice);

        let id = match self.active_entry_mut() {
            Some(entry) => {
                entry.name = name.to_string();
                entry.saved_at = now_millis();
                entry.presentation_data = data;
                entry.audio_urls = audio;
                entry.style = style;
                entry.voice = voice;
                entry.is_draft = None;
                entry.id.clone()
            }
            None => {
                let id = PresentationId::generate(PresentationId::SAVED_PREFIX);
                self.saved.push(SavedPresentation {
                    id: id.clone(),
                    name: name.to_string(),
                    saved_at: now_millis(),
                    presentation_data: data,
                    audio_urls: audio,
                    style,
                    voice,
                    is_draft: None,
                });
                self.active_id = Some(id.clone());
                id
            }
        };
        self.bump_library();
        tracing::info!(id = %id, name, "Presentation saved");
        Ok(id)
    }

    /// Auto-save after narration generation. `None` when nothing is loaded.
    pub fn save_as_draft(&mut self) -> Option<PresentationId> {
        let data = self.presentation.clone()?;
        let (audio, style, voice) = (self.audio_urls.clone(), self.style, self.voice);

        let id = match self.active_entry_mut() {
            Some(entry) => {
                entry.saved_at = now_millis();
                entry.presentation_data = data;
                entry.audio_urls = audio;
                entry.style = style;
                entry.voice = voice;
                entry.id.clone()
            }
            None => {
                let id = PresentationId::generate(PresentationId::DRAFT_PREFIX);
                let title = data.metadata.title.trim();
                let name = if title.is_empty() { UNTITLED_DRAFT } else { title }.to_string();
                self.saved.push(SavedPresentation {
                    id: id.clone(),
                    name,
                    saved_at: now_millis(),
                    presentation_data: data,
                    audio_urls: audio,
                    style,
                    voice,
                    is_draft: Some(true),
                });
                self.active_id = Some(id.clone());
                id
            }
        };
        self.bump_library();
        tracing::debug!(id = %id, "Draft saved");
        Some(id)
    }

    /// Open a saved presentation in the preview. Returns `false` for an unknown id.
    pub fn load_presentation(&mut self, id: &PresentationId) -> bool {
        let Some(saved) = self.find_saved(id).cloned() else {
            tracing::warn!(id = %id, "Load requested for unknown presentation");
            return false;
        };
        self.install(saved);
        self.set_app_state(AppState::Preview);
        true
    }

    /// Remove a library entry. Returns whether anything was removed.
    pub fn delete_presentation(&mut self, id: &PresentationId) -> bool {
        let before = self.saved.len();
        self.saved.retain(|s| &s.id != id);
        if self.saved.len() == before {
            return false;
        }
        if self.active_id.as_ref() == Some(id) {
            self.active_id = None;
        }
        self.bump_library();
        tracing::info!(id = %id, "Presentation deleted");
        true
    }

    /// Add an imported presentation to the library and open it.
    pub fn import_presentation(
        &mut self,
        imported: PortablePresentation,
        mode: ImportMode,
    ) -> PresentationId {
        let id = PresentationId::generate(PresentationId::SAVED_PREFIX);
        let saved = imported.into_saved(id.clone(), now_millis());
        self.saved.push(saved.clone());
        self.install(saved);
        self.set_app_state(match mode {
            ImportMode::View => AppState::Viewer,
            ImportMode::Edit => AppState::Preview,
        });
        tracing::info!(id = %id, ?mode, "Presentation imported");
        id
    }

    /// Detach from the active presentation and drop the loaded content.
    pub fn clear_active_session(&mut self) {
        self.active_id = None;
        self.content.clear();
        self.presentation = None;
        self.audio_urls.clear();
        self.playback.rewind();
        self.last_generated_hash = None;
        self.history.clear();
        self.bump_library();
        tracing::debug!("Active session cleared");
    }

    /// Make sure content is loaded, reloading the active presentation if
    /// needed. A dangling active id is dropped and recovery fails.
    pub fn try_recover_session(&mut self) -> bool {
        if self.presentation.is_some() {
            return true;
        }
        let Some(id) = self.active_id.clone() else {
            return false;
        };
        match self.find_saved(&id).cloned() {
            Some(saved) => {
                self.install(saved);
                tracing::info!(id = %id, "Session recovered");
                true
            }
            None => {
                tracing::warn!(id = %id, "Active presentation no longer exists");
                self.active_id = None;
                self.bump_library();
                false
            }
        }
    }

    /// Back to the initial session. The library survives.
    pub fn reset(&mut self) {
        self.app_state = AppState::Input;
        self.content.clear();
        self.style = Style::default();
        self.voice = Voice::default();
        self.presentation = None;
        self.playback = PlaybackState::new();
        self.audio_urls.clear();
        self.last_generated_hash = None;
        self.demo_mode = false;
        self.loading = LoadingState::default();
        self.history.clear();
        if self.active_id.take().is_some() {
            self.bump_library();
        }
        tracing::debug!("Session reset");
    }

    /// Install the persisted library after hydration.
    pub fn hydrate(&mut self, library: Vec<SavedPresentation>, active_id: Option<PresentationId>) {
        self.saved = library;
        self.active_id = active_id.filter(|id| self.saved.iter().any(|s| &s.id == id));
        self.bump_library();
        tracing::debug!(
            saved = self.saved.len(),
            active = self.active_id.is_some(),
            "Library hydrated"
        );
    }

    fn active_entry_mut(&mut self) -> Option<&mut SavedPresentation> {
        let id = self.active_id.as_ref()?;
        self.saved.iter_mut().find(|s| &s.id == id)
    }

    /// Load a library entry into the session without touching the app state.
    fn install(&mut self, saved: SavedPresentation) {
        let mut data = saved.presentation_data;
        data.normalize();
        self.presentation = Some(data);
        self.audio_urls = saved.audio_urls;
        self.style = saved.style;
        self.voice = saved.voice;
        self.playback.rewind();
        self.history.clear();
        if self.active_id.as_ref() != Some(&saved.id) {
            self.active_id = Some(saved.id);
            self.bump_library();
        }
        self.last_generated_hash = if self.audio_urls.is_empty() {
            None
        } else {
            self.content_hash()
        };
    }

    fn bump_library(&mut self) {
        self.library_revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_common::PresentationMetadata;

    fn make_data(titles: &[&str]) -> PresentationData {
        PresentationData {
            metadata: PresentationMetadata {
                title: "Deck".into(),
                subtitle: "Sub".into(),
                title_script: "Welcome.".into(),
            },
            slides: titles
                .iter()
                .map(|t| Slide::new(*t, vec![format!("{t} point")], format!("{t} script.")))
                .collect(),
        }
    }

    fn loaded(titles: &[&str]) -> SessionStore {
        let mut store = SessionStore::default();
        store.set_presentation_data(Some(make_data(titles)));
        store
    }

    fn slide_titles(store: &SessionStore) -> Vec<String> {
        store
            .presentation()
            .unwrap()
            .slides
            .iter()
            .map(|s| s.title.clone())
            .collect()
    }

    fn audio() -> AudioUrls {
        let mut urls = AudioUrls::new();
        urls.insert(0, "audio:0".into());
        urls
    }

    #[test]
    fn new_store_defaults() {
        let store = SessionStore::default();
        assert_eq!(store.app_state(), AppState::Input);
        assert_eq!(store.style(), Style::Narrative);
        assert_eq!(store.voice(), Voice::Nova);
        assert!(!store.has_presentation());
        assert_eq!(store.total_slides(), 0);
        assert_eq!(store.current_script(), "");
        assert!(store.active_presentation_id().is_none());
    }

    #[test]
    fn total_slides_includes_title_slide() {
        let store = loaded(&["A", "B", "C"]);
        assert_eq!(store.total_slides(), 4);
    }

    #[test]
    fn current_script_follows_slide_index() {
        let mut store = loaded(&["A", "B"]);
        assert_eq!(store.current_script(), "Welcome.");
        store.set_current_slide(2);
        assert_eq!(store.current_script(), "B script.");
        store.set_current_slide(9);
        assert_eq!(store.current_slide(), 2);
    }

    #[test]
    fn set_presentation_data_normalizes() {
        let mut store = SessionStore::default();
        store.set_presentation_data(Some(PresentationData::default()));
        let p = store.presentation().unwrap();
        assert_eq!(p.slides.len(), 1);
        assert_eq!(p.slides[0].points.len(), 1);
    }

    #[test]
    fn edits_without_presentation_are_noops() {
        let mut store = SessionStore::default();
        store.update_slide(0, SlidePatch::title("X"));
        store.update_metadata(MetadataPatch::title("X"));
        assert!(store.add_slide(0).is_none());
        store.remove_slide(0);
        store.reorder_slides(0, 1);
        store.add_bullet(0);
        store.remove_bullet(0, 0);
        store.push_history("Edit");
        assert!(!store.undo());
        assert!(!store.has_presentation());
        assert!(!store.history().can_undo());
    }

    #[test]
    fn out_of_range_edits_are_noops() {
        let mut store = loaded(&["A"]);
        store.update_slide(5, SlidePatch::title("X"));
        store.add_bullet(5);
        store.remove_bullet(0, 7);
        store.reorder_slides(0, 5);
        assert_eq!(slide_titles(&store), vec!["A"]);
    }

    #[test]
    fn update_slide_applies_partial_patch() {
        let mut store = loaded(&["A"]);
        store.update_slide(0, SlidePatch::script("New script."));
        let slide = &store.presentation().unwrap().slides[0];
        assert_eq!(slide.title, "A");
        assert_eq!(slide.script, "New script.");

        store.update_slide(0, SlidePatch::points(Vec::new()));
        assert_eq!(store.presentation().unwrap().slides[0].points, vec![PLACEHOLDER_POINT]);
    }

    #[test]
    fn update_metadata_applies_partial_patch() {
        let mut store = loaded(&["A"]);
        store.update_metadata(MetadataPatch::subtitle("Other"));
        let meta = &store.presentation().unwrap().metadata;
        assert_eq!(meta.title, "Deck");
        assert_eq!(meta.subtitle, "Other");
    }

    #[test]
    fn add_slide_positions() {
        let mut store = loaded(&["A", "B"]);
        assert_eq!(store.add_slide(-1), Some(0));
        assert_eq!(store.add_slide(1), Some(2));
        assert_eq!(store.add_slide(99), Some(4));
        assert_eq!(
            slide_titles(&store),
            vec![NEW_SLIDE_TITLE, "A", NEW_SLIDE_TITLE, "B", NEW_SLIDE_TITLE]
        );
        let added = &store.presentation().unwrap().slides[0];
        assert_eq!(added.points, vec![PLACEHOLDER_POINT]);
        assert_eq!(added.script, NEW_SLIDE_SCRIPT);
    }

    #[test]
    fn remove_slide_keeps_last_slide() {
        let mut store = loaded(&["A"]);
        store.remove_slide(0);
        assert_eq!(slide_titles(&store), vec!["A"]);

        let mut store = loaded(&["A", "B"]);
        store.set_current_slide(2);
        store.remove_slide(1);
        assert_eq!(slide_titles(&store), vec!["A"]);
        assert_eq!(store.current_slide(), 1);
    }

    #[test]
    fn reorder_is_remove_then_insert() {
        let mut store = loaded(&["A", "B", "C"]);
        store.reorder_slides(0, 2);
        assert_eq!(slide_titles(&store), vec!["B", "C", "A"]);
        store.reorder_slides(2, 0);
        assert_eq!(slide_titles(&store), vec!["A", "B", "C"]);
    }

    #[test]
    fn bullets() {
        let mut store = loaded(&["A"]);
        store.add_bullet(0);
        assert_eq!(
            store.presentation().unwrap().slides[0].points,
            vec!["A point", NEW_BULLET]
        );
        store.remove_bullet(0, 0);
        assert_eq!(store.presentation().unwrap().slides[0].points, vec![NEW_BULLET]);
        store.remove_bullet(0, 0);
        assert_eq!(store.presentation().unwrap().slides[0].points, vec![NEW_BULLET]);
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut store = loaded(&["A"]);
        store.push_history("Edit title");
        store.update_slide(0, SlidePatch::title("X"));

        assert!(store.undo());
        assert_eq!(slide_titles(&store), vec!["A"]);
        assert!(store.redo());
        assert_eq!(slide_titles(&store), vec!["X"]);

        assert!(store.undo());
        store.push_history("Another edit");
        assert!(!store.history().can_redo());
    }

    #[test]
    fn history_is_bounded() {
        let mut store = loaded(&["A"]);
        for _ in 0..60 {
            store.push_history("Edit");
        }
        assert_eq!(store.history().undo_count(), 50);
    }

    #[test]
    fn undo_clamps_current_slide() {
        let mut store = loaded(&["A"]);
        store.push_history("Add slide");
        store.add_slide(0);
        store.set_current_slide(2);
        assert!(store.undo());
        assert_eq!(store.current_slide(), 1);
    }

    #[test]
    fn content_replacement_clears_history() {
        let mut store = loaded(&["A"]);
        store.push_history("Edit");
        store.set_presentation_data(Some(make_data(&["B"])));
        assert!(!store.history().can_undo());
    }

    #[test]
    fn dirty_tracking() {
        let mut store = loaded(&["A"]);
        assert!(store.is_content_dirty());

        store.set_audio_urls(audio());
        store.mark_narration_generated();
        assert!(!store.is_content_dirty());

        store.update_slide(0, SlidePatch::title("Changed"));
        assert!(store.is_content_dirty());
    }

    #[test]
    fn recorded_hash_without_audio_is_dirty() {
        let mut store = loaded(&["A"]);
        store.mark_narration_generated();
        assert!(store.is_content_dirty());
    }

    #[test]
    fn voice_change_makes_content_dirty() {
        let mut store = loaded(&["A"]);
        store.set_audio_urls(audio());
        store.mark_narration_generated();
        store.set_voice(Voice::Echo);
        assert!(store.is_content_dirty());
    }

    #[test]
    fn save_requires_name_and_content() {
        let mut store = SessionStore::default();
        assert_eq!(store.save_current_presentation("Deck"), Err(StoreError::NothingLoaded));
        let mut store = loaded(&["A"]);
        assert_eq!(store.save_current_presentation("   "), Err(StoreError::EmptyName));
        assert!(store.saved_presentations().is_empty());
    }

    #[test]
    fn save_appends_then_updates_in_place() {
        let mut store = loaded(&["A"]);
        let rev = store.library_revision();
        let id = store.save_current_presentation("  My deck ").unwrap();
        assert!(id.as_str().starts_with("pres_"));
        assert_eq!(store.active_presentation_id(), Some(&id));
        assert_eq!(store.saved_presentations()[0].name, "My deck");
        assert!(store.library_revision() > rev);

        store.update_slide(0, SlidePatch::title("B"));
        let again = store.save_current_presentation("Renamed").unwrap();
        assert_eq!(again, id);
        assert_eq!(store.saved_presentations().len(), 1);
        let saved = &store.saved_presentations()[0];
        assert_eq!(saved.name, "Renamed");
        assert_eq!(saved.presentation_data.slides[0].title, "B");
    }

    #[test]
    fn draft_then_explicit_save_clears_flag() {
        let mut store = loaded(&["A"]);
        let draft = store.save_as_draft().unwrap();
        assert!(draft.as_str().starts_with("draft_"));
        let entry = store.find_saved(&draft).unwrap();
        assert!(entry.is_draft());
        assert_eq!(entry.name, "Deck");

        let id = store.save_current_presentation("Final").unwrap();
        assert_eq!(id, draft);
        assert!(!store.find_saved(&id).unwrap().is_draft());
    }

    #[test]
    fn draft_name_falls_back_when_title_empty() {
        let mut store = loaded(&["A"]);
        store.update_metadata(MetadataPatch::title("  "));
        let id = store.save_as_draft().unwrap();
        assert_eq!(store.find_saved(&id).unwrap().name, UNTITLED_DRAFT);
        assert!(SessionStore::default().save_as_draft().is_none());
    }

    #[test]
    fn load_presentation_installs_entry() {
        let mut store = loaded(&["A"]);
        store.set_audio_urls(audio());
        let id = store.save_current_presentation("Deck").unwrap();

        store.clear_active_session();
        assert!(!store.has_presentation());

        assert!(store.load_presentation(&id));
        assert_eq!(store.app_state(), AppState::Preview);
        assert_eq!(store.current_slide(), 0);
        assert_eq!(store.active_presentation_id(), Some(&id));
        assert!(!store.is_content_dirty());

        assert!(!store.load_presentation(&"missing".into()));
    }

    #[test]
    fn load_without_audio_clears_stale_hash() {
        let mut store = loaded(&["A"]);
        let id = store.save_current_presentation("Deck").unwrap();
        store.set_last_generated_content_hash(Some(ContentHash(1)));
        assert!(store.load_presentation(&id));
        assert!(store.last_generated_content_hash().is_none());
    }

    #[test]
    fn deleting_active_presentation_nulls_reference() {
        let mut store = loaded(&["A"]);
        let id = store.save_current_presentation("Deck").unwrap();
        assert!(store.delete_presentation(&id));
        assert!(store.active_presentation_id().is_none());
        assert!(!store.delete_presentation(&id));
    }

    #[test]
    fn import_enters_requested_mode() {
        let portable = PortablePresentation {
            name: "Imported".into(),
            presentation_data: make_data(&["A", "B"]),
            audio_urls: audio(),
            style: Style::Creative,
            voice: Voice::Fable,
        };

        let mut store = SessionStore::default();
        let id = store.import_presentation(portable.clone(), ImportMode::View);
        assert_eq!(store.app_state(), AppState::Viewer);
        assert_eq!(store.active_presentation_id(), Some(&id));
        assert_eq!(store.style(), Style::Creative);
        assert_eq!(store.voice(), Voice::Fable);
        assert!(!store.is_content_dirty());

        let other = store.import_presentation(portable, ImportMode::Edit);
        assert_ne!(other, id);
        assert_eq!(store.app_state(), AppState::Preview);
        assert_eq!(store.saved_presentations().len(), 2);
    }

    #[test]
    fn recover_session() {
        let mut store = loaded(&["A"]);
        assert!(store.try_recover_session());

        let id = store.save_current_presentation("Deck").unwrap();
        store.set_presentation_data(None);
        assert!(store.try_recover_session());
        assert_eq!(store.active_presentation_id(), Some(&id));
        assert_eq!(slide_titles(&store), vec!["A"]);
    }

    #[test]
    fn recover_with_dangling_id_fails_and_clears_it() {
        let mut store = SessionStore::default();
        store.hydrate(Vec::new(), None);
        assert!(!store.try_recover_session());

        let mut store = loaded(&["A"]);
        let id = store.save_current_presentation("Deck").unwrap();
        store.set_presentation_data(None);
        // Simulate the entry vanishing underneath the reference.
        store.saved.clear();
        assert!(!store.try_recover_session());
        assert!(store.active_presentation_id().is_none());
        assert!(store.find_saved(&id).is_none());
    }

    #[test]
    fn hydrate_drops_unknown_active_id() {
        let mut store = loaded(&["A"]);
        let id = store.save_current_presentation("Deck").unwrap();
        let library = store.saved_presentations().to_vec();

        let mut fresh = SessionStore::default();
        fresh.hydrate(library.clone(), Some("gone".into()));
        assert!(fresh.active_presentation_id().is_none());

        fresh.hydrate(library, Some(id.clone()));
        assert_eq!(fresh.active_presentation_id(), Some(&id));
    }

    #[test]
    fn set_active_id_rejects_unknown_ids() {
        let mut store = loaded(&["A"]);
        store.set_active_presentation_id(Some("nope".into()));
        assert!(store.active_presentation_id().is_none());
    }

    #[test]
    fn reset_keeps_library() {
        let mut store = loaded(&["A"]);
        store.save_current_presentation("Deck").unwrap();
        store.set_style(Style::Minimal);
        store.set_demo_mode(true);
        store.push_history("Edit");
        store.reset();

        assert!(!store.has_presentation());
        assert_eq!(store.style(), Style::Narrative);
        assert!(!store.is_demo_mode());
        assert!(store.active_presentation_id().is_none());
        assert!(!store.history().can_undo());
        assert_eq!(store.saved_presentations().len(), 1);
    }

    #[test]
    fn loading_progress() {
        let mut store = SessionStore::default();
        store.set_loading(true, "Generating", "Please wait");
        store.set_loading_progress(140.0);
        assert_eq!(store.loading().progress, 100.0);
        store.set_loading(true, "Narrating", "");
        assert_eq!(store.loading().progress, 0.0);
    }
}
