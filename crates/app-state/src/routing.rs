//! Two-way sync between the location hash and the session's screen.
//!
//! Hash grammar: `#/`, `#/create`, `#/library`, `#/import`, `#/preview`,
//! `#/present` (case insensitive, leading `#` / `#/` optional).
//!
//! Both directions can trigger each other: pushing a URL produces a URL
//! event, and applying a URL changes the state. The controller tracks which
//! side started the current sync (`SyncOrigin`) and the tick it started in;
//! the echo coming back from the other side in the same tick is dropped.
//! The host calls [`RoutingController::end_tick`] once its event turn is
//! over.

use std::fmt;

use crate::state::{AppState, SessionStore};

pub const NO_PRESENTATION_NOTICE: &str =
    "No presentation is loaded. Pick one from your library or create a new one.";

/// Tab of the input screen.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum InputTab {
    #[default]
    Create,
    Library,
    Import,
}

/// A navigable location.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Create,
    Library,
    Import,
    Preview,
    Present,
}

impl Route {
    /// Parse a location hash. `None` for empty or unrecognized fragments;
    /// a bare `#/` is the create route.
    pub fn parse(hash: &str) -> Option<Route> {
        let path = hash.trim();
        let path = path.strip_prefix('#').unwrap_or(path);
        if path == "/" {
            return Some(Route::Create);
        }
        let path = path.strip_prefix('/').unwrap_or(path);
        match path.to_ascii_lowercase().as_str() {
            "create" => Some(Route::Create),
            "library" => Some(Route::Library),
            "import" => Some(Route::Import),
            "preview" => Some(Route::Preview),
            "present" => Some(Route::Present),
            _ => None,
        }
    }

    pub fn to_hash(self) -> &'static str {
        match self {
            Route::Create => "#/",
            Route::Library => "#/library",
            Route::Import => "#/import",
            Route::Preview => "#/preview",
            Route::Present => "#/present",
        }
    }

    /// Landing route: the library once anything is saved.
    pub fn default_for(has_saved: bool) -> Route {
        if has_saved {
            Route::Library
        } else {
            Route::Create
        }
    }

    pub fn from_state(app_state: AppState, tab: InputTab) -> Route {
        match app_state {
            AppState::Preview => Route::Preview,
            AppState::Viewer => Route::Present,
            AppState::Input => match tab {
                InputTab::Create => Route::Create,
                InputTab::Library => Route::Library,
                InputTab::Import => Route::Import,
            },
        }
    }

    /// Screen and (for input routes) tab this route shows.
    pub fn target(self) -> (AppState, Option<InputTab>) {
        match self {
            Route::Create => (AppState::Input, Some(InputTab::Create)),
            Route::Library => (AppState::Input, Some(InputTab::Library)),
            Route::Import => (AppState::Input, Some(InputTab::Import)),
            Route::Preview => (AppState::Preview, None),
            Route::Present => (AppState::Viewer, None),
        }
    }

    pub fn needs_content(self) -> bool {
        matches!(self, Route::Preview | Route::Present)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_hash())
    }
}

/// Which side started the sync in progress.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncOrigin {
    FromUrl,
    FromProgram,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    Syncing { origin: SyncOrigin, generation: u64 },
}

/// Instruction for the host's location bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UrlCommand {
    /// New history entry.
    Push(String),
    /// Rewrite the current entry.
    Replace(String),
}

/// Result of handling a URL event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Route that was applied, if any.
    pub applied: Option<Route>,
    pub url: Option<UrlCommand>,
    /// User-facing message, set when a guarded route was refused.
    pub notice: Option<String>,
    /// Content was reloaded from the active saved presentation.
    pub recovered: bool,
    /// Held back until hydration completes.
    pub deferred: bool,
}

#[derive(Debug, Default)]
pub struct RoutingController {
    tab: InputTab,
    phase: SyncPhase,
    generation: u64,
    hydrated: bool,
    pending_hash: Option<String>,
    current_hash: String,
}

impl RoutingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_tab(&self) -> InputTab {
        self.tab
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Hash the controller believes the location bar shows.
    pub fn current_hash(&self) -> &str {
        &self.current_hash
    }

    /// Route the current state maps to.
    pub fn current_route(&self, store: &SessionStore) -> Route {
        Route::from_state(store.app_state(), self.tab)
    }

    /// Handle a location change (initial load, back/forward, manual edit).
    pub fn on_url_changed(&mut self, hash: &str, store: &mut SessionStore) -> RouteOutcome {
        if !self.hydrated {
            tracing::debug!(hash, "URL event deferred until hydration");
            self.pending_hash = Some(hash.to_string());
            return RouteOutcome {
                deferred: true,
                ..RouteOutcome::default()
            };
        }

        let fallback = Route::default_for(store.has_saved_presentations());
        let parsed = Route::parse(hash);
        let mut route = parsed.unwrap_or(fallback);
        if self.is_echo_of(SyncOrigin::FromProgram) && route.to_hash() == self.current_hash {
            tracing::debug!(hash, "URL echo of programmatic navigation suppressed");
            return RouteOutcome::default();
        }

        let mut outcome = RouteOutcome::default();
        if parsed.is_none() && hash.trim() != fallback.to_hash() {
            outcome.url = Some(UrlCommand::Replace(fallback.to_hash().to_string()));
        }

        if route.needs_content() && !store.has_presentation() {
            if store.try_recover_session() {
                outcome.recovered = true;
            } else {
                tracing::warn!(hash, redirect = %fallback, "Guarded route without content");
                outcome.url = Some(UrlCommand::Replace(fallback.to_hash().to_string()));
                outcome.notice = Some(NO_PRESENTATION_NOTICE.to_string());
                route = fallback;
            }
        }

        self.begin_sync(SyncOrigin::FromUrl);
        self.apply(route, store);
        outcome.applied = Some(route);
        outcome
    }

    /// Reflect a programmatic state change in the URL. Returns the push to
    /// perform, if the expected route differs from the current one.
    pub fn on_state_changed(&mut self, store: &SessionStore) -> Option<UrlCommand> {
        if !self.hydrated || self.is_echo_of(SyncOrigin::FromUrl) {
            return None;
        }
        let expected = self.current_route(store).to_hash();
        if expected == self.current_hash {
            return None;
        }
        tracing::debug!(from = %self.current_hash, to = expected, "State change pushes URL");
        self.current_hash = expected.to_string();
        self.begin_sync(SyncOrigin::FromProgram);
        Some(UrlCommand::Push(expected.to_string()))
    }

    /// Switch input tab, which is a programmatic navigation.
    pub fn select_tab(&mut self, tab: InputTab, store: &mut SessionStore) -> Option<UrlCommand> {
        self.tab = tab;
        store.set_app_state(AppState::Input);
        self.on_state_changed(store)
    }

    /// The host's event turn is over; echoes can no longer arrive.
    pub fn end_tick(&mut self) {
        self.phase = SyncPhase::Idle;
        self.generation += 1;
    }

    /// Hydration finished: evaluate the URL seen during startup (or the
    /// current one if none arrived).
    pub fn on_hydrated(&mut self, store: &mut SessionStore) -> RouteOutcome {
        self.hydrated = true;
        let hash = self
            .pending_hash
            .take()
            .unwrap_or_else(|| self.current_hash.clone());
        tracing::debug!(hash = %hash, "Evaluating initial route");
        self.on_url_changed(&hash, store)
    }

    fn is_echo_of(&self, origin: SyncOrigin) -> bool {
        matches!(
            self.phase,
            SyncPhase::Syncing { origin: o, generation } if o == origin && generation == self.generation
        )
    }

    fn begin_sync(&mut self, origin: SyncOrigin) {
        self.phase = SyncPhase::Syncing {
            origin,
            generation: self.generation,
        };
    }

    fn apply(&mut self, route: Route, store: &mut SessionStore) {
        let (app_state, tab) = route.target();
        if let Some(tab) = tab {
            self.tab = tab;
        }
        store.set_app_state(app_state);
        self.current_hash = route.to_hash().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_common::{PresentationData, PresentationMetadata, Slide};

    fn data() -> PresentationData {
        PresentationData {
            metadata: PresentationMetadata {
                title: "Deck".into(),
                ..PresentationMetadata::default()
            },
            slides: vec![Slide::new("A", vec!["p".into()], "s")],
        }
    }

    fn hydrated() -> (RoutingController, SessionStore) {
        let mut router = RoutingController::new();
        let mut store = SessionStore::default();
        store.hydrate(Vec::new(), None);
        router.on_hydrated(&mut store);
        router.end_tick();
        (router, store)
    }

    #[test]
    fn parse_grammar() {
        assert_eq!(Route::parse("#/library"), Some(Route::Library));
        assert_eq!(Route::parse("#/LIBRARY"), Some(Route::Library));
        assert_eq!(Route::parse("library"), Some(Route::Library));
        assert_eq!(Route::parse("#present"), Some(Route::Present));
        assert_eq!(Route::parse("/import"), Some(Route::Import));
        assert_eq!(Route::parse("#/create"), Some(Route::Create));
        assert_eq!(Route::parse("#/"), Some(Route::Create));
        assert_eq!(Route::parse(""), None);
        assert_eq!(Route::parse("#"), None);
        assert_eq!(Route::parse("#/settings"), None);
    }

    #[test]
    fn create_renders_as_root() {
        assert_eq!(Route::Create.to_hash(), "#/");
        assert_eq!(Route::Present.to_string(), "#/present");
    }

    #[test]
    fn state_maps_to_route() {
        assert_eq!(Route::from_state(AppState::Input, InputTab::Import), Route::Import);
        assert_eq!(Route::from_state(AppState::Preview, InputTab::Library), Route::Preview);
        assert_eq!(Route::from_state(AppState::Viewer, InputTab::Create), Route::Present);
    }

    #[test]
    fn events_before_hydration_are_deferred() {
        let mut router = RoutingController::new();
        let mut store = SessionStore::default();
        let outcome = router.on_url_changed("#/import", &mut store);
        assert!(outcome.deferred);
        assert_eq!(router.input_tab(), InputTab::Create);
        assert!(router.on_state_changed(&store).is_none());

        store.hydrate(Vec::new(), None);
        let outcome = router.on_hydrated(&mut store);
        assert_eq!(outcome.applied, Some(Route::Import));
        assert_eq!(router.input_tab(), InputTab::Import);
        assert_eq!(router.current_hash(), "#/import");
    }

    #[test]
    fn empty_hash_normalizes_to_default_route() {
        let (mut router, mut store) = hydrated();
        let outcome = router.on_url_changed("", &mut store);
        assert_eq!(outcome.applied, Some(Route::Create));
        assert_eq!(outcome.url, Some(UrlCommand::Replace("#/".into())));
    }

    #[test]
    fn unknown_hash_goes_to_library_when_saved_exist() {
        let (mut router, mut store) = hydrated();
        store.set_presentation_data(Some(data()));
        store.save_current_presentation("Deck").unwrap();
        store.clear_active_session();

        let outcome = router.on_url_changed("#/nowhere", &mut store);
        assert_eq!(outcome.applied, Some(Route::Library));
        assert_eq!(outcome.url, Some(UrlCommand::Replace("#/library".into())));
        assert_eq!(router.input_tab(), InputTab::Library);
    }

    #[test]
    fn guarded_route_recovers_active_presentation() {
        let (mut router, mut store) = hydrated();
        store.set_presentation_data(Some(data()));
        store.save_current_presentation("Deck").unwrap();
        store.set_presentation_data(None);

        let outcome = router.on_url_changed("#/present", &mut store);
        assert!(outcome.recovered);
        assert_eq!(outcome.applied, Some(Route::Present));
        assert!(outcome.notice.is_none());
        assert_eq!(store.app_state(), AppState::Viewer);
        assert!(store.has_presentation());
    }

    #[test]
    fn guarded_route_without_recovery_redirects_with_notice() {
        let (mut router, mut store) = hydrated();
        let outcome = router.on_url_changed("#/preview", &mut store);
        assert_eq!(outcome.applied, Some(Route::Create));
        assert_eq!(outcome.url, Some(UrlCommand::Replace("#/".into())));
        assert_eq!(outcome.notice.as_deref(), Some(NO_PRESENTATION_NOTICE));
        assert_eq!(store.app_state(), AppState::Input);
    }

    #[test]
    fn programmatic_change_pushes_once() {
        let (mut router, mut store) = hydrated();
        store.set_presentation_data(Some(data()));
        store.set_app_state(AppState::Preview);

        assert_eq!(
            router.on_state_changed(&store),
            Some(UrlCommand::Push("#/preview".into()))
        );
        // Unchanged state does not push again.
        assert!(router.on_state_changed(&store).is_none());
    }

    #[test]
    fn url_echo_of_push_is_suppressed_in_same_tick() {
        let (mut router, mut store) = hydrated();
        store.set_presentation_data(Some(data()));
        store.set_app_state(AppState::Viewer);
        router.on_state_changed(&store);

        let outcome = router.on_url_changed("#/present", &mut store);
        assert_eq!(outcome, RouteOutcome::default());
        assert_eq!(
            router.phase(),
            SyncPhase::Syncing {
                origin: SyncOrigin::FromProgram,
                generation: 1,
            }
        );
    }

    #[test]
    fn state_echo_of_url_sync_is_suppressed_until_end_tick() {
        let (mut router, mut store) = hydrated();
        router.on_url_changed("#/library", &mut store);
        // The store was changed by the URL; a second state change in the
        // same tick must not push.
        router.tab = InputTab::Import;
        assert!(router.on_state_changed(&store).is_none());

        router.end_tick();
        assert_eq!(router.phase(), SyncPhase::Idle);
        assert_eq!(
            router.on_state_changed(&store),
            Some(UrlCommand::Push("#/import".into()))
        );
    }

    #[test]
    fn back_navigation_after_tick_is_applied() {
        let (mut router, mut store) = hydrated();
        store.set_presentation_data(Some(data()));
        store.set_app_state(AppState::Preview);
        router.on_state_changed(&store);
        router.end_tick();

        let outcome = router.on_url_changed("#/", &mut store);
        assert_eq!(outcome.applied, Some(Route::Create));
        assert!(outcome.url.is_none());
        assert_eq!(store.app_state(), AppState::Input);
    }

    #[test]
    fn select_tab_pushes_url() {
        let (mut router, mut store) = hydrated();
        assert_eq!(
            router.select_tab(InputTab::Library, &mut store),
            Some(UrlCommand::Push("#/library".into()))
        );
        assert_eq!(router.input_tab(), InputTab::Library);
    }
}
