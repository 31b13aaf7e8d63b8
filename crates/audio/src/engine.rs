//! Single-resource narration playback.
//!
//! The engine owns one [`PlaybackResource`] for the lifetime of the viewer
//! and is fed from two independent channels:
//!
//! - [`AudioEngine::update_transport`] is keyed on the (playing, slide, audio
//!   map) triad and is the only path that starts, restarts, or pauses audio.
//! - [`AudioEngine::update_live`] applies volume, speed, and mute to whatever
//!   is currently loaded, without touching play state or position.
//!
//! The auto-advance timer does not own a thread. `on_ended` arms a deadline
//! and the host polls it with [`AudioEngine::poll`].

use std::time::{Duration, Instant};

use narrator_common::AudioUrls;

use crate::error::{AudioError, AudioResult};

/// A playable audio element.
pub trait PlaybackResource {
    /// Currently loaded audio reference, if any.
    fn source(&self) -> Option<&str>;

    /// Load a new reference. Position resets to the start.
    fn set_source(&mut self, url: &str);

    fn seek_to_start(&mut self);

    fn set_playback_rate(&mut self, rate: f32);

    fn set_muted(&mut self, muted: bool);

    /// Output gain in [0, 1], already shaped by [`effective_volume`].
    fn set_volume(&mut self, volume: f32);

    /// Start playback of the loaded source.
    fn play(&mut self) -> AudioResult<()>;

    fn pause(&mut self);

    /// Fraction of the loaded source that has played, in [0, 1].
    fn progress(&self) -> f32;

    /// Drop the loaded source entirely.
    fn detach(&mut self);
}

/// Resource for hosts without an output device. Tracks state, emits nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SilentResource {
    source: Option<String>,
    playing: bool,
    progress: f32,
    rate: f32,
    muted: bool,
    volume: f32,
}

impl SilentResource {
    pub fn new() -> Self {
        Self {
            rate: 1.0,
            volume: 1.0,
            ..Self::default()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Move the simulated playhead, e.g. from a host clock.
    pub fn set_progress(&mut self, progress: f32) {
        self.progress = progress.clamp(0.0, 1.0);
    }
}

impl PlaybackResource for SilentResource {
    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.progress = 0.0;
    }

    fn seek_to_start(&mut self) {
        self.progress = 0.0;
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn play(&mut self) -> AudioResult<()> {
        if self.source.is_none() {
            return Err(AudioError::Source("no source loaded".to_string()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn progress(&self) -> f32 {
        self.progress
    }

    fn detach(&mut self) {
        self.source = None;
        self.playing = false;
        self.progress = 0.0;
    }
}

/// Map a linear slider value to output gain.
pub fn effective_volume(value: f32) -> f32 {
    (value * value).max(0.0)
}

/// Transport key. A change to any field re-evaluates playback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportState {
    pub is_playing: bool,
    pub current_slide: usize,
    pub audio_urls: AudioUrls,
}

/// Parameters applied live to the loaded source.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LiveParams {
    /// Linear slider value in [0, 1].
    pub volume: f32,
    pub speed: f32,
    pub muted: bool,
}

impl Default for LiveParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            speed: 1.0,
            muted: false,
        }
    }
}

/// What the host must do to the session after narration ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackTransition {
    /// Leave the viewer playing state.
    Stop,
    /// Move to the given slide (playback continues).
    AdvanceTo(usize),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct PendingAdvance {
    target: usize,
    due: Instant,
}

pub struct AudioEngine<R: PlaybackResource> {
    resource: R,
    transport: Option<TransportState>,
    live: LiveParams,
    pending: Option<PendingAdvance>,
    advance_delay: Duration,
}

impl<R: PlaybackResource> AudioEngine<R> {
    pub fn new(resource: R, advance_delay: Duration) -> Self {
        Self {
            resource,
            transport: None,
            live: LiveParams::default(),
            pending: None,
            advance_delay,
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    pub fn live(&self) -> LiveParams {
        self.live
    }

    /// Target slide of the armed auto-advance, if any.
    pub fn pending_advance(&self) -> Option<usize> {
        self.pending.map(|p| p.target)
    }

    pub fn progress(&self) -> f32 {
        self.resource.progress()
    }

    /// Re-evaluate playback for a new transport key. Unchanged keys are
    /// ignored. A superseded start is swallowed; other start failures are
    /// logged and returned.
    pub fn update_transport(&mut self, next: TransportState) -> AudioResult<()> {
        if self.transport.as_ref() == Some(&next) {
            return Ok(());
        }
        let slide_changed = self
            .transport
            .as_ref()
            .is_some_and(|prev| prev.current_slide != next.current_slide);
        if slide_changed || !next.is_playing {
            self.cancel_advance();
        }

        let url = next.audio_urls.get(&next.current_slide).cloned();
        let slide = next.current_slide;
        let playing = next.is_playing;
        self.transport = Some(next);

        let Some(url) = url.filter(|_| playing) else {
            self.resource.pause();
            tracing::debug!(slide, playing, "Transport paused");
            return Ok(());
        };

        if self.resource.source() == Some(url.as_str()) {
            self.resource.seek_to_start();
        } else {
            self.resource.set_source(&url);
        }
        self.apply_live();

        match self.resource.play() {
            Ok(()) => {
                tracing::debug!(slide, "Narration playing");
                Ok(())
            }
            Err(e) if e.is_superseded() => {
                tracing::debug!(slide, "Playback start superseded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(slide, error = %e, "Narration failed to start");
                Err(e)
            }
        }
    }

    /// Apply volume, speed, and mute without touching play state or position.
    pub fn update_live(&mut self, live: LiveParams) {
        if live == self.live {
            return;
        }
        self.live = live;
        self.apply_live();
        tracing::debug!(
            volume = live.volume,
            speed = live.speed,
            muted = live.muted,
            "Live parameters applied"
        );
    }

    fn apply_live(&mut self) {
        self.resource.set_volume(effective_volume(self.live.volume));
        self.resource.set_playback_rate(self.live.speed);
        self.resource.set_muted(self.live.muted);
    }

    /// The loaded narration finished. Either arms the auto-advance timer
    /// (returns `None`) or asks the host to stop.
    pub fn on_ended(
        &mut self,
        now: Instant,
        current_slide: usize,
        total_slides: usize,
        auto_advance: bool,
    ) -> Option<PlaybackTransition> {
        let is_last = current_slide + 1 >= total_slides;
        if auto_advance && !is_last {
            let target = current_slide + 1;
            self.pending = Some(PendingAdvance {
                target,
                due: now + self.advance_delay,
            });
            tracing::debug!(
                next_slide = target,
                delay_ms = self.advance_delay.as_millis() as u64,
                "Auto-advance armed"
            );
            None
        } else {
            tracing::debug!(current_slide, "Narration ended, stopping");
            Some(PlaybackTransition::Stop)
        }
    }

    /// Fire the auto-advance if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<PlaybackTransition> {
        let pending = self.pending?;
        if now < pending.due {
            return None;
        }
        self.pending = None;
        tracing::debug!(next_slide = pending.target, "Auto-advance fired");
        Some(PlaybackTransition::AdvanceTo(pending.target))
    }

    /// A user-initiated slide change: any armed auto-advance is dropped.
    pub fn notify_manual_navigation(&mut self) {
        self.cancel_advance();
    }

    fn cancel_advance(&mut self) {
        if let Some(p) = self.pending.take() {
            tracing::debug!(next_slide = p.target, "Auto-advance cancelled");
        }
    }

    /// Pause and rewind the loaded source.
    pub fn stop(&mut self) {
        self.cancel_advance();
        self.resource.pause();
        self.resource.seek_to_start();
        if let Some(t) = self.transport.as_mut() {
            t.is_playing = false;
        }
    }

    /// Release the source at the end of the viewer lifetime. The engine can
    /// be driven again afterwards; the next transport update reloads.
    pub fn dispose(&mut self) {
        self.cancel_advance();
        self.resource.pause();
        self.resource.detach();
        self.transport = None;
        tracing::debug!("Audio engine disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        SetSource(String),
        Seek,
        Rate(f32),
        Muted(bool),
        Volume(f32),
        Play,
        Pause,
        Detach,
    }

    #[derive(Default)]
    struct RecordingResource {
        source: Option<String>,
        calls: Vec<Call>,
        fail_with: Option<AudioError>,
    }

    impl RecordingResource {
        fn take_calls(&mut self) -> Vec<Call> {
            std::mem::take(&mut self.calls)
        }
    }

    impl PlaybackResource for RecordingResource {
        fn source(&self) -> Option<&str> {
            self.source.as_deref()
        }
        fn set_source(&mut self, url: &str) {
            self.source = Some(url.to_string());
            self.calls.push(Call::SetSource(url.to_string()));
        }
        fn seek_to_start(&mut self) {
            self.calls.push(Call::Seek);
        }
        fn set_playback_rate(&mut self, rate: f32) {
            self.calls.push(Call::Rate(rate));
        }
        fn set_muted(&mut self, muted: bool) {
            self.calls.push(Call::Muted(muted));
        }
        fn set_volume(&mut self, volume: f32) {
            self.calls.push(Call::Volume(volume));
        }
        fn play(&mut self) -> AudioResult<()> {
            self.calls.push(Call::Play);
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
        fn pause(&mut self) {
            self.calls.push(Call::Pause);
        }
        fn progress(&self) -> f32 {
            0.0
        }
        fn detach(&mut self) {
            self.source = None;
            self.calls.push(Call::Detach);
        }
    }

    fn urls(n: usize) -> AudioUrls {
        (0..n).map(|i| (i, format!("audio:{i}"))).collect()
    }

    fn transport(playing: bool, slide: usize) -> TransportState {
        TransportState {
            is_playing: playing,
            current_slide: slide,
            audio_urls: urls(3),
        }
    }

    fn engine() -> AudioEngine<RecordingResource> {
        AudioEngine::new(RecordingResource::default(), Duration::from_millis(800))
    }

    fn plays(calls: &[Call]) -> usize {
        calls.iter().filter(|c| **c == Call::Play).count()
    }

    #[test]
    fn volume_curve() {
        assert_eq!(effective_volume(0.5), 0.25);
        assert_eq!(effective_volume(1.0), 1.0);
        assert_eq!(effective_volume(0.0), 0.0);
        assert_eq!(effective_volume(f32::NAN), 0.0);
    }

    #[test]
    fn playing_with_url_loads_and_plays() {
        let mut e = engine();
        e.update_transport(transport(true, 1)).unwrap();
        let calls = e.resource_mut().take_calls();
        assert_eq!(calls[0], Call::SetSource("audio:1".into()));
        assert!(calls.contains(&Call::Volume(1.0)));
        assert_eq!(calls.last(), Some(&Call::Play));
    }

    #[test]
    fn unchanged_transport_is_ignored() {
        let mut e = engine();
        e.update_transport(transport(true, 0)).unwrap();
        e.resource_mut().take_calls();
        e.update_transport(transport(true, 0)).unwrap();
        assert!(e.resource_mut().take_calls().is_empty());
    }

    #[test]
    fn same_source_restarts_from_zero() {
        let mut e = engine();
        e.update_transport(transport(true, 0)).unwrap();
        e.update_transport(transport(false, 0)).unwrap();
        e.resource_mut().take_calls();
        e.update_transport(transport(true, 0)).unwrap();
        let calls = e.resource_mut().take_calls();
        assert_eq!(calls[0], Call::Seek);
        assert!(!calls.iter().any(|c| matches!(c, Call::SetSource(_))));
        assert_eq!(plays(&calls), 1);
    }

    #[test]
    fn not_playing_or_missing_url_pauses() {
        let mut e = engine();
        e.update_transport(transport(false, 0)).unwrap();
        assert_eq!(e.resource_mut().take_calls(), vec![Call::Pause]);

        e.update_transport(TransportState {
            is_playing: true,
            current_slide: 0,
            audio_urls: AudioUrls::new(),
        })
        .unwrap();
        assert_eq!(e.resource_mut().take_calls(), vec![Call::Pause]);
    }

    #[test]
    fn superseded_start_is_silent() {
        let mut e = engine();
        e.resource_mut().fail_with = Some(AudioError::Superseded);
        assert!(e.update_transport(transport(true, 0)).is_ok());
    }

    #[test]
    fn other_start_failures_are_returned() {
        let mut e = engine();
        e.resource_mut().fail_with = Some(AudioError::Device("busy".into()));
        assert_eq!(
            e.update_transport(transport(true, 0)),
            Err(AudioError::Device("busy".into()))
        );
    }

    #[test]
    fn live_updates_never_restart_playback() {
        let mut e = engine();
        e.update_transport(transport(true, 0)).unwrap();
        e.resource_mut().take_calls();

        e.update_live(LiveParams {
            volume: 0.5,
            speed: 1.5,
            muted: true,
        });
        let calls = e.resource_mut().take_calls();
        assert_eq!(
            calls,
            vec![Call::Volume(0.25), Call::Rate(1.5), Call::Muted(true)]
        );

        // Identical parameters are not reapplied.
        e.update_live(e.live());
        assert!(e.resource_mut().take_calls().is_empty());
    }

    #[test]
    fn ended_mid_deck_arms_advance() {
        let mut e = engine();
        let t0 = Instant::now();
        assert_eq!(e.on_ended(t0, 0, 3, true), None);
        assert_eq!(e.pending_advance(), Some(1));

        assert_eq!(e.poll(t0 + Duration::from_millis(799)), None);
        assert_eq!(
            e.poll(t0 + Duration::from_millis(800)),
            Some(PlaybackTransition::AdvanceTo(1))
        );
        assert_eq!(e.poll(t0 + Duration::from_secs(5)), None);
    }

    #[test]
    fn ended_on_last_slide_or_without_auto_advance_stops() {
        let mut e = engine();
        let now = Instant::now();
        assert_eq!(e.on_ended(now, 2, 3, true), Some(PlaybackTransition::Stop));
        assert_eq!(e.on_ended(now, 0, 3, false), Some(PlaybackTransition::Stop));
        assert_eq!(e.pending_advance(), None);
    }

    #[test]
    fn manual_navigation_cancels_advance() {
        let mut e = engine();
        let t0 = Instant::now();
        e.on_ended(t0, 0, 3, true);
        e.notify_manual_navigation();
        assert_eq!(e.poll(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn slide_change_on_transport_cancels_advance() {
        let mut e = engine();
        e.update_transport(transport(true, 0)).unwrap();
        let t0 = Instant::now();
        e.on_ended(t0, 0, 3, true);
        e.update_transport(transport(true, 2)).unwrap();
        assert_eq!(e.pending_advance(), None);
    }

    #[test]
    fn pause_cancels_advance() {
        let mut e = engine();
        e.update_transport(transport(true, 0)).unwrap();
        e.on_ended(Instant::now(), 0, 3, true);
        e.update_transport(transport(false, 0)).unwrap();
        assert_eq!(e.pending_advance(), None);
    }

    #[test]
    fn stop_pauses_and_rewinds() {
        let mut e = engine();
        e.update_transport(transport(true, 0)).unwrap();
        e.resource_mut().take_calls();
        e.stop();
        assert_eq!(e.resource_mut().take_calls(), vec![Call::Pause, Call::Seek]);
    }

    #[test]
    fn dispose_detaches_and_allows_reuse() {
        let mut e = engine();
        e.update_transport(transport(true, 0)).unwrap();
        e.dispose();
        let calls = e.resource_mut().take_calls();
        assert!(calls.ends_with(&[Call::Pause, Call::Detach]));

        e.update_transport(transport(true, 0)).unwrap();
        let calls = e.resource_mut().take_calls();
        assert_eq!(calls[0], Call::SetSource("audio:0".into()));
    }

    #[test]
    fn silent_resource_tracks_state() {
        let mut e = AudioEngine::new(SilentResource::new(), Duration::from_millis(800));
        e.update_live(LiveParams {
            volume: 0.6,
            speed: 1.2,
            muted: false,
        });
        e.update_transport(transport(true, 1)).unwrap();
        assert!(e.resource().is_playing());
        assert_eq!(e.resource().source(), Some("audio:1"));
        assert_eq!(e.resource().rate(), 1.2);

        e.resource_mut().set_progress(0.5);
        assert_eq!(e.progress(), 0.5);
        e.dispose();
        assert_eq!(e.resource().source(), None);
    }

    #[test]
    fn silent_resource_without_source_fails_to_play() {
        let mut r = SilentResource::new();
        assert!(matches!(r.play(), Err(AudioError::Source(_))));
    }
}
