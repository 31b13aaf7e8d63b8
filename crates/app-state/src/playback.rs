//! Viewer transport: current slide, play/pause, mute, script panel.

use serde::{Deserialize, Serialize};

/// Viewer-side playback fields. Slide 0 is the title slide.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub current_slide: usize,
    pub is_playing: bool,
    pub is_muted: bool,
    pub script_panel_open: bool,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&mut self) {
        self.is_playing = true;
        tracing::debug!(slide = self.current_slide, "Playback started");
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
        tracing::debug!(slide = self.current_slide, "Playback paused");
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `index` if it is inside `0..total`. Returns whether the slide changed.
    pub fn go_to(&mut self, index: usize, total: usize) -> bool {
        if index >= total || index == self.current_slide {
            return false;
        }
        self.current_slide = index;
        tracing::debug!(slide = index, total, "Slide changed");
        true
    }

    /// Advance one slide. Returns `false` on the last slide.
    pub fn next(&mut self, total: usize) -> bool {
        self.go_to(self.current_slide + 1, total)
    }

    /// Step back one slide. Returns `false` on the title slide.
    pub fn previous(&mut self) -> bool {
        match self.current_slide.checked_sub(1) {
            Some(index) => {
                self.current_slide = index;
                tracing::debug!(slide = index, "Slide changed");
                true
            }
            None => false,
        }
    }

    pub fn is_last(&self, total: usize) -> bool {
        self.current_slide + 1 >= total
    }

    pub fn toggle_mute(&mut self) {
        self.is_muted = !self.is_muted;
        tracing::debug!(muted = self.is_muted, "Mute toggled");
    }

    pub fn toggle_script_panel(&mut self) {
        self.script_panel_open = !self.script_panel_open;
    }

    /// Back to the title slide, paused. Mute and panel preferences survive.
    pub fn rewind(&mut self) {
        self.current_slide = 0;
        self.is_playing = false;
    }
}
