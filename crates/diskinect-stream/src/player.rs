//! Player stream - replays a loaded recording
//!
//! The recording must be loaded before `enter()`. Loading is synchronous: a
//! player is never entered with a partially loaded recording. A failed load
//! leaves the player empty, and an empty player yields empty skeletons.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use diskinect_core::{DiskinectError, DiskinectResult, Skeleton};

use crate::frame::Recording;
use crate::state::{StreamContext, StreamRenderer, UserStream};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
}

pub struct PlayerStream {
    recording: Recording,
    /// Where the recording came from, if it was loaded from disk
    source: Option<PathBuf>,
    /// Playhead; may briefly sit at `total_frames`, reads are clamped
    current_frame: u32,
    state: PlaybackState,
    loop_playback: bool,
    entered: bool,
}

impl PlayerStream {
    pub fn new(loop_playback: bool) -> Self {
        PlayerStream {
            recording: Recording::new(),
            source: None,
            current_frame: 0,
            state: PlaybackState::Playing,
            loop_playback,
            entered: false,
        }
    }

    /// Player preloaded with an in-memory recording
    pub fn with_recording(recording: Recording, loop_playback: bool) -> Self {
        let mut player = Self::new(loop_playback);
        player.load_recording(recording);
        player
    }

    /// Load a recording file.
    ///
    /// On failure the error is logged and returned, and the player is left empty.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> DiskinectResult<()> {
        let path = path.as_ref();
        match Recording::load(path) {
            Ok(recording) => {
                info!(
                    path = %path.display(),
                    frames = recording.total_frames(),
                    "recording loaded"
                );
                self.load_recording(recording);
                self.source = Some(path.to_path_buf());
                Ok(())
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load recording");
                self.unload();
                Err(e)
            }
        }
    }

    /// Load from JSON text in the recording format
    pub fn load_json_str(&mut self, json: &str) -> DiskinectResult<()> {
        self.load_parsed(Recording::from_json_str(json))
    }

    /// Load from an already-parsed JSON document
    pub fn load_json_value(&mut self, value: serde_json::Value) -> DiskinectResult<()> {
        self.load_parsed(Recording::from_json_value(value))
    }

    fn load_parsed(&mut self, parsed: DiskinectResult<Recording>) -> DiskinectResult<()> {
        match parsed {
            Ok(recording) => {
                self.load_recording(recording);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to parse recording");
                self.unload();
                Err(e)
            }
        }
    }

    /// Replace the recording and rewind
    pub fn load_recording(&mut self, recording: Recording) {
        self.recording = recording;
        self.source = None;
        self.current_frame = 0;
    }

    fn unload(&mut self) {
        self.recording.clear();
        self.source = None;
        self.current_frame = 0;
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        !self.recording.is_empty()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn total_frames(&self) -> u32 {
        self.recording.total_frames()
    }

    pub fn is_looping(&self) -> bool {
        self.loop_playback
    }

    pub fn set_looping(&mut self, loop_playback: bool) {
        self.loop_playback = loop_playback;
    }

    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        self.state = PlaybackState::Paused;
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.play(),
        }
    }

    /// Rewind to frame 0 and play
    pub fn restart(&mut self) {
        self.current_frame = 0;
        self.state = PlaybackState::Playing;
    }

    /// Non-looping player that has reached the end
    pub fn is_finished(&self) -> bool {
        !self.loop_playback && self.is_loaded() && self.current_frame >= self.total_frames()
    }

    pub fn status_line(&self) -> String {
        format!(
            "Frame: {} of {}",
            self.current_frame.min(self.total_frames()),
            self.total_frames()
        )
    }

    /// Require a loaded recording before the player can run
    pub fn ensure_loaded(&self) -> DiskinectResult<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(DiskinectError::RecordingNotLoaded)
        }
    }
}

impl UserStream for PlayerStream {
    fn enter(&mut self) {
        if let Err(e) = self.ensure_loaded() {
            warn!(error = %e, "player entered without a recording");
            self.entered = false;
            return;
        }
        self.current_frame = 0;
        self.state = PlaybackState::Playing;
        self.entered = true;
        debug!(frames = self.total_frames(), "player entered");
    }

    fn update(&mut self, _ctx: &StreamContext<'_>) {
        if !self.entered {
            return;
        }
        if self.state == PlaybackState::Playing {
            self.current_frame = self.current_frame.saturating_add(1);
        }
        let total = self.total_frames();
        if self.current_frame > total {
            self.current_frame = if self.loop_playback { 0 } else { total };
        }
    }

    fn draw(&self, ctx: &StreamContext<'_>, renderer: &mut dyn StreamRenderer) {
        renderer.skeleton(&self.skeleton(ctx), None);
        renderer.label(&self.status_line());
    }

    fn exit(&mut self) {
        self.entered = false;
    }

    fn skeleton(&self, _ctx: &StreamContext<'_>) -> Skeleton {
        self.recording.skeleton_clamped(self.current_frame)
    }

    /// Finished, or nothing to play
    fn wants_to_exit(&self) -> bool {
        !self.is_loaded() || self.is_finished()
    }
}
