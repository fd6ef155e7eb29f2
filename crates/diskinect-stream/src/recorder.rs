//! Recorder stream - captures the live skeleton into a recording file
//!
//! What is displayed is always the live skeleton; recording only copies it.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use diskinect_core::{DiskinectError, DiskinectResult, Skeleton, StreamConfig};

use crate::frame::Recording;
use crate::live::LiveStream;
use crate::state::{StreamContext, StreamRenderer, UserStream};

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    NotRecording,
    Recording,
}

pub struct RecorderStream {
    live: LiveStream,
    state: RecorderState,
    /// Frames captured since `start_recording`
    recording: Recording,
    /// Tick count within the current capture
    frame_number: u32,
    output_dir: PathBuf,
    prefix: String,
    /// Path of the last successful save
    last_saved: Option<PathBuf>,
}

impl RecorderStream {
    pub fn new(config: &StreamConfig) -> Self {
        RecorderStream {
            live: LiveStream::unbounded(),
            state: RecorderState::NotRecording,
            recording: Recording::new(),
            frame_number: 0,
            output_dir: config.recording_dir.clone(),
            prefix: config.recording_prefix.clone(),
            last_saved: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    /// The capture in progress, or the last finished one
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// The finished capture, once recording has stopped
    pub fn last_recording(&self) -> Option<&Recording> {
        match self.state {
            RecorderState::NotRecording if !self.recording.is_empty() => Some(&self.recording),
            _ => None,
        }
    }

    pub fn last_saved(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }

    /// Reset the frame counter, drop any previous capture and start recording
    pub fn start_recording(&mut self) {
        self.recording.clear();
        self.frame_number = 0;
        self.state = RecorderState::Recording;
        info!("recording started");
    }

    /// Stop recording and write the capture to disk.
    ///
    /// A failed write is logged and returned; the capture stays in memory.
    /// Stopping while not recording writes nothing.
    pub fn stop_recording(&mut self) -> DiskinectResult<PathBuf> {
        if self.state == RecorderState::NotRecording {
            warn!("stop_recording called while not recording");
            return Err(DiskinectError::NotRecording);
        }
        self.state = RecorderState::NotRecording;

        let path = self.next_path();
        match self.recording.save(&path) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    frames = self.recording.total_frames(),
                    "recording saved"
                );
                self.last_saved = Some(path.clone());
                Ok(path)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to save recording");
                Err(e)
            }
        }
    }

    /// Start if idle, stop (and save) if recording
    pub fn toggle_recording(&mut self) {
        match self.state {
            RecorderState::NotRecording => self.start_recording(),
            RecorderState::Recording => {
                let _ = self.stop_recording();
            }
        }
    }

    fn record_frame(&mut self, skeleton: Skeleton) {
        let frame_number = self.recording.push(skeleton);
        debug_assert_eq!(frame_number, self.frame_number);
        self.frame_number += 1;
    }

    /// `<prefix>_<millis>.json`, with a counter when that name is taken
    fn next_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let mut path = self
            .output_dir
            .join(format!("{}_{}.json", self.prefix, millis));
        let mut n = 1u32;
        while path.exists() {
            path = self
                .output_dir
                .join(format!("{}_{}_{}.json", self.prefix, millis, n));
            n += 1;
        }
        path
    }

    fn status_line(&self) -> String {
        match self.state {
            RecorderState::NotRecording => "NOT RECORDING".to_string(),
            RecorderState::Recording => format!("RECORDING frame {}", self.frame_number),
        }
    }
}

impl UserStream for RecorderStream {
    fn enter(&mut self) {
        self.live.enter();
        self.state = RecorderState::NotRecording;
        self.frame_number = 0;
    }

    fn update(&mut self, ctx: &StreamContext<'_>) {
        self.live.update(ctx);
        if self.state == RecorderState::Recording {
            self.record_frame(self.live.skeleton(ctx));
        }
    }

    fn draw(&self, ctx: &StreamContext<'_>, renderer: &mut dyn StreamRenderer) {
        self.live.draw(ctx, renderer);
        renderer.label(&self.status_line());
    }

    fn exit(&mut self) {
        if self.is_recording() {
            warn!("recorder exited mid-capture, saving what was recorded");
            let _ = self.stop_recording();
        }
        self.live.exit();
    }

    fn skeleton(&self, ctx: &StreamContext<'_>) -> Skeleton {
        self.live.skeleton(ctx)
    }

    fn wants_to_exit(&self) -> bool {
        false
    }
}
