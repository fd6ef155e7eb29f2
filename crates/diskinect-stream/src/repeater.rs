//! Repeater stream - captures a burst of live motion and echoes it back
//!
//! Nothing is written to disk. The cycle is:
//!
//! - `Armed`: sum the active user's per-tick motion; reset when nobody is active.
//!   Once the sum reaches `min_cumulative_delta`, start capturing.
//! - `Capturing`: append the live skeleton every tick. At `max_frames`, or when
//!   the user goes inactive with at least `min_frames` captured, start echoing.
//!   A shorter capture is discarded.
//! - `Echoing`: play the capture once, then re-arm.

use std::fmt;

use tracing::{debug, info};

use diskinect_core::{RepeaterConfig, Skeleton};

use crate::frame::Recording;
use crate::live::LiveStream;
use crate::state::{StreamContext, StreamRenderer, UserStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeaterPhase {
    Armed,
    Capturing,
    Echoing,
}

impl fmt::Display for RepeaterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepeaterPhase::Armed => "ARMED",
            RepeaterPhase::Capturing => "CAPTURING",
            RepeaterPhase::Echoing => "ECHOING",
        };
        f.write_str(name)
    }
}

pub struct RepeaterStream {
    config: RepeaterConfig,
    live: LiveStream,
    phase: RepeaterPhase,
    cumulative_delta: f32,
    capture: Recording,
    /// Last completed capture; what `Echoing` plays
    echo: Recording,
    playhead: u32,
    echoes_played: u32,
}

impl RepeaterStream {
    pub fn new(config: RepeaterConfig) -> Self {
        RepeaterStream {
            config,
            live: LiveStream::unbounded(),
            phase: RepeaterPhase::Armed,
            cumulative_delta: 0.0,
            capture: Recording::new(),
            echo: Recording::new(),
            playhead: 0,
            echoes_played: 0,
        }
    }

    pub fn config(&self) -> &RepeaterConfig {
        &self.config
    }

    pub fn phase(&self) -> RepeaterPhase {
        self.phase
    }

    pub fn cumulative_delta(&self) -> f32 {
        self.cumulative_delta
    }

    /// Frames captured so far in the current capture
    pub fn captured_frames(&self) -> u32 {
        self.capture.total_frames()
    }

    pub fn last_capture(&self) -> &Recording {
        &self.echo
    }

    /// Number of echoes played to completion
    pub fn echoes_played(&self) -> u32 {
        self.echoes_played
    }

    fn arm(&mut self) {
        self.phase = RepeaterPhase::Armed;
        self.cumulative_delta = 0.0;
        self.capture.clear();
        self.playhead = 0;
    }

    fn start_capture(&mut self) {
        debug!(delta = self.cumulative_delta, "repeater capturing");
        self.phase = RepeaterPhase::Capturing;
        self.capture.clear();
    }

    fn start_echo(&mut self) {
        info!(frames = self.capture.total_frames(), "repeater echoing");
        self.echo = std::mem::take(&mut self.capture);
        self.playhead = 0;
        self.phase = RepeaterPhase::Echoing;
    }

    fn status_line(&self) -> String {
        match self.phase {
            RepeaterPhase::Armed => format!(
                "ARMED {:.1} / {:.1}",
                self.cumulative_delta, self.config.min_cumulative_delta
            ),
            RepeaterPhase::Capturing => format!(
                "CAPTURING {} / {}",
                self.capture.total_frames(),
                self.config.max_frames
            ),
            RepeaterPhase::Echoing => format!(
                "ECHOING {} / {}",
                self.playhead.min(self.echo.total_frames()),
                self.echo.total_frames()
            ),
        }
    }
}

impl UserStream for RepeaterStream {
    fn enter(&mut self) {
        self.live.enter();
        self.arm();
    }

    fn update(&mut self, ctx: &StreamContext<'_>) {
        self.live.update(ctx);
        let active = ctx.tracker.active_user();

        match self.phase {
            RepeaterPhase::Armed => match active {
                Some(user) => {
                    self.cumulative_delta += user.last_motion;
                    if self.cumulative_delta >= self.config.min_cumulative_delta {
                        self.start_capture();
                        self.capture.push(ctx.live_skeleton());
                    }
                }
                None => self.cumulative_delta = 0.0,
            },
            RepeaterPhase::Capturing => {
                if active.is_some() {
                    self.capture.push(ctx.live_skeleton());
                    if self.capture.total_frames() >= self.config.max_frames {
                        self.start_echo();
                    }
                } else if self.capture.total_frames() >= self.config.min_frames {
                    self.start_echo();
                } else {
                    debug!(
                        frames = self.capture.total_frames(),
                        "capture too short, discarding"
                    );
                    self.arm();
                }
            }
            RepeaterPhase::Echoing => {
                self.playhead += 1;
                if self.playhead >= self.echo.total_frames() {
                    self.echoes_played += 1;
                    self.arm();
                }
            }
        }
    }

    fn draw(&self, ctx: &StreamContext<'_>, renderer: &mut dyn StreamRenderer) {
        let user = match self.phase {
            RepeaterPhase::Echoing => None,
            _ => ctx.active_user().into_option(),
        };
        renderer.skeleton(&self.skeleton(ctx), user);
        renderer.label(&self.status_line());
    }

    fn exit(&mut self) {
        self.capture.clear();
        self.phase = RepeaterPhase::Armed;
        self.live.exit();
    }

    fn skeleton(&self, ctx: &StreamContext<'_>) -> Skeleton {
        match self.phase {
            RepeaterPhase::Echoing => self.echo.skeleton_clamped(self.playhead),
            _ => self.live.skeleton(ctx),
        }
    }

    fn wants_to_exit(&self) -> bool {
        false
    }
}

impl fmt::Debug for RepeaterStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterStream")
            .field("phase", &self.phase)
            .field("cumulative_delta", &self.cumulative_delta)
            .field("captured", &self.capture.total_frames())
            .field("echo", &self.echo.total_frames())
            .finish()
    }
}
