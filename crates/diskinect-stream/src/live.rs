//! Live stream - the active user straight from the sensor

use tracing::debug;

use diskinect_core::Skeleton;

use crate::state::{StreamContext, StreamRenderer, UserStream};

/// Passes through the active user's skeleton and counts idle ticks
#[derive(Debug, Clone)]
pub struct LiveStream {
    /// Ticks without an active user before asking to be replaced (0 = never)
    idle_limit: u32,
    idle_ticks: u32,
}

impl LiveStream {
    pub fn new(idle_limit: u32) -> Self {
        LiveStream {
            idle_limit,
            idle_ticks: 0,
        }
    }

    /// Live stream that never asks to exit
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Consecutive ticks without an active user
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }
}

impl UserStream for LiveStream {
    fn enter(&mut self) {
        self.idle_ticks = 0;
    }

    fn update(&mut self, ctx: &StreamContext<'_>) {
        if ctx.active_user().is_some() {
            self.idle_ticks = 0;
        } else {
            self.idle_ticks = self.idle_ticks.saturating_add(1);
            if self.idle_limit > 0 && self.idle_ticks == self.idle_limit {
                debug!(ticks = self.idle_ticks, "live stream idle");
            }
        }
    }

    fn draw(&self, ctx: &StreamContext<'_>, renderer: &mut dyn StreamRenderer) {
        let user = ctx.active_user().into_option();
        renderer.skeleton(&self.skeleton(ctx), user);
    }

    fn exit(&mut self) {}

    fn skeleton(&self, ctx: &StreamContext<'_>) -> Skeleton {
        ctx.live_skeleton()
    }

    fn wants_to_exit(&self) -> bool {
        self.idle_limit > 0 && self.idle_ticks >= self.idle_limit
    }
}
