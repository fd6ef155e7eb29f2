//! Stream state contract and the sum type the state machine owns

use std::fmt;

use diskinect_core::{Skeleton, UserId};
use diskinect_tracker::{SkeletonSource, UserTracker};

use crate::live::LiveStream;
use crate::player::PlayerStream;
use crate::recorder::RecorderStream;
use crate::repeater::RepeaterStream;

/// Read-only view of the tracker and sensor for one tick
#[derive(Clone, Copy)]
pub struct StreamContext<'a> {
    pub tracker: &'a UserTracker,
    pub source: &'a dyn SkeletonSource,
}

impl<'a> StreamContext<'a> {
    pub fn new(tracker: &'a UserTracker, source: &'a dyn SkeletonSource) -> Self {
        Self { tracker, source }
    }

    /// Current sensor skeleton of the active user, empty if nobody is active
    pub fn live_skeleton(&self) -> Skeleton {
        match self.tracker.active_user_id().into_option() {
            Some(user) => self.source.skeleton(user),
            None => Skeleton::empty(),
        }
    }

    pub fn active_user(&self) -> UserId {
        self.tracker.active_user_id()
    }
}

/// Receives draw calls; the actual renderer lives outside this crate
pub trait StreamRenderer {
    /// Draw a skeleton, highlighting `user` if given
    fn skeleton(&mut self, skeleton: &Skeleton, user: Option<UserId>);

    /// Draw a status line
    fn label(&mut self, text: &str);
}

/// Renderer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl StreamRenderer for NullRenderer {
    fn skeleton(&mut self, _skeleton: &Skeleton, _user: Option<UserId>) {}

    fn label(&mut self, _text: &str) {}
}

/// Lifecycle every stream state implements
pub trait UserStream {
    /// Allocate or reset per-session resources
    fn enter(&mut self);

    /// Advance one tick
    fn update(&mut self, ctx: &StreamContext<'_>);

    /// Emit visualization
    fn draw(&self, ctx: &StreamContext<'_>, renderer: &mut dyn StreamRenderer);

    /// Release per-session resources
    fn exit(&mut self);

    /// The skeleton representing "now" in this mode
    fn skeleton(&self, ctx: &StreamContext<'_>) -> Skeleton;

    /// True once this mode considers itself finished
    fn wants_to_exit(&self) -> bool;
}

/// Discriminant of [`StreamState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Live,
    Recorder,
    Player,
    Repeater,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Live => "live",
            StreamKind::Recorder => "recorder",
            StreamKind::Player => "player",
            StreamKind::Repeater => "repeater",
        };
        f.write_str(name)
    }
}

/// The one stream the state machine currently owns
pub enum StreamState {
    Live(LiveStream),
    Recorder(RecorderStream),
    Player(PlayerStream),
    Repeater(RepeaterStream),
}

impl StreamState {
    pub fn kind(&self) -> StreamKind {
        match self {
            StreamState::Live(_) => StreamKind::Live,
            StreamState::Recorder(_) => StreamKind::Recorder,
            StreamState::Player(_) => StreamKind::Player,
            StreamState::Repeater(_) => StreamKind::Repeater,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, StreamState::Live(_))
    }

    pub fn as_player(&self) -> Option<&PlayerStream> {
        match self {
            StreamState::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerStream> {
        match self {
            StreamState::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_recorder(&self) -> Option<&RecorderStream> {
        match self {
            StreamState::Recorder(recorder) => Some(recorder),
            _ => None,
        }
    }

    pub fn as_recorder_mut(&mut self) -> Option<&mut RecorderStream> {
        match self {
            StreamState::Recorder(recorder) => Some(recorder),
            _ => None,
        }
    }

    pub fn as_repeater(&self) -> Option<&RepeaterStream> {
        match self {
            StreamState::Repeater(repeater) => Some(repeater),
            _ => None,
        }
    }

    fn stream(&self) -> &dyn UserStream {
        match self {
            StreamState::Live(s) => s,
            StreamState::Recorder(s) => s,
            StreamState::Player(s) => s,
            StreamState::Repeater(s) => s,
        }
    }

    fn stream_mut(&mut self) -> &mut dyn UserStream {
        match self {
            StreamState::Live(s) => s,
            StreamState::Recorder(s) => s,
            StreamState::Player(s) => s,
            StreamState::Repeater(s) => s,
        }
    }
}

impl UserStream for StreamState {
    fn enter(&mut self) {
        self.stream_mut().enter()
    }

    fn update(&mut self, ctx: &StreamContext<'_>) {
        self.stream_mut().update(ctx)
    }

    fn draw(&self, ctx: &StreamContext<'_>, renderer: &mut dyn StreamRenderer) {
        self.stream().draw(ctx, renderer)
    }

    fn exit(&mut self) {
        self.stream_mut().exit()
    }

    fn skeleton(&self, ctx: &StreamContext<'_>) -> Skeleton {
        self.stream().skeleton(ctx)
    }

    fn wants_to_exit(&self) -> bool {
        self.stream().wants_to_exit()
    }
}

impl From<LiveStream> for StreamState {
    fn from(stream: LiveStream) -> Self {
        StreamState::Live(stream)
    }
}

impl From<RecorderStream> for StreamState {
    fn from(stream: RecorderStream) -> Self {
        StreamState::Recorder(stream)
    }
}

impl From<PlayerStream> for StreamState {
    fn from(stream: PlayerStream) -> Self {
        StreamState::Player(stream)
    }
}

impl From<RepeaterStream> for StreamState {
    fn from(stream: RepeaterStream) -> Self {
        StreamState::Repeater(stream)
    }
}

impl fmt::Debug for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamState({})", self.kind())
    }
}
