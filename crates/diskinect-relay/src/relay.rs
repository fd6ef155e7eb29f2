//! Relay - the installation's per-tick loop

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use diskinect_core::{DiskinectError, DiskinectResult, RelayConfig, Skeleton, UserId};
use diskinect_stream::{
    LiveStream, PlayerStream, RecorderStream, RepeaterStream, StreamContext, StreamKind,
    StreamRenderer, StreamState, StreamStateManager,
};
use diskinect_tracker::{ActiveUserChange, SkeletonSource, UserTracker};

use crate::gestures::GesturePool;
use crate::puppeteer::Puppeteer;

/// Debug/control surface commands
#[derive(Debug, Clone, PartialEq)]
pub enum RelayCommand {
    SetLive,
    SetRecording,
    SetPlayback,
    SetRepeater,
    /// Record/stop on a recorder, play/pause on a player
    ToggleRecordingPause,
    /// A recording file was dropped on the installation
    FileDropped(PathBuf),
    SetActivationRadius(f32),
    /// Move the activation zone along the sensor axis
    SetActivationDepth(f32),
}

#[derive(Clone, Debug, Default)]
pub struct RelayStats {
    pub ticks: u64,
    pub active_user_changes: u64,
    /// Live -> Player substitutions triggered by the idle timer
    pub idle_playbacks: u64,
    /// Automatic returns to Live
    pub returns_to_live: u64,
    pub actuator_messages: u64,
    pub last_tick_duration: Duration,
}

pub struct Relay {
    config: RelayConfig,
    source: Arc<dyn SkeletonSource>,
    tracker: UserTracker,
    fsm: StreamStateManager,
    gestures: GesturePool,
    rng: StdRng,
    puppeteer: Option<Puppeteer>,
    /// Set once idle playback has been attempted; cleared by an active user
    idle_episode: bool,
    elapsed_secs: f64,
    stats: RelayStats,
}

impl Relay {
    /// Validate `config`, subscribe to `source` and start in Live
    pub fn new(config: RelayConfig, source: Arc<dyn SkeletonSource>) -> DiskinectResult<Self> {
        config.validate()?;

        let tracker = UserTracker::new(config.tracker.clone(), source.as_ref());
        let gestures = GesturePool::from_weights(&config.gestures, &config.gesture_dir);
        if gestures.is_empty() && config.use_idle_timer {
            warn!("idle timer enabled but no gestures configured");
        }

        let mut relay = Relay {
            config,
            source,
            tracker,
            fsm: StreamStateManager::new(),
            gestures,
            rng: StdRng::from_entropy(),
            puppeteer: None,
            idle_episode: false,
            elapsed_secs: 0.0,
            stats: RelayStats::default(),
        };
        let live = relay.live_stream();
        relay.fsm.set_initial_state(live)?;
        info!(gestures = relay.gestures.len(), "relay started");
        Ok(relay)
    }

    /// Reproducible gesture selection
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_puppeteer(mut self, puppeteer: Puppeteer) -> Self {
        self.puppeteer = Some(puppeteer);
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn tracker(&self) -> &UserTracker {
        &self.tracker
    }

    pub fn state_machine(&self) -> &StreamStateManager {
        &self.fsm
    }

    pub fn current_kind(&self) -> Option<StreamKind> {
        self.fsm.current_kind()
    }

    pub fn current_state(&self) -> Option<&StreamState> {
        self.fsm.current()
    }

    pub fn active_user_id(&self) -> UserId {
        self.tracker.active_user_id()
    }

    pub fn puppeteer(&self) -> Option<&Puppeteer> {
        self.puppeteer.as_ref()
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    /// Whether idle playback already ran since the last active user
    pub fn in_idle_episode(&self) -> bool {
        self.idle_episode
    }

    /// One tick at the configured rate
    pub fn tick(&mut self) {
        let dt = 1.0 / f64::from(self.config.tick_rate_hz.max(1));
        self.update(dt);
    }

    /// One tick, `dt_secs` after the previous one
    pub fn update(&mut self, dt_secs: f64) {
        let start = Instant::now();
        self.elapsed_secs += dt_secs.max(0.0);

        if let Some(ActiveUserChange { previous, current }) = self.tracker.update(self.source.as_ref())
        {
            debug!(%previous, %current, "active user changed");
            self.stats.active_user_changes += 1;
        }
        if self.tracker.active_user_id().is_some() {
            self.idle_episode = false;
        }

        let ctx = StreamContext::new(&self.tracker, self.source.as_ref());
        self.fsm.update(&ctx);

        if self.config.use_idle_timer {
            self.apply_idle_policy();
        }

        if let Some(puppeteer) = self.puppeteer.as_mut() {
            let ctx = StreamContext::new(&self.tracker, self.source.as_ref());
            let skeleton = self.fsm.skeleton(&ctx);
            if puppeteer.update(&skeleton, self.elapsed_secs).is_some() {
                self.stats.actuator_messages += 1;
            }
        }

        self.stats.ticks += 1;
        self.stats.last_tick_duration = start.elapsed();
    }

    /// Skeleton of the current stream state
    pub fn skeleton(&self) -> Skeleton {
        let ctx = StreamContext::new(&self.tracker, self.source.as_ref());
        self.fsm.skeleton(&ctx)
    }

    pub fn draw(&self, renderer: &mut dyn StreamRenderer) {
        let ctx = StreamContext::new(&self.tracker, self.source.as_ref());
        self.fsm.draw(&ctx, renderer);
    }

    fn apply_idle_policy(&mut self) {
        let Some(kind) = self.fsm.current_kind() else {
            return;
        };

        let user_active = self.tracker.active_user_id().is_some();

        if kind == StreamKind::Live {
            // One attempt per idle episode, successful or not
            if self.fsm.wants_to_exit() && !self.idle_episode {
                self.idle_episode = true;
                info!("no active user, starting idle playback");
                match self.start_gesture_playback() {
                    Ok(()) => self.stats.idle_playbacks += 1,
                    Err(e) => warn!(error = %e, "idle playback unavailable, staying live"),
                }
            }
        } else if user_active || (self.fsm.wants_to_exit() && !self.idle_episode) {
            // A finished idle gesture holds its last frame until someone shows up
            info!(from = %kind, "returning to live");
            self.stats.returns_to_live += 1;
            self.switch_to(self.live_stream());
        }
    }

    /// Switch to a player with a weighted-random gesture.
    ///
    /// The current state is kept when no gesture is configured or the file
    /// fails to load.
    fn start_gesture_playback(&mut self) -> DiskinectResult<()> {
        let path = self
            .gestures
            .pick(&mut self.rng)
            .map(|p| p.to_path_buf())
            .ok_or(DiskinectError::RecordingNotLoaded)?;
        let mut player = PlayerStream::new(self.config.stream.loop_playback);
        player.load_file(&path)?;
        player.ensure_loaded()?;
        self.switch_to(player);
        Ok(())
    }

    fn live_stream(&self) -> LiveStream {
        LiveStream::new(self.config.stream.idle_ticks_before_playback)
    }

    fn switch_to(&mut self, state: impl Into<StreamState>) {
        if let Err(e) = self.fsm.change_state(state) {
            warn!(error = %e, "state change failed");
        }
    }

    /// Apply a debug/control command.
    ///
    /// A file drop or gesture playback that cannot load returns an error and
    /// keeps the current state.
    pub fn handle_command(&mut self, command: RelayCommand) -> DiskinectResult<()> {
        debug!(?command, "relay command");
        match command {
            RelayCommand::SetLive => self.switch_to(self.live_stream()),
            RelayCommand::SetRecording => {
                let recorder = RecorderStream::new(&self.config.stream);
                self.switch_to(recorder);
            }
            RelayCommand::SetPlayback => self.start_gesture_playback()?,
            RelayCommand::SetRepeater => {
                let repeater = RepeaterStream::new(self.config.repeater.clone());
                self.switch_to(repeater);
            }
            RelayCommand::ToggleRecordingPause => match self.fsm.current_mut() {
                Some(StreamState::Recorder(recorder)) => recorder.toggle_recording(),
                Some(StreamState::Player(player)) => player.toggle_pause(),
                Some(other) => warn!(state = %other.kind(), "nothing to toggle"),
                None => warn!("nothing to toggle"),
            },
            RelayCommand::FileDropped(path) => {
                let mut player = PlayerStream::new(self.config.stream.loop_playback);
                player.load_file(&path)?;
                self.switch_to(player);
            }
            RelayCommand::SetActivationRadius(radius) => {
                self.tracker.set_activation_radius(radius);
                info!(radius = self.tracker.activation_radius(), "activation radius");
            }
            RelayCommand::SetActivationDepth(depth) => {
                let mut zone = self.tracker.config().activation_zone;
                zone.z = depth;
                self.tracker.set_activation_zone(zone);
                info!(depth, "activation depth");
            }
        }
        Ok(())
    }
}
