//! Scenario harness
//!
//! A scenario steps a [`SimulatedSensor`] and a [`Relay`] in lockstep on the
//! calling thread, so runs are deterministic. Every tick the harness records
//! which stream state was current and who was active, and checks invariants.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use diskinect_core::{DiskinectResult, RelayConfig, StreamConfig, TrackerConfig, UserId, Vec3};
use diskinect_relay::{CapturedLink, Puppeteer, Relay, RelayCommand};
use diskinect_stream::{Recording, StreamKind, StreamState};
use diskinect_tracker::{waving_body_at, ScriptedUser, SensorHub, SimulatedSensor};

/// Scenario parameters
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Ticks to run
    pub ticks: u64,
    /// Live idle ticks before gesture playback
    pub idle_ticks: u32,
    pub use_idle_timer: bool,
    /// Joint dropout probability in the simulated sensor
    pub dropout: f64,
    pub seed: u64,
    pub activation_zone: Vec3,
    pub activation_radius: f32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            ticks: 300,
            idle_ticks: 60,
            use_idle_timer: true,
            dropout: 0.0,
            seed: 7,
            activation_zone: Vec3::new(0.0, 0.0, 2.5),
            activation_radius: 0.5,
        }
    }
}

impl ScenarioConfig {
    /// Short run, clean sensor
    pub fn minimal() -> Self {
        Self {
            ticks: 100,
            idle_ticks: 20,
            ..Self::default()
        }
    }

    pub fn standard() -> Self {
        Self::default()
    }

    /// Long run with a noisy sensor
    pub fn noisy() -> Self {
        Self {
            ticks: 1000,
            dropout: 0.2,
            ..Self::default()
        }
    }
}

/// What happened during a run
#[derive(Debug, Clone, Default)]
pub struct ScenarioResult {
    pub ticks: u64,
    /// Current stream state after each tick
    pub states: Vec<StreamKind>,
    /// Active user after each tick
    pub active_users: Vec<UserId>,
    /// (tick, from, to) for every state change
    pub transitions: Vec<(u64, StreamKind, StreamKind)>,
    pub actuator_messages: Vec<String>,
    pub invariant_violations: Vec<String>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    /// Number of transitions into `kind`
    pub fn transitions_to(&self, kind: StreamKind) -> usize {
        self.transitions.iter().filter(|(_, _, to)| *to == kind).count()
    }

    /// First tick at which `user` was active
    pub fn first_active_tick(&self, user: UserId) -> Option<u64> {
        self.active_users
            .iter()
            .position(|u| *u == user)
            .map(|i| i as u64)
    }

    pub fn final_state(&self) -> Option<StreamKind> {
        self.states.last().copied()
    }
}

/// Build a scenario from scripted users and gestures
pub struct ScenarioBuilder {
    config: ScenarioConfig,
    users: Vec<ScriptedUser>,
    gestures: BTreeMap<String, u32>,
    gesture_dir: PathBuf,
    commands: Vec<(u64, RelayCommand)>,
}

impl ScenarioBuilder {
    pub fn new(config: ScenarioConfig) -> Self {
        ScenarioBuilder {
            config,
            users: Vec::new(),
            gestures: BTreeMap::new(),
            gesture_dir: PathBuf::from("."),
            commands: Vec::new(),
        }
    }

    pub fn user(mut self, user: ScriptedUser) -> Self {
        self.users.push(user);
        self
    }

    /// `count` users wandering at random through the room
    pub fn crowd(mut self, count: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let zone = self.config.activation_zone;
        let ticks = self.config.ticks.max(2);
        for i in 0..count {
            let appear = rng.gen_range(0..ticks / 2);
            let leave = rng.gen_range(appear + 1..=ticks);
            let mut spot = || Vec3::new(rng.gen_range(-2.0f32..2.0), 0.0, zone.z + rng.gen_range(-1.0f32..2.0));
            let start = spot();
            let middle = spot();
            let end = spot();
            let user = ScriptedUser::standing(UserId::new(100 + i), appear, start)
                .walking_to((appear + leave) / 2, middle)
                .walking_to(leave, end)
                .waving(0.2)
                .leaving_at(leave);
            self.users.push(user);
        }
        self
    }

    /// Gestures for idle playback, resolved against `dir`
    pub fn gestures(mut self, dir: &Path, weights: &[(&str, u32)]) -> Self {
        self.gesture_dir = dir.to_path_buf();
        self.gestures = weights.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self
    }

    /// Issue `command` right before tick `tick`
    pub fn command_at(mut self, tick: u64, command: RelayCommand) -> Self {
        self.commands.push((tick, command));
        self
    }

    pub fn build(self) -> DiskinectResult<ScenarioHarness> {
        let relay_config = RelayConfig {
            tracker: TrackerConfig {
                activation_zone: self.config.activation_zone,
                activation_radius: self.config.activation_radius,
                ..TrackerConfig::default()
            },
            stream: StreamConfig {
                idle_ticks_before_playback: self.config.idle_ticks,
                recording_dir: self.gesture_dir.join("recordings"),
                ..StreamConfig::default()
            },
            gestures: self.gestures,
            gesture_dir: self.gesture_dir,
            use_idle_timer: self.config.use_idle_timer,
            ..RelayConfig::default()
        };

        let hub = Arc::new(SensorHub::new());
        let sensor = SimulatedSensor::with_seed(hub.clone(), self.users, self.config.seed)
            .with_dropout(self.config.dropout);

        let link = CapturedLink::new();
        let puppeteer = Puppeteer::new(relay_config.puppeteer.clone(), Box::new(link.clone()));
        let relay = Relay::new(relay_config, hub)?
            .with_seed(self.config.seed)
            .with_puppeteer(puppeteer);

        let mut commands = self.commands;
        commands.sort_by_key(|(tick, _)| *tick);

        Ok(ScenarioHarness {
            config: self.config,
            sensor,
            relay,
            link,
            commands,
        })
    }
}

/// A built scenario, ready to run
pub struct ScenarioHarness {
    config: ScenarioConfig,
    sensor: SimulatedSensor,
    relay: Relay,
    link: CapturedLink,
    commands: Vec<(u64, RelayCommand)>,
}

impl ScenarioHarness {
    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut Relay {
        &mut self.relay
    }

    /// Step sensor and relay once
    pub fn step(&mut self) {
        self.sensor.step();
        self.relay.tick();
    }

    pub fn run(&mut self) -> ScenarioResult {
        let mut result = ScenarioResult::default();
        let mut previous = self.relay.current_kind();
        let mut pending = std::mem::take(&mut self.commands).into_iter().peekable();

        for tick in 0..self.config.ticks {
            while let Some((_, command)) = pending.next_if(|(at, _)| *at <= tick) {
                if let Err(e) = self.relay.handle_command(command) {
                    debug!(tick, error = %e, "scenario command failed");
                }
            }

            self.step();

            let kind = self.relay.current_kind();
            if let (Some(from), Some(to)) = (previous, kind) {
                if from != to {
                    result.transitions.push((tick, from, to));
                }
            }
            previous = kind;

            if let Some(kind) = kind {
                result.states.push(kind);
            }
            result.active_users.push(self.relay.active_user_id());
            self.check_invariants(tick, &mut result.invariant_violations);
        }

        result.ticks = self.config.ticks;
        result.actuator_messages = self.link.messages();
        result
    }

    fn check_invariants(&self, tick: u64, violations: &mut Vec<String>) {
        let tracker = self.relay.tracker();

        let active: Vec<_> = tracker.users().iter().filter(|u| u.is_active).collect();
        if active.len() > 1 {
            violations.push(format!("tick {}: {} active users", tick, active.len()));
        }
        let expected = active.first().map(|u| u.id).unwrap_or(UserId::NONE);
        if expected != tracker.active_user_id() {
            violations.push(format!(
                "tick {}: active id {} but flagged user {}",
                tick,
                tracker.active_user_id(),
                expected
            ));
        }

        if let Some(StreamState::Player(player)) = self.relay.current_state() {
            if player.current_frame() > player.total_frames() {
                violations.push(format!(
                    "tick {}: playhead {} past {} frames",
                    tick,
                    player.current_frame(),
                    player.total_frames()
                ));
            }
        }
    }
}

/// `frames` skeletons of a standing person waving at `torso`
pub fn synthetic_gesture(frames: u32, torso: Vec3) -> Recording {
    let mut recording = Recording::new();
    for i in 0..frames {
        recording.push(waving_body_at(torso, 0.3 * (i as f32 * 0.2).sin()));
    }
    recording
}

/// Save a synthetic gesture as `dir/name`
pub fn write_gesture(dir: &Path, name: &str, frames: u32) -> DiskinectResult<PathBuf> {
    let path = dir.join(name);
    synthetic_gesture(frames, Vec3::new(0.0, 0.0, 3.0)).save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(ScenarioConfig::minimal().ticks, 100);
        assert!(ScenarioConfig::noisy().dropout > 0.0);
        assert_eq!(ScenarioConfig::standard().idle_ticks, 60);
    }

    #[test]
    fn test_crowd_is_seeded() {
        let a = ScenarioBuilder::new(ScenarioConfig::standard()).crowd(5);
        let b = ScenarioBuilder::new(ScenarioConfig::standard()).crowd(5);
        assert_eq!(a.users.len(), 5);
        for (x, y) in a.users.iter().zip(b.users.iter()) {
            assert_eq!(x.appear_at, y.appear_at);
            assert_eq!(x.leave_at, y.leave_at);
            assert_eq!(x.torso_at(50), y.torso_at(50));
        }
    }

    #[test]
    fn test_empty_room_stays_valid() {
        let mut harness = ScenarioBuilder::new(ScenarioConfig::minimal())
            .build()
            .unwrap();
        let result = harness.run();
        assert!(result.passed());
        assert_eq!(result.states.len(), 100);
        assert!(result.actuator_messages.is_empty());
    }
}
