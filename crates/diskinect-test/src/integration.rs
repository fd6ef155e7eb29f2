//! End-to-end scenarios
//!
//! Full relay runs against the simulated sensor:
//! - Idle substitution (Live -> Player -> Live)
//! - Active user selection with several people in the room
//! - Recording through the relay and replaying the file
//! - Invariants under sensor dropout and random crowds

use std::path::Path;

use diskinect_core::{DiskinectResult, UserId, Vec3};
use diskinect_relay::RelayCommand;
use diskinect_tracker::ScriptedUser;

use crate::scenario::{write_gesture, ScenarioBuilder, ScenarioConfig, ScenarioResult};

/// Gesture file every scenario plays when idle
pub const IDLE_GESTURE: &str = "idle_wave.json";

/// Empty room: the relay should fall back to gesture playback once
pub fn scenario_empty_room(gesture_dir: &Path) -> DiskinectResult<ScenarioResult> {
    write_gesture(gesture_dir, IDLE_GESTURE, 40)?;
    let mut harness = ScenarioBuilder::new(ScenarioConfig::standard())
        .gestures(gesture_dir, &[(IDLE_GESTURE, 1)])
        .build()?;
    Ok(harness.run())
}

/// A visitor walks into the zone while the gesture is playing
pub fn scenario_visitor(gesture_dir: &Path) -> DiskinectResult<ScenarioResult> {
    write_gesture(gesture_dir, IDLE_GESTURE, 40)?;
    let config = ScenarioConfig::standard();
    let zone = config.activation_zone;
    let visitor = ScriptedUser::standing(UserId::new(1), 100, Vec3::new(2.0, 0.0, zone.z))
        .walking_to(130, zone)
        .waving(0.3)
        .walking_to(220, zone)
        .walking_to(240, Vec3::new(0.0, 0.0, zone.z + 2.5))
        .leaving_at(250);
    let mut harness = ScenarioBuilder::new(config)
        .gestures(gesture_dir, &[(IDLE_GESTURE, 1)])
        .user(visitor)
        .build()?;
    Ok(harness.run())
}

/// Random people wandering through a noisy sensor
pub fn scenario_crowd(seed: u64, people: u32) -> DiskinectResult<ScenarioResult> {
    let config = ScenarioConfig {
        seed,
        use_idle_timer: false,
        ..ScenarioConfig::noisy()
    };
    let mut harness = ScenarioBuilder::new(config).crowd(people).build()?;
    Ok(harness.run())
}

/// Record a visitor for `frames` ticks through relay commands
pub fn scenario_record_visitor(dir: &Path, frames: u64) -> DiskinectResult<ScenarioResult> {
    let config = ScenarioConfig {
        ticks: 10 + frames + 5,
        use_idle_timer: false,
        ..ScenarioConfig::minimal()
    };
    let visitor = ScriptedUser::standing(UserId::new(3), 0, config.activation_zone).waving(0.4);
    let mut harness = ScenarioBuilder::new(config)
        .gestures(dir, &[])
        .user(visitor)
        .command_at(0, RelayCommand::SetRecording)
        .command_at(10, RelayCommand::ToggleRecordingPause)
        .command_at(10 + frames, RelayCommand::ToggleRecordingPause)
        .build()?;
    Ok(harness.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diskinect_core::{JointId, StreamConfig, TrackerConfig};
    use diskinect_stream::{
        PlayerStream, Recording, RecorderStream, StreamContext, StreamKind, UserStream,
    };
    use diskinect_tracker::{waving_body_at, SensorHub, UserTracker};
    use proptest::prelude::*;

    #[test]
    fn test_empty_room_plays_gesture_once() {
        let dir = tempfile::tempdir().unwrap();
        let result = scenario_empty_room(dir.path()).unwrap();

        assert!(result.passed(), "{:?}", result.invariant_violations);
        assert_eq!(result.transitions_to(StreamKind::Player), 1);
        assert_eq!(result.transitions[0].0, 59);
        assert_eq!(result.final_state(), Some(StreamKind::Player));
        assert!(result.active_users.iter().all(|u| u.is_none()));
    }

    #[test]
    fn test_visitor_interrupts_playback() {
        let dir = tempfile::tempdir().unwrap();
        let result = scenario_visitor(dir.path()).unwrap();
        assert!(result.passed(), "{:?}", result.invariant_violations);

        let became_active = result.first_active_tick(UserId::new(1)).unwrap();
        assert!(became_active > 100 && became_active <= 130);

        // Playback at tick 59, back to live when the visitor arrives
        assert_eq!(result.transitions[0], (59, StreamKind::Live, StreamKind::Player));
        assert_eq!(
            result.transitions[1],
            (became_active, StreamKind::Player, StreamKind::Live)
        );

        // After leaving, one more idle episode starts playback again
        assert_eq!(result.transitions_to(StreamKind::Player), 2);
        assert!(!result.actuator_messages.is_empty());
    }

    #[test]
    fn test_closest_in_zone_user_wins() {
        let config = ScenarioConfig {
            ticks: 20,
            use_idle_timer: false,
            ..ScenarioConfig::minimal()
        };
        let zone = config.activation_zone;
        let far = ScriptedUser::standing(UserId::new(1), 0, zone + Vec3::new(0.3, 0.0, 0.0));
        let near = ScriptedUser::standing(UserId::new(2), 0, zone + Vec3::new(0.0, 0.0, 0.1));
        let outside = ScriptedUser::standing(UserId::new(3), 0, zone + Vec3::new(0.0, 0.0, 1.0));

        let mut harness = ScenarioBuilder::new(config)
            .user(far)
            .user(near)
            .user(outside)
            .build()
            .unwrap();
        let result = harness.run();

        assert!(result.passed());
        assert!(result.active_users.iter().all(|u| *u == UserId::new(2)));
    }

    #[test]
    fn test_walk_out_of_zone() {
        let config = ScenarioConfig {
            ticks: 30,
            use_idle_timer: false,
            ..ScenarioConfig::minimal()
        };
        let user = ScriptedUser::standing(UserId::new(1), 0, Vec3::new(0.0, 0.0, 2.5))
            .walking_to(10, Vec3::new(0.0, 0.0, 2.5))
            .walking_to(11, Vec3::new(0.0, 0.0, 5.0));

        let mut harness = ScenarioBuilder::new(config).user(user).build().unwrap();
        let result = harness.run();

        assert_eq!(result.active_users[0], UserId::new(1));
        assert_eq!(result.active_users[10], UserId::new(1));
        assert!(result.active_users[11..].iter().all(|u| u.is_none()));
    }

    #[test]
    fn test_recording_through_relay_replays() {
        let dir = tempfile::tempdir().unwrap();
        let result = scenario_record_visitor(dir.path(), 25).unwrap();
        assert!(result.passed());

        let saved: Vec<_> = std::fs::read_dir(dir.path().join("recordings"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(saved.len(), 1);

        let recording = Recording::load(&saved[0]).unwrap();
        assert_eq!(recording.total_frames(), 25);
        assert!(recording.iter().all(|f| f.skeleton.is_tracking));
    }

    #[test]
    fn test_recorder_to_player_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::new();
        let zone = Vec3::new(0.0, 0.0, 2.5);
        let mut tracker = UserTracker::new(
            TrackerConfig {
                activation_zone: zone,
                ..TrackerConfig::default()
            },
            &hub,
        );
        let user = UserId::new(9);
        hub.user_appeared(user);

        let mut recorder = RecorderStream::new(&StreamConfig {
            recording_dir: dir.path().to_path_buf(),
            ..StreamConfig::default()
        });
        recorder.enter();
        recorder.start_recording();

        let originals: Vec<_> = (0..30)
            .map(|i| waving_body_at(zone, (i as f32 * 0.37).sin() * 0.4))
            .collect();
        for skeleton in &originals {
            hub.publish(user, skeleton.clone());
            tracker.update(&hub);
            recorder.update(&StreamContext::new(&tracker, &hub));
        }
        let path = recorder.stop_recording().unwrap();

        let mut player = PlayerStream::new(false);
        player.load_file(&path).unwrap();
        player.enter();
        assert_eq!(player.total_frames(), 30);

        let ctx = StreamContext::new(&tracker, &hub);
        for original in &originals {
            let replayed = player.skeleton(&ctx);
            assert!(replayed.approx_eq(original, 1e-5));
            assert!(replayed.confidence(JointId::LeftHand) > 0.5);
            player.update(&ctx);
        }
        assert!(player.is_finished());
    }

    #[test]
    fn test_noisy_crowd_keeps_invariants() {
        let result = scenario_crowd(11, 6).unwrap();
        assert!(result.passed(), "{:?}", result.invariant_violations);
        assert_eq!(result.states.len(), 1000);
        assert!(result.states.iter().all(|k| *k == StreamKind::Live));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_crowds_never_break_invariants(seed in any::<u64>(), people in 1u32..8) {
            let result = scenario_crowd(seed, people).unwrap();
            prop_assert!(result.passed(), "{:?}", result.invariant_violations);
        }
    }
}
