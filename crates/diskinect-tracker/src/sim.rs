//! Simulated depth sensor
//!
//! Drives a [`SensorHub`] from scripted users so the installation can run
//! headless and be tested without hardware. Users walk between waypoints,
//! wave their hands and optionally suffer random joint dropouts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use diskinect_core::{Joint, JointId, Skeleton, UserId, Vec3};

use crate::source::SensorHub;

/// Joint offsets from the torso for a person standing upright, facing the sensor
const BODY_OFFSETS: [(JointId, Vec3); JointId::COUNT] = [
    (JointId::Head, Vec3 { x: 0.0, y: 0.55, z: 0.0 }),
    (JointId::Neck, Vec3 { x: 0.0, y: 0.35, z: 0.0 }),
    (JointId::Torso, Vec3 { x: 0.0, y: 0.0, z: 0.0 }),
    (JointId::LeftShoulder, Vec3 { x: -0.2, y: 0.3, z: 0.0 }),
    (JointId::LeftElbow, Vec3 { x: -0.45, y: 0.3, z: 0.0 }),
    (JointId::LeftHand, Vec3 { x: -0.7, y: 0.3, z: 0.0 }),
    (JointId::RightShoulder, Vec3 { x: 0.2, y: 0.3, z: 0.0 }),
    (JointId::RightElbow, Vec3 { x: 0.45, y: 0.3, z: 0.0 }),
    (JointId::RightHand, Vec3 { x: 0.7, y: 0.3, z: 0.0 }),
    (JointId::LeftHip, Vec3 { x: -0.12, y: -0.25, z: 0.0 }),
    (JointId::LeftKnee, Vec3 { x: -0.12, y: -0.7, z: 0.0 }),
    (JointId::LeftFoot, Vec3 { x: -0.12, y: -1.1, z: 0.0 }),
    (JointId::RightHip, Vec3 { x: 0.12, y: -0.25, z: 0.0 }),
    (JointId::RightKnee, Vec3 { x: 0.12, y: -0.7, z: 0.0 }),
    (JointId::RightFoot, Vec3 { x: 0.12, y: -1.1, z: 0.0 }),
];

/// A tracked, fully confident skeleton standing with its torso at `torso`
pub fn body_at(torso: Vec3) -> Skeleton {
    let mut skeleton = Skeleton::tracked();
    for (joint, offset) in BODY_OFFSETS.iter() {
        skeleton.set_joint(*joint, Joint::new(torso + *offset, 1.0));
    }
    skeleton
}

/// `body_at` with both hands raised by `lift` (0 = arms level)
pub fn waving_body_at(torso: Vec3, lift: f32) -> Skeleton {
    let mut skeleton = body_at(torso);
    for hand in [JointId::LeftHand, JointId::RightHand] {
        let mut joint = *skeleton.joint(hand);
        joint.position.y += lift;
        skeleton.set_joint(hand, joint);
    }
    skeleton
}

/// A user the simulator moves through the room
#[derive(Clone, Debug)]
pub struct ScriptedUser {
    pub id: UserId,
    /// Tick the sensor announces the user
    pub appear_at: u64,
    /// Tick the sensor loses the user (never if `None`)
    pub leave_at: Option<u64>,
    /// (tick, torso position) pairs, interpolated linearly
    pub waypoints: Vec<(u64, Vec3)>,
    /// Hand wave amplitude (0 = still arms)
    pub wave_amplitude: f32,
}

impl ScriptedUser {
    /// User standing still at `torso` from `appear_at` on
    pub fn standing(id: UserId, appear_at: u64, torso: Vec3) -> Self {
        ScriptedUser {
            id,
            appear_at,
            leave_at: None,
            waypoints: vec![(appear_at, torso)],
            wave_amplitude: 0.0,
        }
    }

    pub fn leaving_at(mut self, tick: u64) -> Self {
        self.leave_at = Some(tick);
        self
    }

    pub fn walking_to(mut self, tick: u64, torso: Vec3) -> Self {
        self.waypoints.push((tick, torso));
        self.waypoints.sort_by_key(|(t, _)| *t);
        self
    }

    pub fn waving(mut self, amplitude: f32) -> Self {
        self.wave_amplitude = amplitude;
        self
    }

    /// Is the user in view at `tick`?
    pub fn present_at(&self, tick: u64) -> bool {
        tick >= self.appear_at && self.leave_at.map_or(true, |leave| tick < leave)
    }

    /// Torso position at `tick`
    pub fn torso_at(&self, tick: u64) -> Vec3 {
        let Some(first) = self.waypoints.first() else {
            return Vec3::ZERO;
        };
        if tick <= first.0 {
            return first.1;
        }
        for pair in self.waypoints.windows(2) {
            let (t0, p0) = pair[0];
            let (t1, p1) = pair[1];
            if tick <= t1 {
                let span = (t1 - t0).max(1) as f32;
                return p0.lerp(&p1, (tick - t0) as f32 / span);
            }
        }
        self.waypoints.last().map(|(_, p)| *p).unwrap_or(Vec3::ZERO)
    }

    /// Skeleton at `tick`
    pub fn skeleton_at(&self, tick: u64) -> Skeleton {
        let lift = self.wave_amplitude * (tick as f32 * 0.3).sin();
        waving_body_at(self.torso_at(tick), lift)
    }
}

/// Scripted sensor writing into a shared hub
pub struct SimulatedSensor {
    hub: Arc<SensorHub>,
    users: Vec<ScriptedUser>,
    tick: u64,
    rng: StdRng,
    /// Probability that a joint is reported with low confidence
    dropout_prob: f64,
}

impl SimulatedSensor {
    pub fn new(hub: Arc<SensorHub>, users: Vec<ScriptedUser>) -> Self {
        Self::with_seed(hub, users, 42)
    }

    pub fn with_seed(hub: Arc<SensorHub>, users: Vec<ScriptedUser>, seed: u64) -> Self {
        SimulatedSensor {
            hub,
            users,
            tick: 0,
            rng: StdRng::seed_from_u64(seed),
            dropout_prob: 0.0,
        }
    }

    /// Report random joints with low confidence
    pub fn with_dropout(mut self, prob: f64) -> Self {
        self.dropout_prob = prob.clamp(0.0, 1.0);
        self
    }

    pub fn hub(&self) -> &Arc<SensorHub> {
        &self.hub
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Produce one sensor frame
    pub fn step(&mut self) {
        let tick = self.tick;

        for user in &self.users {
            if user.appear_at == tick {
                self.hub.user_appeared(user.id);
            }
            if user.leave_at == Some(tick) {
                self.hub.user_lost(user.id);
            }
        }

        let mut frame = Vec::new();
        for user in self.users.iter().filter(|u| u.present_at(tick)) {
            let mut skeleton = user.skeleton_at(tick);
            if self.dropout_prob > 0.0 {
                for joint in skeleton.joints.iter_mut() {
                    if self.rng.gen_bool(self.dropout_prob) {
                        joint.confidence = 0.0;
                    }
                }
            }
            frame.push((user.id, skeleton));
        }
        self.hub.publish_frame(frame);

        self.tick += 1;
    }

    /// Run on a dedicated thread at a fixed interval until the handle is stopped
    pub fn spawn(mut self, interval: Duration) -> SensorThread {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                self.step();
                thread::sleep(interval);
            }
            debug!(ticks = self.tick, "simulated sensor stopped");
        });
        SensorThread {
            running,
            handle: Some(handle),
        }
    }
}

/// Handle to a simulated sensor running on its own thread
pub struct SensorThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SensorThread {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SensorThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SkeletonSource;

    #[test]
    fn test_body_at_places_torso() {
        let torso = Vec3::new(0.0, 0.0, 2.5);
        let body = body_at(torso);
        assert!(body.is_tracking);
        assert_eq!(body.position(JointId::Torso), torso);
        assert!(body.position(JointId::Neck).y > torso.y);
    }

    #[test]
    fn test_waypoint_interpolation() {
        let user = ScriptedUser::standing(UserId::new(1), 0, Vec3::new(0.0, 0.0, 5.0))
            .walking_to(10, Vec3::new(0.0, 0.0, 3.0));

        assert_eq!(user.torso_at(0).z, 5.0);
        assert!((user.torso_at(5).z - 4.0).abs() < 1e-5);
        assert_eq!(user.torso_at(50).z, 3.0);
    }

    #[test]
    fn test_sensor_announces_and_loses_users() {
        let hub = Arc::new(SensorHub::new());
        let events = hub.subscribe();
        let user = ScriptedUser::standing(UserId::new(3), 1, Vec3::new(0.0, 0.0, 3.0)).leaving_at(3);
        let mut sensor = SimulatedSensor::new(Arc::clone(&hub), vec![user]);

        sensor.step();
        assert!(!hub.is_tracking(UserId::new(3)));
        sensor.step();
        assert!(hub.is_tracking(UserId::new(3)));
        sensor.step();
        sensor.step();
        assert!(!hub.is_tracking(UserId::new(3)));
        assert_eq!(events.drain().len(), 2);
    }

    #[test]
    fn test_dropout_lowers_confidence() {
        let hub = Arc::new(SensorHub::new());
        let user = ScriptedUser::standing(UserId::new(1), 0, Vec3::new(0.0, 0.0, 3.0));
        let mut sensor = SimulatedSensor::new(Arc::clone(&hub), vec![user]).with_dropout(1.0);

        sensor.step();
        let skeleton = hub.skeleton(UserId::new(1));
        assert!(skeleton.joints.iter().all(|j| j.confidence == 0.0));
    }

    #[test]
    fn test_spawned_sensor_publishes() {
        let hub = Arc::new(SensorHub::new());
        let user = ScriptedUser::standing(UserId::new(1), 0, Vec3::new(0.0, 0.0, 3.0));
        let thread = SimulatedSensor::new(Arc::clone(&hub), vec![user]).spawn(Duration::from_millis(1));

        let mut seen = false;
        for _ in 0..200 {
            if hub.is_tracking(UserId::new(1)) {
                seen = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        thread.stop();
        assert!(seen);
    }
}
