//! User tracker - decides which tracked skeleton is the active user
//!
//! Each tick the tracker:
//! 1. Applies queued appeared/lost events to its candidate set
//! 2. Snapshots every skeleton from the source under one lock
//! 3. Smooths six motion joints plus the torso (low-confidence samples keep
//!    the previous value)
//! 4. Marks users inside the activation zone as eligible
//! 5. Picks at most one active user, closest to the zone centre first

use std::cmp::Ordering;

use tracing::{debug, info};

use diskinect_core::{JointId, Skeleton, TrackerConfig, UserId, Vec3};

use crate::source::{EventSubscription, SensorEvent, SkeletonSource};

/// Joints whose displacement feeds the motion history
pub const MOTION_JOINTS: [JointId; 6] = [
    JointId::LeftShoulder,
    JointId::RightShoulder,
    JointId::LeftHand,
    JointId::RightHand,
    JointId::LeftKnee,
    JointId::RightKnee,
];

/// One candidate user as seen by the tracker
#[derive(Clone, Debug)]
pub struct TrackedUser {
    /// Sensor-assigned id
    pub id: UserId,
    /// The single selected user (at most one per tracker)
    pub is_active: bool,
    /// Torso within the activation radius this tick
    pub in_zone: bool,
    /// Ground-plane distance from the torso to the activation zone
    pub distance_from_zone: f32,
    /// Summed squared displacement of the motion joints over the last tick
    pub last_motion: f32,
    /// Consecutive ticks with motion at or below the tolerance
    pub still_ticks: u32,
    /// Consecutive ticks the sensor reported this user as tracked
    pub tracked_ticks: u32,
    /// Smoothed torso position
    pub torso: Vec3,
    /// Smoothed motion joints, in `MOTION_JOINTS` order
    smoothed: [Vec3; 6],
    has_history: bool,
}

impl TrackedUser {
    pub fn new(id: UserId) -> Self {
        TrackedUser {
            id,
            is_active: false,
            in_zone: false,
            distance_from_zone: f32::INFINITY,
            last_motion: 0.0,
            still_ticks: 0,
            tracked_ticks: 0,
            torso: Vec3::ZERO,
            smoothed: [Vec3::ZERO; 6],
            has_history: false,
        }
    }

    /// Last smoothed position of one of the motion joints
    pub fn smoothed(&self, joint: JointId) -> Option<Vec3> {
        MOTION_JOINTS
            .iter()
            .position(|j| *j == joint)
            .map(|i| self.smoothed[i])
    }

    /// Has been tracked long enough to be a person rather than sensor noise
    pub fn is_real_user(&self, frames_before_real_user: u32) -> bool {
        self.tracked_ticks >= frames_before_real_user
    }

    fn observe(&mut self, skeleton: &Skeleton, config: &TrackerConfig) {
        let threshold = config.confidence_threshold;

        let mut motion = 0.0;
        for (slot, joint_id) in self.smoothed.iter_mut().zip(MOTION_JOINTS.iter()) {
            let joint = skeleton.joint(*joint_id);
            let position = if joint.is_reliable(threshold) {
                joint.position
            } else {
                *slot
            };
            if self.has_history {
                motion += position.distance_squared(slot);
            }
            *slot = position;
        }

        let torso = skeleton.joint(JointId::Torso);
        if torso.is_reliable(threshold) || !self.has_history {
            self.torso = torso.position;
        }

        self.last_motion = motion;
        if motion <= config.motion_tolerance {
            self.still_ticks = self.still_ticks.saturating_add(1);
        } else {
            self.still_ticks = 0;
        }
        self.tracked_ticks = self.tracked_ticks.saturating_add(1);
        self.has_history = true;

        self.distance_from_zone = self.torso.ground_distance(&config.activation_zone);
        self.in_zone = self.distance_from_zone < config.activation_radius;
    }

    fn lose_tracking(&mut self) {
        self.is_active = false;
        self.in_zone = false;
        self.tracked_ticks = 0;
        self.still_ticks = 0;
        self.last_motion = 0.0;
        // Motion restarts from the first frame after re-acquiring
        self.has_history = false;
    }
}

/// Active user transition reported by [`UserTracker::update`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveUserChange {
    pub previous: UserId,
    pub current: UserId,
}

/// Tracks candidate users and selects the active one
pub struct UserTracker {
    config: TrackerConfig,
    /// Candidates in arrival order
    users: Vec<TrackedUser>,
    active_user_id: UserId,
    events: Option<EventSubscription>,
}

impl UserTracker {
    /// Create a tracker subscribed to `source`'s user events
    pub fn new(config: TrackerConfig, source: &dyn SkeletonSource) -> Self {
        let mut tracker = Self::detached(config);
        tracker.events = Some(source.subscribe());
        tracker
    }

    /// Create a tracker fed only through `on_user_appeared`/`on_user_disappeared`
    pub fn detached(config: TrackerConfig) -> Self {
        UserTracker {
            config,
            users: Vec::new(),
            active_user_id: UserId::NONE,
            events: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Register a user; an existing entry with the same id is replaced
    pub fn on_user_appeared(&mut self, user: UserId) {
        self.on_user_disappeared(user);
        self.users.push(TrackedUser::new(user));
        debug!(%user, "user appeared");
    }

    /// Remove a user; unknown ids are ignored
    pub fn on_user_disappeared(&mut self, user: UserId) {
        if let Some(pos) = self.users.iter().position(|u| u.id == user) {
            self.users.remove(pos);
            debug!(%user, "user lost");
        }
    }

    /// Run one tracking tick against the source.
    ///
    /// Returns the change of active user, if any.
    pub fn update(&mut self, source: &dyn SkeletonSource) -> Option<ActiveUserChange> {
        self.apply_events();
        let snapshot = source.snapshot();

        for user in &mut self.users {
            match snapshot.get(&user.id).filter(|s| s.is_tracking) {
                Some(skeleton) => user.observe(skeleton, &self.config),
                None => user.lose_tracking(),
            }
        }

        self.select_active()
    }

    fn apply_events(&mut self) {
        let events = match &self.events {
            Some(subscription) => subscription.drain(),
            None => return,
        };
        for event in events {
            match event {
                SensorEvent::UserAppeared(user) => self.on_user_appeared(user),
                SensorEvent::UserLost(user) => self.on_user_disappeared(user),
            }
        }
    }

    fn select_active(&mut self) -> Option<ActiveUserChange> {
        let selected = self
            .users
            .iter()
            .filter(|u| u.in_zone)
            .min_by(|a, b| {
                a.distance_from_zone
                    .partial_cmp(&b.distance_from_zone)
                    .unwrap_or(Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            })
            .map(|u| u.id)
            .unwrap_or(UserId::NONE);

        for user in &mut self.users {
            user.is_active = user.id == selected;
        }

        if selected == self.active_user_id {
            return None;
        }

        let change = ActiveUserChange {
            previous: self.active_user_id,
            current: selected,
        };
        self.active_user_id = selected;

        if selected.is_some() {
            info!(user = %selected, "active user selected");
        } else {
            info!("no active user");
        }
        Some(change)
    }

    /// Active user id, `UserId::NONE` when nobody is active
    pub fn active_user_id(&self) -> UserId {
        self.active_user_id
    }

    pub fn active_user(&self) -> Option<&TrackedUser> {
        self.users.iter().find(|u| u.is_active)
    }

    pub fn user(&self, user: UserId) -> Option<&TrackedUser> {
        self.users.iter().find(|u| u.id == user)
    }

    /// Candidates in arrival order
    pub fn users(&self) -> &[TrackedUser] {
        &self.users
    }

    pub fn candidate_ids(&self) -> Vec<UserId> {
        self.users.iter().map(|u| u.id).collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn activation_radius(&self) -> f32 {
        self.config.activation_radius
    }

    /// Live-tunable activation radius (negative values clamp to zero)
    pub fn set_activation_radius(&mut self, radius: f32) {
        self.config.activation_radius = radius.max(0.0);
    }

    pub fn set_activation_zone(&mut self, zone: Vec3) {
        self.config.activation_zone = zone;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body_at;
    use crate::source::SensorHub;
    use diskinect_core::Joint;
    use proptest::prelude::*;

    fn zone_config() -> TrackerConfig {
        TrackerConfig {
            activation_zone: Vec3::new(0.0, 0.0, 2.5),
            activation_radius: 0.5,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_user_in_zone_becomes_active_and_leaves() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);
        let user = UserId::new(1);

        hub.user_appeared(user);
        hub.publish(user, body_at(Vec3::new(0.0, 0.0, 2.5)));

        let change = tracker.update(&hub);
        assert_eq!(
            change,
            Some(ActiveUserChange {
                previous: UserId::NONE,
                current: user
            })
        );
        assert!(tracker.user(user).unwrap().is_active);
        assert_eq!(tracker.active_user_id(), user);

        // Unchanged selection is not reported again
        assert_eq!(tracker.update(&hub), None);

        hub.publish(user, body_at(Vec3::new(0.0, 0.0, 5.0)));
        let change = tracker.update(&hub);
        assert_eq!(change.map(|c| c.current), Some(UserId::NONE));
        assert!(!tracker.user(user).unwrap().is_active);
        assert!(tracker.active_user_id().is_none());
    }

    #[test]
    fn test_untracked_user_is_inactive_but_kept() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);
        let user = UserId::new(2);

        hub.user_appeared(user);
        hub.publish(user, body_at(Vec3::new(0.0, 0.0, 2.5)));
        tracker.update(&hub);
        assert_eq!(tracker.active_user_id(), user);

        let mut lost = body_at(Vec3::new(0.0, 0.0, 2.5));
        lost.is_tracking = false;
        hub.publish(user, lost);
        tracker.update(&hub);

        assert_eq!(tracker.len(), 1);
        assert!(tracker.active_user_id().is_none());
        assert_eq!(tracker.user(user).unwrap().tracked_ticks, 0);
    }

    #[test]
    fn test_reacquired_user_has_no_motion_spike() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);
        let user = UserId::new(2);

        hub.user_appeared(user);
        hub.publish(user, body_at(Vec3::new(-2.0, 0.0, 2.5)));
        tracker.update(&hub);

        let mut lost = body_at(Vec3::new(-2.0, 0.0, 2.5));
        lost.is_tracking = false;
        hub.publish(user, lost);
        tracker.update(&hub);

        // Back two metres to the right of where tracking was lost
        hub.publish(user, body_at(Vec3::new(2.0, 0.0, 2.5)));
        tracker.update(&hub);
        let tracked = tracker.user(user).unwrap();
        assert_eq!(tracked.last_motion, 0.0);
        assert_eq!(tracked.tracked_ticks, 1);
        assert_eq!(tracked.torso, Vec3::new(2.0, 0.0, 2.5));

        hub.publish(user, body_at(Vec3::new(2.5, 0.0, 2.5)));
        tracker.update(&hub);
        assert!(tracker.user(user).unwrap().last_motion > 0.0);
    }

    #[test]
    fn test_closest_user_wins_tie() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);

        hub.user_appeared(UserId::new(1));
        hub.user_appeared(UserId::new(2));
        hub.publish(UserId::new(1), body_at(Vec3::new(0.3, 0.0, 2.5)));
        hub.publish(UserId::new(2), body_at(Vec3::new(0.1, 0.0, 2.5)));
        tracker.update(&hub);

        assert_eq!(tracker.active_user_id(), UserId::new(2));
        let active: Vec<_> = tracker.users().iter().filter(|u| u.is_active).collect();
        assert_eq!(active.len(), 1);
        assert!(tracker.user(UserId::new(1)).unwrap().in_zone);
    }

    #[test]
    fn test_equal_distance_falls_back_to_lowest_id() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);

        for id in [5, 3] {
            hub.user_appeared(UserId::new(id));
            hub.publish(UserId::new(id), body_at(Vec3::new(0.0, 0.0, 2.5)));
        }
        tracker.update(&hub);
        assert_eq!(tracker.active_user_id(), UserId::new(3));
    }

    #[test]
    fn test_low_confidence_keeps_previous_position() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);
        let user = UserId::new(1);

        hub.user_appeared(user);
        let body = body_at(Vec3::new(0.0, 0.0, 2.5));
        hub.publish(user, body.clone());
        tracker.update(&hub);
        let before = tracker.user(user).unwrap().smoothed(JointId::LeftHand).unwrap();

        // Hand jumps, but with confidence below the threshold
        let dropout = body.with_joint(
            JointId::LeftHand,
            Joint::new(Vec3::new(9.0, 9.0, 9.0), 0.2),
        );
        hub.publish(user, dropout);
        tracker.update(&hub);

        let tracked = tracker.user(user).unwrap();
        assert_eq!(tracked.smoothed(JointId::LeftHand), Some(before));
        assert_eq!(tracked.last_motion, 0.0);
        assert_eq!(tracked.still_ticks, 2);
    }

    #[test]
    fn test_motion_resets_still_counter() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);
        let user = UserId::new(1);

        hub.user_appeared(user);
        hub.publish(user, body_at(Vec3::new(0.0, 0.0, 2.5)));
        tracker.update(&hub);
        tracker.update(&hub);
        assert_eq!(tracker.user(user).unwrap().still_ticks, 2);

        hub.publish(user, body_at(Vec3::new(2.0, 0.0, 2.5)));
        tracker.update(&hub);
        let tracked = tracker.user(user).unwrap();
        assert!(tracked.last_motion > 2.0);
        assert_eq!(tracked.still_ticks, 0);
    }

    #[test]
    fn test_reappearing_id_replaces_entry() {
        let mut tracker = UserTracker::detached(zone_config());
        tracker.on_user_appeared(UserId::new(1));
        tracker.on_user_appeared(UserId::new(2));
        tracker.on_user_appeared(UserId::new(1));

        assert_eq!(tracker.candidate_ids(), vec![UserId::new(2), UserId::new(1)]);
        tracker.on_user_disappeared(UserId::new(9));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_radius_is_live_tunable() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);
        let user = UserId::new(1);

        hub.user_appeared(user);
        hub.publish(user, body_at(Vec3::new(0.0, 0.0, 3.2)));
        tracker.update(&hub);
        assert!(tracker.active_user_id().is_none());

        tracker.set_activation_radius(1.0);
        tracker.update(&hub);
        assert_eq!(tracker.active_user_id(), user);

        tracker.set_activation_radius(-3.0);
        assert_eq!(tracker.activation_radius(), 0.0);
    }

    #[test]
    fn test_real_user_threshold() {
        let hub = SensorHub::new();
        let mut tracker = UserTracker::new(zone_config(), &hub);
        let user = UserId::new(1);

        hub.user_appeared(user);
        hub.publish(user, body_at(Vec3::new(0.0, 0.0, 2.5)));
        for _ in 0..9 {
            tracker.update(&hub);
        }
        assert!(!tracker.user(user).unwrap().is_real_user(10));
        tracker.update(&hub);
        assert!(tracker.user(user).unwrap().is_real_user(10));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Appear(u32),
        Disappear(u32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..6).prop_map(Op::Appear),
            (1u32..6).prop_map(Op::Disappear),
        ]
    }

    proptest! {
        #[test]
        fn prop_candidate_set_matches_event_history(ops in proptest::collection::vec(op_strategy(), 0..60)) {
            let mut tracker = UserTracker::detached(zone_config());
            let mut expected: Vec<u32> = Vec::new();

            for op in &ops {
                match op {
                    Op::Appear(id) => {
                        tracker.on_user_appeared(UserId::new(*id));
                        expected.retain(|u| u != id);
                        expected.push(*id);
                    }
                    Op::Disappear(id) => {
                        tracker.on_user_disappeared(UserId::new(*id));
                        expected.retain(|u| u != id);
                    }
                }
            }

            let ids: Vec<u32> = tracker.candidate_ids().iter().map(|u| u.0).collect();
            prop_assert_eq!(ids, expected);
        }

        #[test]
        fn prop_at_most_one_active(torsos in proptest::collection::vec((-1.0f32..1.0, 2.0f32..3.0), 1..6)) {
            let hub = SensorHub::new();
            let mut tracker = UserTracker::new(zone_config(), &hub);

            for (i, (x, z)) in torsos.iter().enumerate() {
                let user = UserId::new(i as u32 + 1);
                hub.user_appeared(user);
                hub.publish(user, body_at(Vec3::new(*x, 0.0, *z)));
            }
            tracker.update(&hub);

            let active = tracker.users().iter().filter(|u| u.is_active).count();
            prop_assert!(active <= 1);
            let any_in_zone = tracker.users().iter().any(|u| u.in_zone);
            prop_assert_eq!(active == 1, any_in_zone);
        }
    }
}
