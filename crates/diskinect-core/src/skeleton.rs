//! Skeleton primitives - joints and per-user body snapshots
//!
//! A `Skeleton` is what the depth sensor reports for one user in one frame.
//! It is never mutated after capture; each frame supersedes the last.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Joint identifier for the tracked body.
///
/// Closed set: these are the joints the sensor middleware reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JointId {
    Head,
    Neck,
    Torso,

    LeftShoulder,
    LeftElbow,
    LeftHand,

    RightShoulder,
    RightElbow,
    RightHand,

    LeftHip,
    LeftKnee,
    LeftFoot,

    RightHip,
    RightKnee,
    RightFoot,
}

impl JointId {
    /// Number of joints
    pub const COUNT: usize = 15;

    /// All joints in index order
    pub fn all() -> &'static [JointId; JointId::COUNT] {
        &[
            JointId::Head,
            JointId::Neck,
            JointId::Torso,
            JointId::LeftShoulder,
            JointId::LeftElbow,
            JointId::LeftHand,
            JointId::RightShoulder,
            JointId::RightElbow,
            JointId::RightHand,
            JointId::LeftHip,
            JointId::LeftKnee,
            JointId::LeftFoot,
            JointId::RightHip,
            JointId::RightKnee,
            JointId::RightFoot,
        ]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable name used in recording files
    pub fn name(self) -> &'static str {
        match self {
            JointId::Head => "head",
            JointId::Neck => "neck",
            JointId::Torso => "torso",
            JointId::LeftShoulder => "left_shoulder",
            JointId::LeftElbow => "left_elbow",
            JointId::LeftHand => "left_hand",
            JointId::RightShoulder => "right_shoulder",
            JointId::RightElbow => "right_elbow",
            JointId::RightHand => "right_hand",
            JointId::LeftHip => "left_hip",
            JointId::LeftKnee => "left_knee",
            JointId::LeftFoot => "left_foot",
            JointId::RightHip => "right_hip",
            JointId::RightKnee => "right_knee",
            JointId::RightFoot => "right_foot",
        }
    }

    pub fn from_name(name: &str) -> Option<JointId> {
        JointId::all().iter().copied().find(|j| j.name() == name)
    }
}

/// 3D position in sensor space (y is up, z is depth away from the sensor)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; zero stays zero
    pub fn normalized(&self) -> Vec3 {
        let len = self.length();
        if len < 1e-6 {
            return Vec3::ZERO;
        }
        *self * (1.0 / len)
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        (*self - *other).length()
    }

    pub fn distance_squared(&self, other: &Vec3) -> f32 {
        let d = *self - *other;
        d.dot(&d)
    }

    /// Distance on the ground plane (x/z), ignoring height
    pub fn ground_distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Linear interpolation
    pub fn lerp(&self, other: &Vec3, t: f32) -> Vec3 {
        *self + (*other - *self) * t
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// One joint sample (position + sensor-reported confidence)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Joint {
    pub position: Vec3,
    /// Typically in [0, 1]; treated as reliable above a threshold
    pub confidence: f32,
}

impl Joint {
    pub fn new(position: Vec3, confidence: f32) -> Self {
        Self {
            position,
            confidence,
        }
    }

    #[inline]
    pub fn is_reliable(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }
}

/// Per-user snapshot of every joint for one sensor frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    /// Joint samples (indexed by JointId)
    pub joints: [Joint; JointId::COUNT],
    /// Is the sensor currently tracking this skeleton?
    pub is_tracking: bool,
}

impl Skeleton {
    /// Empty, untracked skeleton
    pub fn empty() -> Self {
        Self::default()
    }

    /// Tracked skeleton with every joint at full confidence
    pub fn tracked() -> Self {
        Skeleton {
            joints: [Joint::new(Vec3::ZERO, 1.0); JointId::COUNT],
            is_tracking: true,
        }
    }

    #[inline]
    pub fn joint(&self, id: JointId) -> &Joint {
        &self.joints[id.index()]
    }

    #[inline]
    pub fn position(&self, id: JointId) -> Vec3 {
        self.joints[id.index()].position
    }

    #[inline]
    pub fn confidence(&self, id: JointId) -> f32 {
        self.joints[id.index()].confidence
    }

    /// Builder-style joint assignment
    pub fn with_joint(mut self, id: JointId, joint: Joint) -> Self {
        self.joints[id.index()] = joint;
        self
    }

    pub fn set_joint(&mut self, id: JointId, joint: Joint) {
        self.joints[id.index()] = joint;
    }

    /// Same skeleton shifted by `offset`
    pub fn translated(&self, offset: Vec3) -> Skeleton {
        let mut moved = self.clone();
        for joint in &mut moved.joints {
            joint.position = joint.position + offset;
        }
        moved
    }

    /// True when every joint position matches `other` within `tolerance`
    pub fn approx_eq(&self, other: &Skeleton, tolerance: f32) -> bool {
        self.is_tracking == other.is_tracking
            && self.joints.iter().zip(other.joints.iter()).all(|(a, b)| {
                a.position.distance(&b.position) <= tolerance
                    && (a.confidence - b.confidence).abs() <= tolerance
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_joint_names_roundtrip() {
        for joint in JointId::all() {
            assert_eq!(JointId::from_name(joint.name()), Some(*joint));
        }
        assert_eq!(JointId::from_name("tail"), None);
        assert_eq!(JointId::all().len(), JointId::COUNT);
    }

    #[test]
    fn test_joint_index_order() {
        for (i, joint) in JointId::all().iter().enumerate() {
            assert_eq!(joint.index(), i);
        }
    }

    #[test]
    fn test_ground_distance_ignores_height() {
        let a = Vec3::new(0.0, 10.0, 2.5);
        let b = Vec3::new(0.0, -3.0, 2.5);
        assert!(a.ground_distance(&b) < 1e-6);

        let c = Vec3::new(3.0, 0.0, 6.5);
        assert!((a.ground_distance(&c) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_vec3_cross_and_normalize() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vec3::new(0.0, 0.0, 1.0));

        let v = Vec3::new(3.0, 0.0, 4.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
    }

    #[test]
    fn test_skeleton_default_is_untracked() {
        let skeleton = Skeleton::default();
        assert!(!skeleton.is_tracking);
        assert_eq!(skeleton.confidence(JointId::Torso), 0.0);
    }

    #[test]
    fn test_skeleton_translate() {
        let skeleton = Skeleton::tracked().with_joint(
            JointId::Torso,
            Joint::new(Vec3::new(0.0, 0.0, 2.5), 1.0),
        );
        let moved = skeleton.translated(Vec3::new(0.0, 0.0, 2.5));
        assert_eq!(moved.position(JointId::Torso), Vec3::new(0.0, 0.0, 5.0));
        assert!(!moved.approx_eq(&skeleton, 0.01));
        assert!(moved.approx_eq(&moved.clone(), 0.0));
    }

    proptest! {
        #[test]
        fn prop_ground_distance_symmetric(
            ax in -10.0f32..10.0, ay in -10.0f32..10.0, az in -10.0f32..10.0,
            bx in -10.0f32..10.0, by in -10.0f32..10.0, bz in -10.0f32..10.0,
        ) {
            let a = Vec3::new(ax, ay, az);
            let b = Vec3::new(bx, by, bz);
            prop_assert!((a.ground_distance(&b) - b.ground_distance(&a)).abs() < 1e-4);
            prop_assert!(a.ground_distance(&b) <= a.distance(&b) + 1e-4);
        }
    }
}
