//! Recording file format
//!
//! ```json
//! { "root": [
//!     { "framenumber": 0,
//!       "skeleton": { "is_tracking": true,
//!                     "joints": { "torso": { "position": { "x": 0.0, "y": 0.0, "z": 2.5 },
//!                                            "confidence": 1.0 } } } }
//! ] }
//! ```
//!
//! Frames must be numbered 0, 1, 2, ... in array order. Files with gaps,
//! duplicates or reordering are rejected instead of being mis-indexed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use diskinect_core::{DiskinectError, DiskinectResult, Joint, JointId, Skeleton, Vec3};

use crate::frame::{Recording, StreamFrame};

#[derive(Debug, Serialize, Deserialize)]
struct RecordingFile {
    root: Vec<FrameRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FrameRecord {
    framenumber: u32,
    skeleton: SkeletonRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct SkeletonRecord {
    #[serde(default)]
    is_tracking: bool,
    #[serde(default)]
    joints: BTreeMap<String, JointRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JointRecord {
    position: Vec3,
    #[serde(default)]
    confidence: f32,
}

impl From<&Skeleton> for SkeletonRecord {
    fn from(skeleton: &Skeleton) -> Self {
        let joints = JointId::all()
            .iter()
            .map(|id| {
                let joint = skeleton.joint(*id);
                (
                    id.name().to_string(),
                    JointRecord {
                        position: joint.position,
                        confidence: joint.confidence,
                    },
                )
            })
            .collect();
        SkeletonRecord {
            is_tracking: skeleton.is_tracking,
            joints,
        }
    }
}

impl SkeletonRecord {
    fn into_skeleton(self) -> Skeleton {
        let mut skeleton = Skeleton {
            is_tracking: self.is_tracking,
            ..Skeleton::default()
        };
        for (name, record) in self.joints {
            match JointId::from_name(&name) {
                Some(id) => skeleton.set_joint(id, Joint::new(record.position, record.confidence)),
                None => debug!(joint = %name, "ignoring unknown joint in recording"),
            }
        }
        skeleton
    }
}

impl Recording {
    /// Serialize to the recording JSON format
    pub fn to_json(&self) -> DiskinectResult<String> {
        let file = RecordingFile {
            root: self
                .iter()
                .map(|frame| FrameRecord {
                    framenumber: frame.frame_number,
                    skeleton: SkeletonRecord::from(&frame.skeleton),
                })
                .collect(),
        };
        Ok(serde_json::to_string(&file)?)
    }

    /// Parse the recording JSON format
    pub fn from_json_str(json: &str) -> DiskinectResult<Self> {
        let file: RecordingFile = serde_json::from_str(json)?;
        Self::from_records(file)
    }

    /// Convert an already-parsed JSON value
    pub fn from_json_value(value: serde_json::Value) -> DiskinectResult<Self> {
        let file: RecordingFile = serde_json::from_value(value)?;
        Self::from_records(file)
    }

    fn from_records(file: RecordingFile) -> DiskinectResult<Self> {
        let frames = file
            .root
            .into_iter()
            .map(|record| StreamFrame::new(record.framenumber, record.skeleton.into_skeleton()))
            .collect();
        Recording::from_frames(frames)
    }

    /// Read and parse a recording file
    pub fn load(path: impl AsRef<Path>) -> DiskinectResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DiskinectError::io(path, e))?;
        let recording = Self::from_json_str(&json)?;
        if recording.is_empty() {
            warn!(path = %path.display(), "recording file has no frames");
        }
        Ok(recording)
    }

    /// Write the recording to `path`, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> DiskinectResult<()> {
        let path = path.as_ref();
        if self.is_empty() {
            return Err(DiskinectError::EmptyRecording);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DiskinectError::io(parent, e))?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| DiskinectError::io(path, e))
    }
}
