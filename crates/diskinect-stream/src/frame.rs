//! Stream frames and recordings

use diskinect_core::{DiskinectError, DiskinectResult, Skeleton};

/// One recorded sample
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFrame {
    /// Zero-based, contiguous within a recording
    pub frame_number: u32,
    pub skeleton: Skeleton,
}

impl StreamFrame {
    pub fn new(frame_number: u32, skeleton: Skeleton) -> Self {
        Self {
            frame_number,
            skeleton,
        }
    }
}

/// Ordered, gap-free sequence of frames.
///
/// Frame numbers are assigned on append, so insertion order, temporal order
/// and frame-number order always agree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    frames: Vec<StreamFrame>,
}

impl Recording {
    pub fn new() -> Self {
        Recording::default()
    }

    /// Build from frames that must already be numbered 0..n in order
    pub fn from_frames(frames: Vec<StreamFrame>) -> DiskinectResult<Self> {
        for (expected, frame) in frames.iter().enumerate() {
            let expected = expected as u32;
            if frame.frame_number != expected {
                return Err(DiskinectError::NonContiguousFrames {
                    expected,
                    found: frame.frame_number,
                });
            }
        }
        Ok(Recording { frames })
    }

    /// Append a skeleton as the next frame; returns its frame number
    pub fn push(&mut self, skeleton: Skeleton) -> u32 {
        let frame_number = self.frames.len() as u32;
        self.frames.push(StreamFrame::new(frame_number, skeleton));
        frame_number
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Number of frames (last frame number + 1)
    pub fn total_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame_number: u32) -> Option<&StreamFrame> {
        self.frames.get(frame_number as usize)
    }

    /// Skeleton at `frame`, clamped to the last frame; empty when there are no frames
    pub fn skeleton_clamped(&self, frame: u32) -> Skeleton {
        match self.total_frames() {
            0 => Skeleton::empty(),
            total => self.frames[frame.min(total - 1) as usize].skeleton.clone(),
        }
    }

    pub fn frames(&self) -> &[StreamFrame] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamFrame> {
        self.frames.iter()
    }
}
