//! DisKinect Stream - Where the current skeleton comes from
//!
//! The installation shows one skeleton per tick. Which skeleton depends on
//! the stream state:
//!
//! - Live: the active user, straight from the sensor
//! - Recorder: live, while capturing frames to a recording file
//! - Player: a recording loaded from disk
//! - Repeater: captures a burst of live motion and echoes it back
//!
//! The [`StreamStateManager`] owns exactly one of these at a time and swaps
//! them with exit/enter semantics.

pub mod format;
pub mod frame;
pub mod live;
pub mod manager;
pub mod player;
pub mod recorder;
pub mod repeater;
pub mod state;

pub use format::*;
pub use frame::*;
pub use live::*;
pub use manager::*;
pub use player::*;
pub use recorder::*;
pub use repeater::*;
pub use state::*;
