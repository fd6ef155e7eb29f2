//! DisKinect Tracker - Sensor hub and active-user selection
//!
//! This crate implements:
//! - The shared, lock-protected skeleton map the sensor thread writes into
//! - Appeared/lost event subscriptions consumed once per tick
//! - The user tracker that picks the single active user
//! - A scripted sensor simulation for headless runs and tests

pub mod sim;
pub mod source;
pub mod tracker;

pub use sim::*;
pub use source::*;
pub use tracker::*;
