//! DisKinect Test Harness - scripted scenarios and end-to-end validation
//!
//! This crate provides:
//! - A scenario builder driving a simulated sensor through a full relay
//! - Per-tick invariant checks (single active user, playhead bounds)
//! - Randomised crowds for soak runs
//! - End-to-end integration tests

pub mod integration;
pub mod scenario;

pub use integration::*;
pub use scenario::*;
