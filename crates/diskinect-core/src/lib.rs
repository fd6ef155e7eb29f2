//! DisKinect Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every part of the installation:
//! - Identifiers (UserId)
//! - Skeleton primitives (Vec3, JointId, Joint, Skeleton)
//! - Configuration for the tracker, streams, puppeteer and relay
//! - The error type used across the workspace

pub mod config;
pub mod error;
pub mod id;
pub mod skeleton;

pub use config::*;
pub use error::*;
pub use id::*;
pub use skeleton::*;
