//! DisKinect Relay - per-tick orchestration
//!
//! Each tick the relay:
//! 1. Updates the user tracker from the shared sensor hub
//! 2. Updates the current stream state
//! 3. Applies the idle substitution policy (Live <-> Player)
//! 4. Forwards the resulting skeleton to the puppeteer
//!
//! Everything outside the tick (rendering, real sensor SDK, serial port
//! setup) plugs in through `StreamRenderer`, `SkeletonSource` and `ActuatorLink`.

pub mod gestures;
pub mod logging;
pub mod puppeteer;
pub mod relay;

pub use gestures::*;
pub use logging::*;
pub use puppeteer::*;
pub use relay::*;
