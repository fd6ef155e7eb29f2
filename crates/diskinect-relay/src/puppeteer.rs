//! Puppeteer - maps a skeleton to actuator positions
//!
//! Output is one ASCII line per interval:
//!
//! ```text
//! lhx,lhy,lhz,rhx,rhy,rhz,lleg,rleg|
//! ```
//!
//! Hands are expressed in a body-aligned frame (shoulder axis, neck-torso
//! axis and their normal) relative to each shoulder, normalised by arm length.
//! Every value is clamped to [0, 1] and scaled by the actuator unit.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use diskinect_core::{DiskinectError, DiskinectResult, JointId, PuppeteerConfig, Skeleton, Vec3};

/// Where actuator messages go
pub trait ActuatorLink: Send {
    fn send(&mut self, message: &str) -> DiskinectResult<()>;
}

/// Line-oriented writer link (serial device file, stdout, socket, ...)
pub struct SerialLine<W: Write> {
    writer: W,
    newline: bool,
}

impl<W: Write> SerialLine<W> {
    /// Messages are written as-is, framed only by the trailing `|`
    pub fn new(writer: W) -> Self {
        SerialLine {
            writer,
            newline: false,
        }
    }

    /// Terminate every message with `\n` as well
    pub fn with_newline(mut self) -> Self {
        self.newline = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ActuatorLink for SerialLine<W> {
    fn send(&mut self, message: &str) -> DiskinectResult<()> {
        let actuator = |e: std::io::Error| DiskinectError::Actuator(e.to_string());
        self.writer.write_all(message.as_bytes()).map_err(actuator)?;
        if self.newline {
            self.writer.write_all(b"\n").map_err(actuator)?;
        }
        self.writer.flush().map_err(actuator)
    }
}

/// Link that keeps every message in memory; clones share the buffer
#[derive(Clone, Default)]
pub struct CapturedLink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CapturedLink {
    pub fn new() -> Self {
        CapturedLink::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl ActuatorLink for CapturedLink {
    fn send(&mut self, message: &str) -> DiskinectResult<()> {
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

/// Eight actuator values in wire order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActuatorCommand {
    pub left_hand: Vec3,
    pub right_hand: Vec3,
    pub left_leg: f32,
    pub right_leg: f32,
}

impl ActuatorCommand {
    pub fn values(&self) -> [f32; 8] {
        [
            self.left_hand.x,
            self.left_hand.y,
            self.left_hand.z,
            self.right_hand.x,
            self.right_hand.y,
            self.right_hand.z,
            self.left_leg,
            self.right_leg,
        ]
    }

    fn from_values(v: [f32; 8]) -> Self {
        ActuatorCommand {
            left_hand: Vec3::new(v[0], v[1], v[2]),
            right_hand: Vec3::new(v[3], v[4], v[5]),
            left_leg: v[6],
            right_leg: v[7],
        }
    }

    /// Wire format: rounded integers, comma separated, `|` terminated
    pub fn to_message(&self) -> String {
        let mut message = self
            .values()
            .iter()
            .map(|v| format!("{}", v.round() as i32))
            .collect::<Vec<_>>()
            .join(",");
        message.push('|');
        message
    }

    /// Keep previous values whose change is below `deadband`
    fn with_deadband(&self, previous: &ActuatorCommand, deadband: f32) -> ActuatorCommand {
        let mut next = self.values();
        for (value, old) in next.iter_mut().zip(previous.values()) {
            if (*value - old).abs() < deadband {
                *value = old;
            }
        }
        ActuatorCommand::from_values(next)
    }
}

/// Leg lift from hip/knee heights: 0 standing, 1 knee raised to hip level
fn leg_position(hip: Vec3, knee: Vec3) -> f32 {
    let len = knee.distance(&hip);
    if len <= f32::EPSILON {
        return 0.0;
    }
    (1.0 - (hip.y - knee.y + len * 0.25) / (len * 1.25)).clamp(0.0, 1.0)
}

/// Map a skeleton to normalised [0, 1] actuator values (before unit scaling).
///
/// Returns `None` when either shoulder has zero confidence.
pub fn map_skeleton(skeleton: &Skeleton) -> Option<ActuatorCommand> {
    let left_shoulder = skeleton.joint(JointId::LeftShoulder);
    let right_shoulder = skeleton.joint(JointId::RightShoulder);
    if left_shoulder.confidence == 0.0 || right_shoulder.confidence == 0.0 {
        return None;
    }
    let p = |id| skeleton.position(id);

    let left_leg = leg_position(p(JointId::LeftHip), p(JointId::LeftKnee));
    let right_leg = leg_position(p(JointId::RightHip), p(JointId::RightKnee));

    // Body frame: horizontal points from right to left shoulder
    let horiz = (left_shoulder.position - right_shoulder.position).normalized();
    let up = (p(JointId::Neck) - p(JointId::Torso)).normalized();
    let normal = horiz.cross(&up).normalized();
    let vert = normal.cross(&horiz);

    let local = |offset: Vec3| Vec3::new(-offset.dot(&horiz), offset.dot(&vert), -offset.dot(&normal));

    let arm_len_l = left_shoulder.position.distance(&p(JointId::LeftElbow))
        + p(JointId::LeftElbow).distance(&p(JointId::LeftHand));
    let arm_len_r = right_shoulder.position.distance(&p(JointId::RightElbow))
        + p(JointId::RightElbow).distance(&p(JointId::RightHand));
    if arm_len_l <= f32::EPSILON || arm_len_r <= f32::EPSILON {
        return None;
    }

    let hand_l = local(p(JointId::LeftHand) - left_shoulder.position);
    let hand_r = local(p(JointId::RightHand) - right_shoulder.position);

    let left_hand = Vec3::new(
        (-hand_l.x / arm_len_l).clamp(0.0, 1.0),
        ((hand_l.y + arm_len_l) / (arm_len_l * 2.0)).clamp(0.0, 1.0),
        (-hand_l.z / arm_len_l).clamp(0.0, 1.0),
    );
    let right_hand = Vec3::new(
        (hand_r.x / arm_len_r).clamp(0.0, 1.0),
        ((hand_r.y + arm_len_r) / (arm_len_r * 2.0)).clamp(0.0, 1.0),
        (-hand_r.z / arm_len_r).clamp(0.0, 1.0),
    );

    Some(ActuatorCommand {
        left_hand,
        right_hand,
        left_leg,
        right_leg,
    })
}

/// Rate-limited skeleton to actuator bridge
pub struct Puppeteer {
    config: PuppeteerConfig,
    link: Box<dyn ActuatorLink>,
    last_sent: Option<ActuatorCommand>,
    last_update_secs: Option<f64>,
    messages_sent: u64,
}

impl Puppeteer {
    pub fn new(config: PuppeteerConfig, link: Box<dyn ActuatorLink>) -> Self {
        Puppeteer {
            config,
            link,
            last_sent: None,
            last_update_secs: None,
            messages_sent: 0,
        }
    }

    pub fn config(&self) -> &PuppeteerConfig {
        &self.config
    }

    pub fn last_sent(&self) -> Option<&ActuatorCommand> {
        self.last_sent.as_ref()
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Scaled command for `skeleton`, without sending anything
    pub fn command_for(&self, skeleton: &Skeleton) -> Option<ActuatorCommand> {
        let unit = self.config.actuator_unit;
        let mapped = map_skeleton(skeleton)?;
        let scaled = ActuatorCommand {
            left_hand: mapped.left_hand * unit,
            right_hand: mapped.right_hand * unit,
            left_leg: mapped.left_leg * unit,
            right_leg: mapped.right_leg * unit,
        };
        Some(match &self.last_sent {
            Some(previous) => scaled.with_deadband(previous, self.config.deadband),
            None => scaled,
        })
    }

    /// Feed one skeleton at `now_secs` (monotonic seconds).
    ///
    /// Sends at most once per `update_interval_secs` and returns the message sent.
    pub fn update(&mut self, skeleton: &Skeleton, now_secs: f64) -> Option<String> {
        let command = self.command_for(skeleton)?;

        if let Some(last) = self.last_update_secs {
            if now_secs - last < self.config.update_interval_secs {
                trace!("actuator update rate limited");
                return None;
            }
        }
        self.last_update_secs = Some(now_secs);

        let message = command.to_message();
        if let Err(e) = self.link.send(&message) {
            warn!(error = %e, "actuator send failed");
            return None;
        }
        debug!(%message, "actuator message");
        self.last_sent = Some(command);
        self.messages_sent += 1;
        Some(message)
    }
}
