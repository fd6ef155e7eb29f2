//! Headless relay driven by a simulated sensor
//!
//! Usage: `relay-sim [config.json] [ticks]`
//!
//! Actuator lines go to stdout, logs to stderr.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use diskinect_core::{RelayConfig, UserId, Vec3};
use diskinect_relay::{init_logging, Puppeteer, Relay, SerialLine};
use diskinect_tracker::{ScriptedUser, SensorHub, SimulatedSensor};

const DEFAULT_TICKS: u64 = 900;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info")?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RelayConfig::from_json_file(path)?,
        None => RelayConfig::default(),
    };
    let ticks: u64 = match args.next() {
        Some(n) => n.parse()?,
        None => DEFAULT_TICKS,
    };

    let zone = config.tracker.activation_zone;
    let tick_interval = Duration::from_secs_f64(1.0 / f64::from(config.tick_rate_hz));

    // One visitor walks into the zone, waves and leaves; another passes behind
    let visitor = ScriptedUser::standing(UserId::new(1), 30, Vec3::new(1.5, 0.0, zone.z + 1.0))
        .walking_to(120, zone)
        .walking_to(500, zone)
        .walking_to(600, Vec3::new(-1.5, 0.0, zone.z + 1.0))
        .waving(0.3)
        .leaving_at(620);
    let passer_by = ScriptedUser::standing(UserId::new(2), 200, Vec3::new(-2.0, 0.0, zone.z + 2.0))
        .walking_to(400, Vec3::new(2.0, 0.0, zone.z + 2.0))
        .leaving_at(410);

    let hub = Arc::new(SensorHub::new());
    let puppeteer = Puppeteer::new(
        config.puppeteer.clone(),
        Box::new(SerialLine::new(std::io::stdout()).with_newline()),
    );
    let mut relay = Relay::new(config, hub.clone())?.with_puppeteer(puppeteer);

    let sensor = SimulatedSensor::new(hub, vec![visitor, passer_by]).spawn(tick_interval);

    for _ in 0..ticks {
        relay.tick();
        thread::sleep(tick_interval);
    }
    sensor.stop();

    let stats = relay.stats();
    tracing::info!(
        ticks = stats.ticks,
        active_user_changes = stats.active_user_changes,
        idle_playbacks = stats.idle_playbacks,
        returns_to_live = stats.returns_to_live,
        actuator_messages = stats.actuator_messages,
        "simulation finished"
    );
    Ok(())
}
