//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise `default_filter` is used.

use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use diskinect_core::{DiskinectError, DiskinectResult};

fn parse_filter(directives: &str) -> DiskinectResult<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| DiskinectError::Config(format!("bad log filter {:?}: {}", directives, e)))
}

fn env_filter(default_filter: &str) -> DiskinectResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(default_filter),
    }
}

fn text_subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr),
    )
}

fn json_subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr),
    )
}

/// Human-readable logs on stderr
pub fn init_logging(default_filter: &str) -> DiskinectResult<()> {
    text_subscriber(env_filter(default_filter)?)
        .try_init()
        .map_err(|e| DiskinectError::Config(e.to_string()))
}

/// One JSON object per event on stderr
pub fn init_json_logging(default_filter: &str) -> DiskinectResult<()> {
    json_subscriber(env_filter(default_filter)?)
        .try_init()
        .map_err(|e| DiskinectError::Config(e.to_string()))
}
