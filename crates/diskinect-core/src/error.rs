//! Error types for DisKinect

use std::path::PathBuf;

use thiserror::Error;

/// Core DisKinect errors
#[derive(Error, Debug)]
pub enum DiskinectError {
    // Storage errors
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed recording: {0}")]
    RecordingParse(#[from] serde_json::Error),

    #[error("Recording frames not contiguous: expected frame {expected}, found {found}")]
    NonContiguousFrames { expected: u32, found: u32 },

    #[error("Recording has no frames")]
    EmptyRecording,

    // State machine errors
    #[error("State machine has no current state")]
    StateMachineUninitialized,

    #[error("State machine already has a current state")]
    StateMachineAlreadyInitialized,

    #[error("Player entered without a loaded recording")]
    RecordingNotLoaded,

    #[error("Recorder is not recording")]
    NotRecording,

    // Output errors
    #[error("Actuator link error: {0}")]
    Actuator(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DiskinectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DiskinectError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for DisKinect operations
pub type DiskinectResult<T> = Result<T, DiskinectError>;
