//! Keyboard interface error types

use k65_transport::TransportError;
use thiserror::Error;

/// Errors from keyboard operations
#[derive(Error, Debug)]
pub enum KeyboardError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Feature not supported by this device
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Device returned unexpected response
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Profile could not be loaded or saved
    #[error("Profile error: {0}")]
    Profile(String),

    /// Animation engine state error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Illegal animation engine transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("cannot start {requested}: engine is {state}")]
    NotIdle {
        requested: &'static str,
        state: &'static str,
    },

    #[error("cannot cancel: engine is {0}")]
    NotRunning(&'static str),

    #[error("failed to spawn render thread: {0}")]
    Spawn(String),
}
