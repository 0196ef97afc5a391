//! Error types for nal2-core

use thiserror::Error;

use crate::params::ParamKind;

/// Failures a single remote calculation call can end in.
///
/// Every variant is an application-level outcome: gateways place the
/// rendered message in `output_parameters.error` and answer with
/// `return = -1` instead of failing the transport.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("type mismatch for parameter '{key}': expected {expected}")]
    TypeMismatch { key: String, expected: ParamKind },

    #[error("missing input parameters")]
    MissingInput,

    #[error("unimplemented function: {0}")]
    UnknownFunction(String),

    #[error("engine not connected")]
    EngineUnavailable,

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("engine channel lost before reply")]
    ChannelLost,

    #[error("engine error: {0}")]
    Engine(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CallError {
    /// Whether the call never reached an engine because none is connected.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CallError::EngineUnavailable)
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
