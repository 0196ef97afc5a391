//! Error types for nal2 crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Build error: {0}")]
    Build(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
