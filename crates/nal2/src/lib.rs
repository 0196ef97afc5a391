//! Gateway services for the NAL-NL2 engine
//!
//! This crate wires the core call model to an engine in one of two
//! topologies: in-process, where the engine is linked and called directly,
//! and relay, where the engine runs on another host and calls are forwarded
//! over a duplex channel and correlated with their replies.

pub mod app;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod handler;
pub mod history;
pub mod local;
pub mod relay;
pub mod storage;

// Re-export core types
pub use nal2_core::{
    CallError, CallRequest, CallResponse, DerivedSlot, DerivedSnapshot, DerivedStateCache,
    DerivedStats, FunctionCatalog, NalEngine, ReferenceEngine,
};

// Re-export app types
pub use app::{Gateway, GatewayBuilder, GatewayMetadata};

pub use config::{RelayConfig, StoreConfig, Topology};

// Re-export error types
pub use error::{GatewayError, Result};

pub use handler::CallHandler;
pub use local::LocalGateway;
pub use relay::{RelayGateway, RelayHub};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::app::Gateway;
    pub use crate::handler::CallHandler;
    pub use nal2_core::{CallRequest, CallResponse, NalEngine};
}
