//! The call dispatch seam shared by both topologies.

use async_trait::async_trait;
use nal2_core::{CallRequest, CallResponse, Result};

/// Dispatches one call envelope to an engine.
///
/// Application-level failures (bad parameters, unknown function, timeout,
/// lost channel) come back as `Ok` with an error envelope. `Err` is reserved
/// for outcomes the transport must surface differently:
/// [`CallError::EngineUnavailable`](nal2_core::CallError::EngineUnavailable)
/// and internal faults.
#[async_trait]
pub trait CallHandler: Send + Sync {
    async fn handle(&self, request: CallRequest) -> Result<CallResponse>;
}
