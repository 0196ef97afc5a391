//! In-process topology: calls go straight to a linked engine.

use std::sync::Arc;

use async_trait::async_trait;
use nal2_core::{
    CallError, CallRequest, CallResponse, DerivedStateCache, FunctionCatalog, NalEngine, ParamMap,
    Result, marshal, unmarshal,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::handler::CallHandler;

/// Gateway that invokes the engine directly.
///
/// The engine is not reentrant, so every invocation runs under one
/// process-wide lock on a blocking worker. The derived-state cache keeps its
/// own guard and is never held across an engine call from outside.
#[derive(Clone)]
pub struct LocalGateway {
    catalog: Arc<FunctionCatalog>,
    engine: Arc<Mutex<Box<dyn NalEngine>>>,
    cache: Arc<DerivedStateCache>,
}

impl LocalGateway {
    pub fn new(
        catalog: Arc<FunctionCatalog>,
        engine: Box<dyn NalEngine>,
        cache: Arc<DerivedStateCache>,
    ) -> Self {
        Self {
            catalog,
            engine: Arc::new(Mutex::new(engine)),
            cache,
        }
    }

    /// Run one call to completion on the calling thread.
    fn dispatch(&self, function: &str, input: &ParamMap) -> Result<ParamMap> {
        let descriptor = self.catalog.resolve(function)?;

        let mut engine = self.engine.lock();
        let args = marshal(descriptor.schema(), input, &self.cache.snapshot())?;
        let outputs = descriptor.invoke(&mut **engine, &args)?;
        drop(engine);

        let derived = descriptor.derived_values(&outputs);
        if !derived.is_empty() {
            self.cache
                .update(derived)
                .map_err(|e| CallError::Internal(e.to_string()))?;
        }
        Ok(unmarshal(&outputs))
    }
}

#[async_trait]
impl CallHandler for LocalGateway {
    async fn handle(&self, request: CallRequest) -> Result<CallResponse> {
        info!(
            "Dispatching {} (sequence {})",
            request.function, request.sequence_num
        );

        let Some(input) = request.input_parameters.clone() else {
            return Ok(CallResponse::failure(&request, &CallError::MissingInput));
        };

        let gateway = self.clone();
        let function = request.function.clone();
        let outcome = tokio::task::spawn_blocking(move || gateway.dispatch(&function, &input))
            .await
            .map_err(|e| CallError::Internal(format!("engine task failed: {}", e)))?;

        match outcome {
            Ok(outputs) => {
                debug!("{} returned {} fields", request.function, outputs.len());
                Ok(CallResponse::from_outputs(
                    request.sequence_num,
                    request.function,
                    outputs,
                ))
            }
            Err(e) => {
                warn!("{} failed: {}", request.function, e);
                Ok(CallResponse::failure(&request, &e))
            }
        }
    }
}
