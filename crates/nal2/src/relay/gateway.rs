//! Relay topology: calls are validated locally and forwarded to a remote engine.

use std::sync::Arc;

use async_trait::async_trait;
use nal2_core::{
    CallError, CallRequest, CallResponse, DerivedStateCache, FunctionCatalog, FunctionDescriptor,
    ERROR_KEY, OutputValue, Result, marshal,
};
use serde_json::Value;
use tracing::{info, warn};

use super::broker::CorrelationBroker;
use crate::handler::CallHandler;

#[derive(Clone)]
pub struct RelayGateway {
    catalog: Arc<FunctionCatalog>,
    broker: Arc<CorrelationBroker>,
    cache: Arc<DerivedStateCache>,
}

impl RelayGateway {
    pub fn new(
        catalog: Arc<FunctionCatalog>,
        broker: Arc<CorrelationBroker>,
        cache: Arc<DerivedStateCache>,
    ) -> Self {
        Self {
            catalog,
            broker,
            cache,
        }
    }

    /// Resolve and marshal locally, producing the canonical forwarded request.
    fn prepare(&self, request: &CallRequest) -> Result<(&FunctionDescriptor, CallRequest)> {
        let input = request
            .input_parameters
            .as_ref()
            .ok_or(CallError::MissingInput)?;
        let descriptor = self.catalog.resolve(&request.function)?;
        let args = marshal(descriptor.schema(), input, &self.cache.snapshot())?;
        let forwarded = CallRequest::new(
            request.sequence_num,
            descriptor.name(),
            args.to_param_map(descriptor.schema()),
        );
        Ok((descriptor, forwarded))
    }

    fn record_derived(&self, descriptor: &FunctionDescriptor, response: &CallResponse) {
        let values: Vec<_> = descriptor
            .derived_outputs()
            .iter()
            .filter_map(|(key, slot)| {
                response
                    .output_parameters
                    .get(*key)
                    .and_then(OutputValue::sequence_from_json)
                    .and_then(|value| value.as_slot_value())
                    .map(|value| (*slot, value))
            })
            .collect();
        if values.is_empty() {
            return;
        }
        if let Err(e) = self.cache.update(values) {
            warn!("Discarding derived outputs of {}: {}", descriptor.name(), e);
        }
    }
}

/// Rebuild an engine reply under the caller's sequence number so that
/// `return` is -1 exactly when an `error` key is present.
fn normalize_reply(request: &CallRequest, reply: CallResponse) -> CallResponse {
    let mut outputs = reply.output_parameters;
    if reply.return_code != 0 && !outputs.contains_key(ERROR_KEY) {
        outputs.insert(
            ERROR_KEY.to_string(),
            Value::String(format!("engine returned {}", reply.return_code)),
        );
    }
    CallResponse::from_outputs(request.sequence_num, request.function.clone(), outputs)
}

#[async_trait]
impl CallHandler for RelayGateway {
    async fn handle(&self, request: CallRequest) -> Result<CallResponse> {
        info!(
            "Relaying {} (sequence {})",
            request.function, request.sequence_num
        );

        let (descriptor, forwarded) = match self.prepare(&request) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!("{} rejected: {}", request.function, e);
                return Ok(CallResponse::failure(&request, &e));
            }
        };

        match self.broker.forward(forwarded).await {
            Ok(reply) => {
                let reply = match serde_json::from_value::<CallResponse>(reply) {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!("Malformed reply to {}: {}", request.function, e);
                        return Ok(CallResponse::error(
                            request.sequence_num,
                            request.function,
                            format!("malformed engine reply: {}", e),
                        ));
                    }
                };
                let response = normalize_reply(&request, reply);
                if response.is_success() {
                    self.record_derived(descriptor, &response);
                }
                Ok(response)
            }
            Err(CallError::EngineUnavailable) => Err(CallError::EngineUnavailable),
            Err(e) => Ok(CallResponse::failure(&request, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::channel::{ChannelHandle, Role, ServerMessage};
    use crate::relay::registry::ChannelRegistry;
    use nal2_core::DerivedSlot;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        gateway: RelayGateway,
        broker: Arc<CorrelationBroker>,
        registry: Arc<ChannelRegistry>,
        cache: Arc<DerivedStateCache>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ChannelRegistry::new());
        let broker = Arc::new(CorrelationBroker::new(
            Arc::clone(&registry),
            Duration::from_secs(30),
        ));
        let cache = Arc::new(DerivedStateCache::new());
        let gateway = RelayGateway::new(
            Arc::new(FunctionCatalog::standard()),
            Arc::clone(&broker),
            Arc::clone(&cache),
        );
        Fixture {
            gateway,
            broker,
            registry,
            cache,
        }
    }

    fn request(seq: i64, function: &str, input: serde_json::Value) -> CallRequest {
        CallRequest::new(seq, function, input.as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_no_engine_is_unavailable() {
        let fixture = fixture();
        let err = fixture
            .gateway
            .handle(request(1, "dllVersion", json!({})))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_invalid_call_never_leaves_the_gateway() {
        let fixture = fixture();
        let response = fixture
            .gateway
            .handle(request(1, "Bogus", json!({})))
            .await
            .unwrap();
        assert_eq!(response.error_message(), Some("unimplemented function: Bogus"));
        assert_eq!(fixture.broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_forwarded_call_is_canonical_and_records_derived_state() {
        let fixture = fixture();
        let (engine, mut rx) = ChannelHandle::new();
        fixture.registry.register(Role::Engine, engine.clone());

        let task = tokio::spawn({
            let gateway = fixture.gateway.clone();
            async move {
                gateway
                    .handle(request(
                        12,
                        "CrossOverFrequencies_NL2",
                        json!({"channels": "4", "AC": [10, 20], "BC": [10, 20], "note": "x"}),
                    ))
                    .await
            }
        });

        let Some(ServerMessage::Nal2Request { data }) = rx.recv().await else {
            panic!("expected a forwarded call");
        };
        assert_eq!(
            serde_json::Value::Object(data.input_parameters.clone().unwrap()),
            json!({"channels": 4, "AC": [10.0, 20.0], "BC": [10.0, 20.0]})
        );
        fixture.broker.resolve(
            engine.id(),
            12,
            json!({
                "sequence_num": 12,
                "function": "CrossOverFrequencies_NL2",
                "return": 0,
                "output_parameters": {"CFArray": [750.0, 1500.0, 3000.0], "FreqInCh": [0, 0, 1]}
            }),
        );

        let response = task.await.unwrap().unwrap();
        assert!(response.is_success());
        assert_eq!(fixture.cache.snapshot().cf_array, vec![750.0, 1500.0, 3000.0]);
        assert_eq!(fixture.cache.get(DerivedSlot::FreqInCh).len(), 3);
    }

    async fn relay_reply(fixture: &Fixture, seq: i64, reply: serde_json::Value) -> CallResponse {
        let (engine, mut rx) = ChannelHandle::new();
        fixture.registry.register(Role::Engine, engine.clone());

        let task = tokio::spawn({
            let gateway = fixture.gateway.clone();
            async move { gateway.handle(request(seq, "dllVersion", json!({}))).await }
        });
        rx.recv().await.unwrap();
        fixture.broker.resolve(engine.id(), seq, reply);
        task.await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_error_key_forces_failure_code() {
        let fixture = fixture();
        let response = relay_reply(
            &fixture,
            21,
            json!({"return": 0, "output_parameters": {"error": "engine blew up"}}),
        )
        .await;

        assert_eq!(response.return_code, -1);
        assert_eq!(response.error_message(), Some("engine blew up"));
        assert_eq!(response.sequence_num, 21);
        assert_eq!(response.function, "dllVersion");
    }

    #[tokio::test]
    async fn test_failure_code_without_error_key_gains_one() {
        let fixture = fixture();
        let response = relay_reply(&fixture, 22, json!({"return": -1, "output_parameters": {}})).await;

        assert_eq!(response.return_code, -1);
        assert_eq!(response.error_message(), Some("engine returned -1"));
    }

    #[tokio::test]
    async fn test_reply_without_return_code_is_accepted() {
        let fixture = fixture();
        let response = relay_reply(
            &fixture,
            23,
            json!({"output_parameters": {"major": 3, "minor": 1}}),
        )
        .await;

        assert!(response.is_success());
        assert_eq!(response.output_parameters["major"], 3);
    }

    #[tokio::test]
    async fn test_malformed_reply_becomes_error_envelope() {
        let fixture = fixture();
        let (engine, mut rx) = ChannelHandle::new();
        fixture.registry.register(Role::Engine, engine.clone());

        let task = tokio::spawn({
            let gateway = fixture.gateway.clone();
            async move { gateway.handle(request(3, "dllVersion", json!({}))).await }
        });
        rx.recv().await.unwrap();
        fixture.broker.resolve(engine.id(), 3, json!("nonsense"));

        let response = task.await.unwrap().unwrap();
        assert_eq!(response.return_code, -1);
        assert_eq!(response.sequence_num, 3);
        assert!(response.error_message().unwrap().starts_with("malformed engine reply"));
    }
}
