//! Gateway assembly
//!
//! [`Gateway`] bundles the call handler for the chosen topology with the
//! shared catalog and derived-state cache. Build one per process with
//! [`GatewayBuilder`] and hand it to the transport.

use std::sync::Arc;

use nal2_core::{
    CallRequest, CallResponse, DerivedStateCache, FunctionCatalog, NalEngine,
    Result as CallResult,
};
use tracing::debug;

use crate::config::{RelayConfig, Topology};
use crate::error::{GatewayError, Result};
use crate::handler::CallHandler;
use crate::local::LocalGateway;
use crate::relay::{ChannelRegistry, CorrelationBroker, RelayGateway, RelayHub};

/// Metadata about the running gateway
#[derive(Debug, Clone)]
pub struct GatewayMetadata {
    pub name: String,
    pub version: String,
    pub topology: Topology,
}

/// The assembled gateway
#[derive(Clone)]
pub struct Gateway {
    handler: Arc<dyn CallHandler>,
    catalog: Arc<FunctionCatalog>,
    cache: Arc<DerivedStateCache>,
    relay: Option<RelayHub>,
    metadata: GatewayMetadata,
}

impl Gateway {
    /// Dispatch one call through the configured topology
    pub async fn handle(&self, request: CallRequest) -> CallResult<CallResponse> {
        self.handler.handle(request).await
    }

    pub fn catalog(&self) -> &Arc<FunctionCatalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<DerivedStateCache> {
        &self.cache
    }

    /// Channel hub, present in the relay topology only
    pub fn relay(&self) -> Option<&RelayHub> {
        self.relay.as_ref()
    }

    pub fn metadata(&self) -> &GatewayMetadata {
        &self.metadata
    }

    /// Create a new builder
    pub fn builder(name: impl Into<String>) -> GatewayBuilder {
        GatewayBuilder::new(name)
    }
}

/// Builder for creating gateways
pub struct GatewayBuilder {
    name: String,
    version: String,
    topology: Topology,
    engine: Option<Box<dyn NalEngine>>,
    relay: RelayConfig,
    catalog: Option<Arc<FunctionCatalog>>,
    cache: Option<Arc<DerivedStateCache>>,
}

impl GatewayBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            topology: Topology::InProcess,
            engine: None,
            relay: RelayConfig::default(),
            catalog: None,
            cache: None,
        }
    }

    /// Set the version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Call a linked engine directly
    pub fn in_process(mut self, engine: impl NalEngine + 'static) -> Self {
        self.topology = Topology::InProcess;
        self.engine = Some(Box::new(engine));
        self
    }

    /// Forward calls to a remote engine over a duplex channel
    pub fn relay(mut self, config: RelayConfig) -> Self {
        self.topology = Topology::Relay;
        self.relay = config;
        self
    }

    /// Use a catalog other than the standard one
    pub fn catalog(mut self, catalog: Arc<FunctionCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Share an existing derived-state cache
    pub fn cache(mut self, cache: Arc<DerivedStateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the gateway
    pub fn build(self) -> Result<Gateway> {
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(FunctionCatalog::standard()));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(DerivedStateCache::new()));
        cache.subscribe(|snapshot| {
            debug!(
                "Derived state now CFArray={:?} FreqInCh={:?} CT={:?}",
                snapshot.cf_array, snapshot.freq_in_ch, snapshot.ct
            );
            Ok(())
        });

        let (handler, relay): (Arc<dyn CallHandler>, Option<RelayHub>) = match self.topology {
            Topology::InProcess => {
                let engine = self
                    .engine
                    .ok_or_else(|| GatewayError::Build("No engine configured".to_string()))?;
                let local: Arc<dyn CallHandler> =
                    Arc::new(LocalGateway::new(Arc::clone(&catalog), engine, Arc::clone(&cache)));
                (local, None)
            }
            Topology::Relay => {
                let registry = Arc::new(ChannelRegistry::new());
                let broker = Arc::new(CorrelationBroker::new(
                    Arc::clone(&registry),
                    self.relay.call_timeout(),
                ));
                let gateway: Arc<dyn CallHandler> = Arc::new(RelayGateway::new(
                    Arc::clone(&catalog),
                    Arc::clone(&broker),
                    Arc::clone(&cache),
                ));
                (gateway, Some(RelayHub::new(registry, broker)))
            }
        };

        Ok(Gateway {
            handler,
            catalog,
            cache,
            relay,
            metadata: GatewayMetadata {
                name: self.name,
                version: self.version,
                topology: self.topology,
            },
        })
    }
}
