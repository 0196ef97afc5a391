//! # nal2-core
//!
//! Call model shared by every NAL-NL2 gateway topology: request and
//! response envelopes, the typed [`NalEngine`] seam, the function catalog
//! with its parameter marshalling, and the process-wide derived-state cache.

pub mod catalog;
pub mod derived;
pub mod engine;
pub mod error;
pub mod params;
pub mod reference;
pub mod request;

pub use catalog::{FunctionCatalog, FunctionDescriptor, Invoker};
pub use derived::{
    CacheError, DerivedSlot, DerivedSnapshot, DerivedStateCache, DerivedStats, SlotValue,
    SubscriptionId,
};
pub use engine::{Bands, NalEngine};
pub use error::{CallError, Result};
pub use params::{ArgValue, Args, OutputValue, Outputs, ParamKind, ParamSpec, marshal, unmarshal};
pub use reference::ReferenceEngine;
pub use request::{CallRequest, CallResponse, ERROR_KEY, ParamMap};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(
        catalog: &FunctionCatalog,
        engine: &mut dyn NalEngine,
        cache: &DerivedStateCache,
        function: &str,
        input: serde_json::Value,
    ) -> Result<ParamMap> {
        let descriptor = catalog.resolve(function)?;
        let input = input.as_object().cloned().ok_or(CallError::MissingInput)?;
        let args = marshal(descriptor.schema(), &input, &cache.snapshot())?;
        let outputs = descriptor.invoke(engine, &args)?;
        cache
            .update(descriptor.derived_values(&outputs))
            .map_err(|e| CallError::Internal(e.to_string()))?;
        Ok(unmarshal(&outputs))
    }

    #[test]
    fn test_crossover_feeds_centre_frequencies() {
        let catalog = FunctionCatalog::standard();
        let cache = DerivedStateCache::new();
        let mut engine = ReferenceEngine::new();

        let crossover = run(
            &catalog,
            &mut engine,
            &cache,
            "CrossOverFrequencies_NL2",
            json!({"channels": 4, "AC": [30, 40, 50], "BC": [30, 40, 50]}),
        )
        .unwrap();
        let keys: Vec<_> = crossover.keys().cloned().collect();
        assert_eq!(keys, vec!["CFArray", "FreqInCh"]);
        assert_eq!(cache.stats().cf_array_length, 3);
        assert_eq!(cache.stats().freq_in_ch_length, 19);

        let centre = run(&catalog, &mut engine, &cache, "CenterFrequencies", json!({"channels": 4})).unwrap();
        assert_eq!(centre["centreF"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_setter_reports_success() {
        let catalog = FunctionCatalog::standard();
        let cache = DerivedStateCache::new();
        let mut engine = ReferenceEngine::new();

        let output = run(&catalog, &mut engine, &cache, "SetExperience", json!({"experience": 1})).unwrap();
        assert_eq!(serde_json::Value::Object(output), json!({"success": true}));
    }

    #[test]
    fn test_compression_threshold_defaults_and_alias() {
        let catalog = FunctionCatalog::standard();
        let cache = DerivedStateCache::new();
        let mut engine = ReferenceEngine::new();

        let output = run(
            &catalog,
            &mut engine,
            &cache,
            "CompressionThreshold_NL2",
            json!({"bandwidth": 1, "calcCh": [1, 2, 3]}),
        )
        .unwrap();
        assert_eq!(output["CT"].as_array().unwrap().len(), 3);
        assert_eq!(cache.snapshot().ct.len(), 3);

        let aided = run(
            &catalog,
            &mut engine,
            &cache,
            "AidedThreshold_NL2",
            json!({
                "AC": [40, 50, 60], "BC": [40, 50, 60], "dbOption": 0, "ACother": [40, 50, 60],
                "noOfAids": 1, "limiting": 0, "channels": 3, "direction": 0, "mic": 0
            }),
        )
        .unwrap();
        assert_eq!(aided["AT"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_aided_threshold_without_thresholds_is_missing_parameter() {
        let catalog = FunctionCatalog::standard();
        let cache = DerivedStateCache::new();
        let mut engine = ReferenceEngine::new();

        let err = run(
            &catalog,
            &mut engine,
            &cache,
            "AidedThreshold_NL2",
            json!({
                "AC": [40], "BC": [40], "dbOption": 0, "ACother": [40],
                "noOfAids": 1, "limiting": 0, "channels": 3, "direction": 0, "mic": 0
            }),
        )
        .unwrap_err();
        assert_eq!(err, CallError::MissingParameter("CT".to_string()));
    }
}
