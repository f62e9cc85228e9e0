//! Filter that keeps the pods with the most free KV-cache.

use crate::factory::parse_parameters;
use framework::{CycleState, Filter, Handle, LlmRequest, Plugin, Pod, Result, SchedulingContext};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const LEAST_KV_CACHE_FILTER_TYPE: &str = "least-kv-cache-filter";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeastKvCacheParameters {}

/// Keeps pods in the lowest bucket of KV-cache utilisation, using the same
/// bucketing as [`LeastQueueFilter`](super::LeastQueueFilter).
pub struct LeastKvCacheFilter {
    name: String,
}

impl LeastKvCacheFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Plugin for LeastKvCacheFilter {
    fn plugin_type(&self) -> &str {
        LEAST_KV_CACHE_FILTER_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_filter(self: Arc<Self>) -> Option<Arc<dyn Filter>> {
        Some(self)
    }
}

impl Filter for LeastKvCacheFilter {
    fn filter(
        &self,
        _ctx: &SchedulingContext,
        _state: &mut CycleState,
        _request: &LlmRequest,
        pods: &[Pod],
    ) -> Vec<Pod> {
        if pods.is_empty() {
            return Vec::new();
        }
        let (min, max) = pods
            .iter()
            .map(|pod| pod.metrics().kv_cache_usage_percent)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), usage| {
                (min.min(usage), max.max(usage))
            });
        let upper = min + (max - min) / pods.len() as f64;

        pods.iter()
            .filter(|pod| pod.metrics().kv_cache_usage_percent <= upper)
            .cloned()
            .collect()
    }
}

pub fn least_kv_cache_filter_factory(
    name: &str,
    parameters: Option<&Value>,
    _handle: &dyn Handle,
) -> Result<Arc<dyn Plugin>> {
    let _: LeastKvCacheParameters = parse_parameters(name, parameters)?;
    Ok(Arc::new(LeastKvCacheFilter::new(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use framework::{PodInfo, PodMetrics};

    fn pod(name: &str, usage: f64) -> Pod {
        Pod::new(
            PodInfo::new(name),
            PodMetrics {
                kv_cache_usage_percent: usage,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_keeps_least_utilised_bucket() {
        // min 0.0, max 0.9, 3 pods -> keep usage <= 0.3
        let pods = vec![pod("a", 0.9), pod("b", 0.25), pod("c", 0.0)];
        let request = LlmRequest::new("r-1", "llama");

        let filtered = LeastKvCacheFilter::new("kv").filter(
            &SchedulingContext::new(),
            &mut CycleState::new(),
            &request,
            &pods,
        );

        let names: Vec<_> = filtered.iter().map(Pod::name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
