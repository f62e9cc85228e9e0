//! Filter that drops pods with a long waiting queue.

use crate::factory::parse_parameters;
use framework::{CycleState, Filter, Handle, LlmRequest, Plugin, Pod, Result, SchedulingContext};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const LOW_QUEUE_FILTER_TYPE: &str = "low-queue-filter";

/// Queue length above which a pod is considered saturated
pub const DEFAULT_QUEUE_THRESHOLD: usize = 128;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LowQueueParameters {
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

fn default_threshold() -> usize {
    DEFAULT_QUEUE_THRESHOLD
}

impl Default for LowQueueParameters {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_QUEUE_THRESHOLD,
        }
    }
}

/// Keeps pods whose waiting queue is at most `threshold`.
pub struct LowQueueFilter {
    name: String,
    threshold: usize,
}

impl LowQueueFilter {
    pub fn new(name: impl Into<String>, threshold: usize) -> Self {
        Self {
            name: name.into(),
            threshold,
        }
    }
}

impl Plugin for LowQueueFilter {
    fn plugin_type(&self) -> &str {
        LOW_QUEUE_FILTER_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_filter(self: Arc<Self>) -> Option<Arc<dyn Filter>> {
        Some(self)
    }
}

impl Filter for LowQueueFilter {
    fn filter(
        &self,
        _ctx: &SchedulingContext,
        _state: &mut CycleState,
        _request: &LlmRequest,
        pods: &[Pod],
    ) -> Vec<Pod> {
        pods.iter()
            .filter(|pod| pod.metrics().waiting_queue_size <= self.threshold)
            .cloned()
            .collect()
    }
}

pub fn low_queue_filter_factory(
    name: &str,
    parameters: Option<&Value>,
    _handle: &dyn Handle,
) -> Result<Arc<dyn Plugin>> {
    let parameters: LowQueueParameters = parse_parameters(name, parameters)?;
    Ok(Arc::new(LowQueueFilter::new(name, parameters.threshold)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use framework::{PluginRegistry, PodInfo, PodMetrics};
    use serde_json::json;

    fn pod(name: &str, queue: usize) -> Pod {
        Pod::new(
            PodInfo::new(name),
            PodMetrics {
                waiting_queue_size: queue,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_low_queue_filter() {
        let pods = vec![pod("a", 0), pod("b", 20), pod("c", 10), pod("d", 11)];
        let filter = LowQueueFilter::new("low-queue", 10);
        let request = LlmRequest::new("r-1", "llama");

        let filtered = filter.filter(&SchedulingContext::new(), &mut CycleState::new(), &request, &pods);

        let names: Vec<_> = filtered.iter().map(Pod::name).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_factory_defaults_threshold() {
        let registry = PluginRegistry::new();
        let plugin = low_queue_filter_factory("lq", None, &registry).unwrap();
        assert_eq!(plugin.name(), "lq");
        assert_eq!(plugin.plugin_type(), LOW_QUEUE_FILTER_TYPE);

        let params: LowQueueParameters = parse_parameters("lq", Some(&json!({}))).unwrap();
        assert_eq!(params.threshold, DEFAULT_QUEUE_THRESHOLD);
    }

    #[test]
    fn test_factory_rejects_bad_threshold() {
        let registry = PluginRegistry::new();
        let parameters = json!({ "threshold": "high" });
        assert!(low_queue_filter_factory("lq", Some(&parameters), &registry).is_err());
    }
}
