//! Filter that keeps the least loaded pods by waiting queue length.

use crate::factory::parse_parameters;
use framework::{CycleState, Filter, Handle, LlmRequest, Plugin, Pod, Result, SchedulingContext};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const LEAST_QUEUE_FILTER_TYPE: &str = "least-queue-filter";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeastQueueParameters {}

/// Keeps pods in the lowest bucket of queue lengths.
///
/// ## Algorithm
/// 1. Find the min and max waiting queue size among the pods
/// 2. Split the range into `pods.len()` buckets
/// 3. Keep pods whose queue falls in `[min, min + bucket]`
pub struct LeastQueueFilter {
    name: String,
}

impl LeastQueueFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Plugin for LeastQueueFilter {
    fn plugin_type(&self) -> &str {
        LEAST_QUEUE_FILTER_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_filter(self: Arc<Self>) -> Option<Arc<dyn Filter>> {
        Some(self)
    }
}

impl Filter for LeastQueueFilter {
    fn filter(
        &self,
        _ctx: &SchedulingContext,
        _state: &mut CycleState,
        _request: &LlmRequest,
        pods: &[Pod],
    ) -> Vec<Pod> {
        let queues = pods.iter().map(|pod| pod.metrics().waiting_queue_size);
        let (Some(min), Some(max)) = (queues.clone().min(), queues.max()) else {
            return Vec::new();
        };
        let upper = min + (max - min) / pods.len();

        pods.iter()
            .filter(|pod| pod.metrics().waiting_queue_size <= upper)
            .cloned()
            .collect()
    }
}

pub fn least_queue_filter_factory(
    name: &str,
    parameters: Option<&Value>,
    _handle: &dyn Handle,
) -> Result<Arc<dyn Plugin>> {
    let _: LeastQueueParameters = parse_parameters(name, parameters)?;
    Ok(Arc::new(LeastQueueFilter::new(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use framework::{PodInfo, PodMetrics};

    fn pod(name: &str, queue: usize) -> Pod {
        Pod::new(
            PodInfo::new(name),
            PodMetrics {
                waiting_queue_size: queue,
                ..Default::default()
            },
        )
    }

    fn run(pods: &[Pod]) -> Vec<String> {
        let request = LlmRequest::new("r-1", "llama");
        LeastQueueFilter::new("least-queue")
            .filter(&SchedulingContext::new(), &mut CycleState::new(), &request, pods)
            .iter()
            .map(|pod| pod.name().to_string())
            .collect()
    }

    #[test]
    fn test_keeps_lowest_bucket() {
        // min 0, max 30, 3 pods -> keep queue <= 10
        let pods = vec![pod("a", 30), pod("b", 0), pod("c", 10)];
        assert_eq!(run(&pods), vec!["b", "c"]);
    }

    #[test]
    fn test_uniform_queues_keep_everything() {
        let pods = vec![pod("a", 5), pod("b", 5)];
        assert_eq!(run(&pods), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(run(&[]).is_empty());
    }
}
