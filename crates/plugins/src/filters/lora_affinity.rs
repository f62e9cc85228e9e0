//! Filter that routes LoRA requests to pods able to serve the adapter.

use crate::factory::parse_parameters;
use framework::{CycleState, Filter, Handle, LlmRequest, Plugin, Pod, Result, SchedulingContext};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const LORA_AFFINITY_FILTER_TYPE: &str = "lora-affinity-filter";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoraAffinityParameters {}

/// Prefers pods that already have the requested adapter loaded.
///
/// ## Algorithm
/// 1. Pods with `request.target_model` among their active models win
/// 2. Otherwise, pods with room for one more adapter
/// 3. Otherwise nothing survives
pub struct LoraAffinityFilter {
    name: String,
}

impl LoraAffinityFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Plugin for LoraAffinityFilter {
    fn plugin_type(&self) -> &str {
        LORA_AFFINITY_FILTER_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_filter(self: Arc<Self>) -> Option<Arc<dyn Filter>> {
        Some(self)
    }
}

impl Filter for LoraAffinityFilter {
    fn filter(
        &self,
        _ctx: &SchedulingContext,
        _state: &mut CycleState,
        request: &LlmRequest,
        pods: &[Pod],
    ) -> Vec<Pod> {
        let (affinity, rest): (Vec<&Pod>, Vec<&Pod>) = pods
            .iter()
            .partition(|pod| pod.metrics().active_models.contains(&request.target_model));

        if !affinity.is_empty() {
            return affinity.into_iter().cloned().collect();
        }

        rest.into_iter()
            .filter(|pod| pod.metrics().active_models.len() < pod.metrics().max_active_models)
            .cloned()
            .collect()
    }
}

pub fn lora_affinity_filter_factory(
    name: &str,
    parameters: Option<&Value>,
    _handle: &dyn Handle,
) -> Result<Arc<dyn Plugin>> {
    let _: LoraAffinityParameters = parse_parameters(name, parameters)?;
    Ok(Arc::new(LoraAffinityFilter::new(name)))
}
