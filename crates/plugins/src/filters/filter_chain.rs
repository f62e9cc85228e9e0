//! The FilterChain runs several filters one after another.
//!
//! Unlike a decision tree, a chain has no branching: each stage narrows the
//! output of the previous one, and the chain stops as soon as nothing is left.

use crate::factory::parse_parameters;
use framework::{
    CycleState, Filter, Handle, LlmRequest, Plugin, Pod, Result, SchedulingContext,
    resolve_filter,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const FILTER_CHAIN_TYPE: &str = "filter-chain";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterChainParameters {
    /// Names of previously declared filters, in application order
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Chains multiple filters together.
///
/// ## Usage
/// ```ignore
/// let chain = FilterChain::new("default")
///     .add_filter(Arc::new(LowQueueFilter::new("low-queue", 128)))
///     .add_filter(Arc::new(LeastKvCacheFilter::new("least-kv-cache")));
///
/// let survivors = chain.filter(&ctx, &mut state, &request, &pods);
/// ```
pub struct FilterChain {
    name: String,
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    /// Create a new empty FilterChain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters: Vec::new(),
        }
    }

    /// Add a filter to the chain (builder pattern).
    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Plugin for FilterChain {
    fn plugin_type(&self) -> &str {
        FILTER_CHAIN_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_filter(self: Arc<Self>) -> Option<Arc<dyn Filter>> {
        Some(self)
    }
}

impl Filter for FilterChain {
    fn filter(
        &self,
        ctx: &SchedulingContext,
        state: &mut CycleState,
        request: &LlmRequest,
        pods: &[Pod],
    ) -> Vec<Pod> {
        let mut current = pods.to_vec();
        for filter in &self.filters {
            if current.is_empty() {
                break;
            }
            tracing::debug!(
                "Applying filter: {} (input count: {})",
                filter.name(),
                current.len()
            );
            current = filter.filter(ctx, state, request, &current);
            tracing::debug!(
                "Filter applied: {} (output count: {})",
                filter.name(),
                current.len()
            );
        }
        current
    }
}

pub fn filter_chain_factory(
    name: &str,
    parameters: Option<&Value>,
    handle: &dyn Handle,
) -> Result<Arc<dyn Plugin>> {
    let parameters: FilterChainParameters = parse_parameters(name, parameters)?;
    let mut chain = FilterChain::new(name);
    for reference in &parameters.filters {
        chain = chain.add_filter(resolve_filter(handle, reference)?);
    }
    Ok(Arc::new(chain))
}
