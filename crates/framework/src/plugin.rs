//! Core traits for scheduling plugins.
//!
//! A plugin is anything that can be named in a configuration file. What it
//! can *do* is exposed through capability accessors, so a registry lookup can
//! tell a filter apart from a picker without knowing the concrete type.

use crate::types::{CycleState, LlmRequest, Pod, SchedulingContext};
use std::sync::Arc;

/// Common surface of every plugin.
///
/// ## Design Note
/// - `Send + Sync` allows one instance to serve concurrent requests
/// - The capability accessors take `Arc<Self>` so a plugin can hand out a
///   shared handle to itself under the narrower trait
pub trait Plugin: Send + Sync {
    /// Plugin type, as used in the `type` field of the configuration
    fn plugin_type(&self) -> &str;

    /// Instance name (for logging/debugging and references)
    fn name(&self) -> &str;

    /// This plugin as a filter, if it is one.
    fn as_filter(self: Arc<Self>) -> Option<Arc<dyn Filter>> {
        None
    }

    /// This plugin as a picker, if it is one.
    fn as_picker(self: Arc<Self>) -> Option<Arc<dyn Picker>> {
        None
    }
}

/// Narrows a candidate set for a request.
pub trait Filter: Plugin {
    /// Return the pods from `pods` that satisfy this filter.
    ///
    /// Implementations only remove pods; survivors keep their input order.
    /// `ctx` and `state` belong to the current request and are forwarded
    /// as-is to any nested filter.
    fn filter(
        &self,
        ctx: &SchedulingContext,
        state: &mut CycleState,
        request: &LlmRequest,
        pods: &[Pod],
    ) -> Vec<Pod>;
}

/// Chooses the final target among the pods that survived filtering.
pub trait Picker: Plugin {
    fn pick(
        &self,
        ctx: &SchedulingContext,
        state: &mut CycleState,
        request: &LlmRequest,
        pods: &[Pod],
    ) -> Option<Pod>;
}
