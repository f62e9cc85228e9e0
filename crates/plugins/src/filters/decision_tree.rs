//! Decision tree filter: chains filters into a flow chart.
//!
//! A tree applies its `current` filter, then hands over to one successor
//! depending on whether anything survived:
//!
//! | outcome   | successor                      | successor input       |
//! |-----------|--------------------------------|-----------------------|
//! | non-empty | `on_success`, else `on_either` | the filtered pods     |
//! | empty     | `on_failure`, else `on_either` | the original pods     |
//!
//! With no successor for the outcome, the filtered pods are returned as-is.
//! A tree is itself a [`Filter`], so trees nest and can be registered under a
//! name and referenced from other trees.
//!
//! ## Configuration
//! ```json
//! {
//!   "current": { "reference": "low-queue" },
//!   "onSuccess": { "decisionTree": {
//!       "current": { "reference": "lora-affinity" },
//!       "onFailure": { "reference": "least-kv-cache" } } },
//!   "onFailure": { "reference": "least-queue" }
//! }
//! ```
//! `nextOnSuccess`, `nextOnFailure`, `nextOnSuccessOrFailure` and `pluginRef`
//! are accepted as aliases.

use crate::factory::parse_parameters;
use framework::{
    ConfigError, CycleState, Filter, Handle, LlmRequest, Plugin, Pod, Result, SchedulingContext,
    resolve_filter,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

pub const DECISION_TREE_FILTER_TYPE: &str = "decision-tree-filter";

// =============================================================================
// Declarative form
// =============================================================================

/// Unresolved form of a [`DecisionTreeFilter`], as read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DecisionTreeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<TreeEntry>,
    #[serde(default, alias = "nextOnSuccess", skip_serializing_if = "Option::is_none")]
    pub on_success: Option<TreeEntry>,
    #[serde(default, alias = "nextOnFailure", skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<TreeEntry>,
    #[serde(
        default,
        alias = "nextOnSuccessOrFailure",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_either: Option<TreeEntry>,
}

impl DecisionTreeSpec {
    pub fn new(current: TreeEntry) -> Self {
        Self {
            current: Some(current),
            ..Default::default()
        }
    }

    pub fn on_success(mut self, entry: TreeEntry) -> Self {
        self.on_success = Some(entry);
        self
    }

    pub fn on_failure(mut self, entry: TreeEntry) -> Self {
        self.on_failure = Some(entry);
        self
    }

    pub fn on_either(mut self, entry: TreeEntry) -> Self {
        self.on_either = Some(entry);
        self
    }
}

/// One slot of a tree: a named filter or an inline sub-tree, exactly one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreeEntry {
    #[serde(default, alias = "pluginRef", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_tree: Option<Box<DecisionTreeSpec>>,
}

impl TreeEntry {
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            reference: Some(name.into()),
            decision_tree: None,
        }
    }

    pub fn tree(spec: DecisionTreeSpec) -> Self {
        Self {
            reference: None,
            decision_tree: Some(Box::new(spec)),
        }
    }
}

// =============================================================================
// Built tree
// =============================================================================

/// Whether the current filter left anything behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn of(filtered: &[Pod]) -> Self {
        if filtered.is_empty() {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}

/// A resolved, immutable decision tree node.
#[derive(Clone)]
pub struct DecisionTreeFilter {
    name: Option<String>,
    current: Arc<dyn Filter>,
    on_success: Option<Arc<dyn Filter>>,
    on_failure: Option<Arc<dyn Filter>>,
    on_either: Option<Arc<dyn Filter>>,
}

impl DecisionTreeFilter {
    /// A tree that only applies `current`.
    pub fn new(current: Arc<dyn Filter>) -> Self {
        Self {
            name: None,
            current,
            on_success: None,
            on_failure: None,
            on_either: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn on_success(mut self, next: Arc<dyn Filter>) -> Self {
        self.on_success = Some(next);
        self
    }

    pub fn on_failure(mut self, next: Arc<dyn Filter>) -> Self {
        self.on_failure = Some(next);
        self
    }

    pub fn on_either(mut self, next: Arc<dyn Filter>) -> Self {
        self.on_either = Some(next);
        self
    }

    /// Resolve `spec` into a tree, looking references up through `handle`.
    ///
    /// Fails on the first structural problem; nothing partially built is
    /// returned.
    pub fn build(spec: &DecisionTreeSpec, handle: &dyn Handle) -> Result<Self> {
        TreeBuilder::new(handle).build(spec)
    }

    /// Like [`build`](Self::build), for a tree being registered as `name`.
    ///
    /// A reference back to `name` anywhere inside the tree is rejected with
    /// [`ConfigError::CyclicReference`].
    pub fn build_named(name: &str, spec: &DecisionTreeSpec, handle: &dyn Handle) -> Result<Self> {
        let tree = TreeBuilder::new(handle).within(name).build(spec)?;
        Ok(tree.with_name(name))
    }

    pub fn current(&self) -> &Arc<dyn Filter> {
        &self.current
    }

    /// The successor to run for `outcome`, if any.
    ///
    /// The outcome-specific slot always wins over `on_either`.
    pub fn successor(&self, outcome: Outcome) -> Option<&Arc<dyn Filter>> {
        match outcome {
            Outcome::Success => self.on_success.as_ref().or(self.on_either.as_ref()),
            Outcome::Failure => self.on_failure.as_ref().or(self.on_either.as_ref()),
        }
    }
}

impl fmt::Debug for DecisionTreeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = |next: &Option<Arc<dyn Filter>>| next.as_ref().map(|n| n.name().to_string());
        f.debug_struct("DecisionTreeFilter")
            .field("name", &self.name())
            .field("current", &self.current.name())
            .field("on_success", &slot(&self.on_success))
            .field("on_failure", &slot(&self.on_failure))
            .field("on_either", &slot(&self.on_either))
            .finish()
    }
}

impl Plugin for DecisionTreeFilter {
    fn plugin_type(&self) -> &str {
        DECISION_TREE_FILTER_TYPE
    }

    /// The registered name, or the name of `current` for inline sub-trees.
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.current.name())
    }

    fn as_filter(self: Arc<Self>) -> Option<Arc<dyn Filter>> {
        Some(self)
    }
}

impl Filter for DecisionTreeFilter {
    fn filter(
        &self,
        ctx: &SchedulingContext,
        state: &mut CycleState,
        request: &LlmRequest,
        pods: &[Pod],
    ) -> Vec<Pod> {
        let filtered = self.current.filter(ctx, state, request, pods);
        let outcome = Outcome::of(&filtered);

        let Some(next) = self.successor(outcome) else {
            // No succeeding filter for this outcome
            return filtered;
        };

        match outcome {
            Outcome::Success => {
                trace!(
                    filter = self.current.plugin_type(),
                    plugin = self.current.name(),
                    next = next.name(),
                    filtered_pod_count = filtered.len(),
                    "Filter succeeded"
                );
                next.filter(ctx, state, request, &filtered)
            }
            Outcome::Failure => {
                trace!(
                    filter = self.current.plugin_type(),
                    plugin = self.current.name(),
                    next = next.name(),
                    input_pod_count = pods.len(),
                    "Filter failed"
                );
                // Retry the full input under the next criterion
                next.filter(ctx, state, request, pods)
            }
        }
    }
}

/// Evaluate an optional tree; no tree means no surviving pods.
pub fn evaluate(
    tree: Option<&DecisionTreeFilter>,
    ctx: &SchedulingContext,
    state: &mut CycleState,
    request: &LlmRequest,
    pods: &[Pod],
) -> Vec<Pod> {
    match tree {
        Some(tree) => tree.filter(ctx, state, request, pods),
        None => Vec::new(),
    }
}

// =============================================================================
// Builder
// =============================================================================

struct TreeBuilder<'a> {
    handle: &'a dyn Handle,
    /// Names of plugins whose construction is in progress
    ancestry: Vec<String>,
}

impl<'a> TreeBuilder<'a> {
    fn new(handle: &'a dyn Handle) -> Self {
        Self {
            handle,
            ancestry: Vec::new(),
        }
    }

    fn within(mut self, name: &str) -> Self {
        self.ancestry.push(name.to_string());
        self
    }

    fn build(&self, spec: &DecisionTreeSpec) -> Result<DecisionTreeFilter> {
        let current = spec.current.as_ref().ok_or(ConfigError::MissingCurrent)?;
        let mut tree = DecisionTreeFilter::new(self.entry(current)?);
        tree.on_success = self.optional(spec.on_success.as_ref())?;
        tree.on_failure = self.optional(spec.on_failure.as_ref())?;
        tree.on_either = self.optional(spec.on_either.as_ref())?;
        Ok(tree)
    }

    fn optional(&self, entry: Option<&TreeEntry>) -> Result<Option<Arc<dyn Filter>>> {
        entry.map(|entry| self.entry(entry)).transpose()
    }

    fn entry(&self, entry: &TreeEntry) -> Result<Arc<dyn Filter>> {
        match (&entry.reference, &entry.decision_tree) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousEntry),
            (Some(name), None) => {
                if self.ancestry.iter().any(|ancestor| ancestor == name) {
                    return Err(ConfigError::CyclicReference(name.clone()));
                }
                resolve_filter(self.handle, name)
            }
            (None, Some(nested)) => Ok(Arc::new(self.build(nested)?)),
            (None, None) => Err(ConfigError::EmptyEntry),
        }
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Build a named decision tree from its JSON parameters.
pub fn decision_tree_filter_factory(
    name: &str,
    parameters: Option<&Value>,
    handle: &dyn Handle,
) -> Result<Arc<dyn Plugin>> {
    let spec: DecisionTreeSpec = parse_parameters(name, parameters)?;
    Ok(Arc::new(DecisionTreeFilter::build_named(name, &spec, handle)?))
}
