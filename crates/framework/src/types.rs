//! Core domain types shared by every scheduling plugin.
//!
//! This module defines the request, the candidate pods, the per-request
//! scratch state and the cancellation context that filters receive.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

// =============================================================================
// Pods
// =============================================================================

/// Identity of a model server pod.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodInfo {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub address: String,
}

impl PodInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            address: String::new(),
        }
    }
}

/// Most recent metrics scraped from a model server pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodMetrics {
    /// Requests waiting in the model server queue
    pub waiting_queue_size: usize,
    /// KV-cache utilisation in the range [0.0, 1.0]
    pub kv_cache_usage_percent: f64,
    /// LoRA adapters currently loaded on the pod
    pub active_models: HashSet<String>,
    /// How many adapters the pod can hold at once
    pub max_active_models: usize,
}

/// A candidate backend for a request.
///
/// Both halves sit behind an `Arc`, so cloning a pod while narrowing a
/// candidate set never copies metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Pod {
    info: Arc<PodInfo>,
    metrics: Arc<PodMetrics>,
}

impl Pod {
    pub fn new(info: PodInfo, metrics: PodMetrics) -> Self {
        Self {
            info: Arc::new(info),
            metrics: Arc::new(metrics),
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &PodInfo {
        &self.info
    }

    pub fn metrics(&self) -> &PodMetrics {
        &self.metrics
    }
}

impl fmt::Display for Pod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.info.namespace.is_empty() {
            write!(f, "{}", self.info.name)
        } else {
            write!(f, "{}/{}", self.info.namespace, self.info.name)
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// An inference request waiting to be routed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRequest {
    pub request_id: String,
    /// Base model or LoRA adapter the request targets
    pub target_model: String,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl LlmRequest {
    pub fn new(request_id: impl Into<String>, target_model: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            target_model: target_model.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Per-request state
// =============================================================================

/// Scratch space threaded through every plugin invocation of one
/// scheduling cycle.
///
/// The decision tree never looks inside; it only forwards the `&mut` borrow.
/// A fresh `CycleState` must be created for each request.
#[derive(Default)]
pub struct CycleState {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing whatever was there.
    pub fn write<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Read a value back; `None` if absent or stored with another type.
    pub fn read<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref::<T>()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleState")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Cancellation and deadline carrier for one scheduling cycle.
///
/// Clones share the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct SchedulingContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl SchedulingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once `cancel` was called on any clone or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cycle_state_typed_access() {
        let mut state = CycleState::new();
        state.write("prefix-hits", 3usize);

        assert_eq!(state.read::<usize>("prefix-hits"), Some(&3));
        assert_eq!(state.read::<String>("prefix-hits"), None);
        assert_eq!(state.read::<usize>("missing"), None);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = SchedulingContext::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());

        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_expired_deadline_counts_as_cancelled() {
        let past = Instant::now() - Duration::from_millis(1);
        let ctx = SchedulingContext::new().with_deadline(past);
        assert!(ctx.is_cancelled());

        let future = Instant::now() + Duration::from_secs(60);
        let ctx = SchedulingContext::new().with_deadline(future);
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_pod_display_includes_namespace() {
        let mut info = PodInfo::new("vllm-0");
        let pod = Pod::new(info.clone(), PodMetrics::default());
        assert_eq!(pod.to_string(), "vllm-0");

        info.namespace = "serving".to_string();
        let pod = Pod::new(info, PodMetrics::default());
        assert_eq!(pod.to_string(), "serving/vllm-0");
    }
}
