//! # Scheduler
//!
//! Runs scheduling cycles against the active profile:
//! 1. Take a snapshot of the current profile
//! 2. Filter the candidate pods (decision tree or any other filter)
//! 3. Pick a target among the survivors
//!
//! Reloading builds a complete new profile first and only then swaps it in.
//! Cycles that already took a snapshot finish on the old profile.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::{debug, info};

use framework::{LlmRequest, Pod, SchedulingContext};
use plugins::{PluginFactoryRegistry, SchedulerConfig};

use crate::profile::{SchedulerProfile, SchedulingResult};

/// Entry point for scheduling requests.
pub struct Scheduler {
    profile: RwLock<Arc<SchedulerProfile>>,
    factories: PluginFactoryRegistry,
}

impl Scheduler {
    /// Create a scheduler around an already built profile
    pub fn new(profile: SchedulerProfile) -> Self {
        Self {
            profile: RwLock::new(Arc::new(profile)),
            factories: PluginFactoryRegistry::with_defaults(),
        }
    }

    /// Build the initial profile from `config` with the default plugin types
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        Self::with_factories(config, PluginFactoryRegistry::with_defaults())
    }

    /// Build the initial profile from `config` with custom plugin types
    pub fn with_factories(config: &SchedulerConfig, factories: PluginFactoryRegistry) -> Result<Self> {
        let profile = SchedulerProfile::from_config(config, &factories)
            .context("Failed to build scheduling profile")?;
        info!("Scheduler ready with {} plugins", profile.registry().len());
        Ok(Self {
            profile: RwLock::new(Arc::new(profile)),
            factories,
        })
    }

    /// Load a JSON configuration file and build the scheduler from it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = SchedulerConfig::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_config(&config)
    }

    /// Current profile. Later reloads don't affect the returned snapshot.
    pub fn profile(&self) -> Arc<SchedulerProfile> {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the active profile with one built from `config`.
    ///
    /// On error the active profile is left untouched.
    pub fn reload(&self, config: &SchedulerConfig) -> Result<()> {
        let start = Instant::now();
        let profile = SchedulerProfile::from_config(config, &self.factories)
            .context("Failed to reload scheduling profile")?;
        let plugin_count = profile.registry().len();

        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(profile);
        info!(
            "Reloaded scheduling profile with {} plugins in {:.2?}",
            plugin_count,
            start.elapsed()
        );
        Ok(())
    }

    /// Schedule one request.
    ///
    /// Fails only if `ctx` was already cancelled; an empty candidate set is a
    /// regular result with no target.
    pub fn schedule(
        &self,
        ctx: &SchedulingContext,
        request: &LlmRequest,
        pods: &[Pod],
    ) -> Result<SchedulingResult> {
        if ctx.is_cancelled() {
            bail!("Request {} was cancelled before scheduling", request.request_id);
        }

        let profile = self.profile();
        let result = profile.run(ctx, request, pods);
        debug!(
            "Scheduled request {}: {} of {} pods remain, target {}",
            request.request_id,
            result.candidates.len(),
            pods.len(),
            result
                .target
                .as_ref()
                .map(|pod| pod.to_string())
                .unwrap_or_else(|| "<none>".to_string())
        );
        Ok(result)
    }

    /// Schedule many requests in parallel against the same pods.
    ///
    /// Every request gets its own context and cycle state; all of them see
    /// the profile that was active when the batch started.
    pub fn schedule_batch(&self, requests: &[LlmRequest], pods: &[Pod]) -> Vec<SchedulingResult> {
        let profile = self.profile();
        let start = Instant::now();

        let results: Vec<SchedulingResult> = requests
            .par_iter()
            .map(|request| profile.run(&SchedulingContext::new(), request, pods))
            .collect();

        info!(
            "Scheduled batch of {} requests in {:.2?}",
            results.len(),
            start.elapsed()
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framework::{PodInfo, PodMetrics};

    fn pods() -> Vec<Pod> {
        [("a", 3), ("b", 40), ("c", 1)]
            .into_iter()
            .map(|(name, queue)| {
                Pod::new(
                    PodInfo::new(name),
                    PodMetrics {
                        waiting_queue_size: queue,
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    fn config(threshold: usize) -> SchedulerConfig {
        SchedulerConfig::from_json_str(&format!(
            r#"{{
                "plugins": [
                    {{ "name": "low-queue", "type": "low-queue-filter",
                       "parameters": {{ "threshold": {threshold} }} }},
                    {{ "name": "least-queue", "type": "least-queue-filter" }},
                    {{ "name": "tree", "type": "decision-tree-filter", "parameters": {{
                        "current": {{ "reference": "low-queue" }},
                        "onFailure": {{ "reference": "least-queue" }} }} }},
                    {{ "name": "first", "type": "first-picker" }}
                ],
                "schedulingProfile": {{ "filter": "tree", "picker": "first" }}
            }}"#
        ))
        .unwrap()
    }

    fn names(pods: &[Pod]) -> Vec<&str> {
        pods.iter().map(Pod::name).collect()
    }

    #[test]
    fn test_schedule_filters_and_picks() {
        let scheduler = Scheduler::from_config(&config(5)).unwrap();
        let request = LlmRequest::new("r-1", "llama");

        let result = scheduler
            .schedule(&SchedulingContext::new(), &request, &pods())
            .unwrap();

        assert_eq!(result.request_id, "r-1");
        assert_eq!(names(&result.candidates), vec!["a", "c"]);
        assert_eq!(result.target.as_ref().map(Pod::name), Some("a"));
    }

    #[test]
    fn test_cancelled_request_is_rejected() {
        let scheduler = Scheduler::from_config(&config(5)).unwrap();
        let ctx = SchedulingContext::new();
        ctx.cancel();

        let result = scheduler.schedule(&ctx, &LlmRequest::new("r-1", "llama"), &pods());
        assert!(result.is_err());
    }

    #[test]
    fn test_reload_swaps_profile_but_not_snapshots() {
        let scheduler = Scheduler::from_config(&config(5)).unwrap();
        let before = scheduler.profile();

        scheduler.reload(&config(2)).unwrap();

        let request = LlmRequest::new("r-1", "llama");
        let old = before.run(&SchedulingContext::new(), &request, &pods());
        let new = scheduler
            .schedule(&SchedulingContext::new(), &request, &pods())
            .unwrap();

        assert_eq!(names(&old.candidates), vec!["a", "c"]);
        assert_eq!(names(&new.candidates), vec!["c"]);
        assert!(!Arc::ptr_eq(&before, &scheduler.profile()));
    }

    #[test]
    fn test_failed_reload_keeps_active_profile() {
        let scheduler = Scheduler::from_config(&config(5)).unwrap();
        let before = scheduler.profile();

        let mut broken = config(5);
        broken.scheduling_profile.filter = Some("missing".to_string());

        assert!(scheduler.reload(&broken).is_err());
        assert!(Arc::ptr_eq(&before, &scheduler.profile()));
    }

    #[test]
    fn test_schedule_batch_keeps_request_order() {
        let scheduler = Scheduler::from_config(&config(5)).unwrap();
        let requests: Vec<_> = (0..32)
            .map(|i| LlmRequest::new(format!("r-{i}"), "llama"))
            .collect();

        let results = scheduler.schedule_batch(&requests, &pods());

        assert_eq!(results.len(), 32);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.request_id, format!("r-{i}"));
            assert_eq!(names(&result.candidates), vec!["a", "c"]);
        }
    }
}
