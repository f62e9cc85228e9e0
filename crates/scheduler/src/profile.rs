//! A scheduling profile: the filter and picker one cycle runs.

use framework::{
    ConfigError, CycleState, Filter, LlmRequest, Picker, PluginRegistry, Pod, SchedulingContext,
};
use plugins::{PluginFactoryRegistry, SchedulerConfig, instantiate_plugins};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one scheduling cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingResult {
    pub request_id: String,
    /// Pods that survived filtering, in input order
    pub candidates: Vec<Pod>,
    /// Pod chosen by the picker; `None` if nothing survived or no picker is
    /// configured
    pub target: Option<Pod>,
}

/// Immutable set of plugins shared by every request until the next reload.
#[derive(Clone, Default)]
pub struct SchedulerProfile {
    filter: Option<Arc<dyn Filter>>,
    picker: Option<Arc<dyn Picker>>,
    registry: PluginRegistry,
}

impl SchedulerProfile {
    pub fn new(filter: Option<Arc<dyn Filter>>, picker: Option<Arc<dyn Picker>>) -> Self {
        Self {
            filter,
            picker,
            registry: PluginRegistry::new(),
        }
    }

    /// Instantiate every plugin of `config` and resolve the profile's
    /// filter and picker references.
    pub fn from_config(
        config: &SchedulerConfig,
        factories: &PluginFactoryRegistry,
    ) -> Result<Self, ConfigError> {
        let registry = instantiate_plugins(config, factories)?;
        let profile = &config.scheduling_profile;

        let filter = profile
            .filter
            .as_deref()
            .map(|name| registry.filter(name))
            .transpose()?;
        let picker = profile
            .picker
            .as_deref()
            .map(|name| registry.picker(name))
            .transpose()?;
        if picker.is_none() {
            warn!("Scheduling profile has no picker, requests will not get a target");
        }

        Ok(Self {
            filter,
            picker,
            registry,
        })
    }

    pub fn filter(&self) -> Option<&Arc<dyn Filter>> {
        self.filter.as_ref()
    }

    pub fn picker(&self) -> Option<&Arc<dyn Picker>> {
        self.picker.as_ref()
    }

    /// All plugins instantiated for this profile
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Run one cycle with a fresh `CycleState`.
    ///
    /// Without a filter every pod stays a candidate.
    pub fn run(&self, ctx: &SchedulingContext, request: &LlmRequest, pods: &[Pod]) -> SchedulingResult {
        let mut state = CycleState::new();

        let candidates = match &self.filter {
            Some(filter) => filter.filter(ctx, &mut state, request, pods),
            None => {
                debug!("No filter configured, keeping all {} pods", pods.len());
                pods.to_vec()
            }
        };

        let target = match &self.picker {
            Some(picker) if !candidates.is_empty() => {
                picker.pick(ctx, &mut state, request, &candidates)
            }
            _ => None,
        };

        SchedulingResult {
            request_id: request.request_id.clone(),
            candidates,
            target,
        }
    }
}

impl fmt::Debug for SchedulerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerProfile")
            .field("filter", &self.filter.as_ref().map(|p| p.name().to_string()))
            .field("picker", &self.picker.as_ref().map(|p| p.name().to_string()))
            .field("registry", &self.registry)
            .finish()
    }
}
