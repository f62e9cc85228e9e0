//! Scheduler configuration document.
//!
//! ```json
//! {
//!   "plugins": [
//!     { "name": "low-queue", "type": "low-queue-filter", "parameters": { "threshold": 16 } },
//!     { "name": "routing", "type": "decision-tree-filter",
//!       "parameters": { "current": { "reference": "low-queue" } } },
//!     { "name": "picker", "type": "random-picker" }
//!   ],
//!   "schedulingProfile": { "filter": "routing", "picker": "picker" }
//! }
//! ```
//!
//! Plugins are built in declaration order, so a plugin may only reference
//! plugins declared above it.

use crate::factory::PluginFactoryRegistry;
use framework::{ConfigError, PluginRegistry, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
    #[serde(default)]
    pub scheduling_profile: ProfileSpec,
}

/// One plugin instance to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Which plugins a scheduling cycle runs. Both are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picker: Option<String>,
}

impl SchedulerConfig {
    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        debug!(
            "Read scheduler config from {} ({} plugins)",
            path.display(),
            config.plugins.len()
        );
        Ok(config)
    }
}

/// Instantiate every plugin of `config`, in order.
///
/// Each plugin sees the ones registered before it. The first failure aborts
/// the whole load and is reported with the offending plugin's name.
pub fn instantiate_plugins(
    config: &SchedulerConfig,
    factories: &PluginFactoryRegistry,
) -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    for spec in &config.plugins {
        let plugin = factories
            .instantiate(
                &spec.name,
                &spec.plugin_type,
                spec.parameters.as_ref(),
                &registry,
            )
            .map_err(|source| ConfigError::Plugin {
                name: spec.name.clone(),
                source: Box::new(source),
            })?;
        registry.register(spec.name.clone(), plugin)?;
        debug!("Instantiated plugin {} ({})", spec.name, spec.plugin_type);
    }
    info!("Instantiated {} plugins", registry.len());
    Ok(registry)
}
