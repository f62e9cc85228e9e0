//! Plugin factories: turn a `type` name plus JSON parameters into an instance.

use crate::filters::decision_tree::{DECISION_TREE_FILTER_TYPE, decision_tree_filter_factory};
use crate::filters::filter_chain::{FILTER_CHAIN_TYPE, filter_chain_factory};
use crate::filters::least_kv_cache::{LEAST_KV_CACHE_FILTER_TYPE, least_kv_cache_filter_factory};
use crate::filters::least_queue::{LEAST_QUEUE_FILTER_TYPE, least_queue_filter_factory};
use crate::filters::lora_affinity::{LORA_AFFINITY_FILTER_TYPE, lora_affinity_filter_factory};
use crate::filters::low_queue::{LOW_QUEUE_FILTER_TYPE, low_queue_filter_factory};
use crate::pickers::first::{FIRST_PICKER_TYPE, first_picker_factory};
use crate::pickers::random::{RANDOM_PICKER_TYPE, random_picker_factory};
use framework::{ConfigError, Handle, Plugin, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a plugin named `name` from its raw parameters.
///
/// `handle` gives access to the plugins declared before this one.
pub type PluginFactory = fn(&str, Option<&Value>, &dyn Handle) -> Result<Arc<dyn Plugin>>;

/// Factories by plugin type.
#[derive(Clone)]
pub struct PluginFactoryRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginFactoryRegistry {
    /// A registry without any plugin type.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with every plugin type shipped in this crate.
    pub fn with_defaults() -> Self {
        Self::empty()
            .with_factory(DECISION_TREE_FILTER_TYPE, decision_tree_filter_factory)
            .with_factory(FILTER_CHAIN_TYPE, filter_chain_factory)
            .with_factory(LOW_QUEUE_FILTER_TYPE, low_queue_filter_factory)
            .with_factory(LEAST_QUEUE_FILTER_TYPE, least_queue_filter_factory)
            .with_factory(LEAST_KV_CACHE_FILTER_TYPE, least_kv_cache_filter_factory)
            .with_factory(LORA_AFFINITY_FILTER_TYPE, lora_affinity_filter_factory)
            .with_factory(FIRST_PICKER_TYPE, first_picker_factory)
            .with_factory(RANDOM_PICKER_TYPE, random_picker_factory)
    }

    /// Register (or replace) the factory for `plugin_type`.
    pub fn with_factory(mut self, plugin_type: impl Into<String>, factory: PluginFactory) -> Self {
        self.factories.insert(plugin_type.into(), factory);
        self
    }

    pub fn contains(&self, plugin_type: &str) -> bool {
        self.factories.contains_key(plugin_type)
    }

    /// Instantiate one plugin of type `plugin_type`.
    pub fn instantiate(
        &self,
        name: &str,
        plugin_type: &str,
        parameters: Option<&Value>,
        handle: &dyn Handle,
    ) -> Result<Arc<dyn Plugin>> {
        let factory =
            self.factories
                .get(plugin_type)
                .ok_or_else(|| ConfigError::UnknownPluginType {
                    name: name.to_string(),
                    plugin_type: plugin_type.to_string(),
                })?;
        factory(name, parameters, handle)
    }
}

impl Default for PluginFactoryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for PluginFactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.factories.keys().collect();
        types.sort();
        f.debug_struct("PluginFactoryRegistry")
            .field("types", &types)
            .finish()
    }
}

/// Deserialize plugin parameters, falling back to `T::default()` when the
/// plugin was declared without any.
pub fn parse_parameters<T>(name: &str, parameters: Option<&Value>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match parameters {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|source| ConfigError::InvalidParameters {
                name: name.to_string(),
                source,
            })
        }
    }
}
