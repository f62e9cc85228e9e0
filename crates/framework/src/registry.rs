//! Named plugin instances.
//!
//! Plugins are registered once, in declaration order, while a configuration
//! is loaded. Afterwards the registry is only read.

use crate::error::{ConfigError, Result};
use crate::plugin::{Filter, Picker, Plugin};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Read-only lookup of plugins by name, handed to plugin factories.
pub trait Handle {
    fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>>;
}

/// Plugins by name, remembering registration order.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
    order: Vec<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` under `name`. Names are unique.
    pub fn register(&mut self, name: impl Into<String>, plugin: Arc<dyn Plugin>) -> Result<()> {
        let name = name.into();
        if self.plugins.contains_key(&name) {
            return Err(ConfigError::DuplicatePlugin(name));
        }
        self.order.push(name.clone());
        self.plugins.insert(name, plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(name)
    }

    /// Resolve `name` to a filter.
    pub fn filter(&self, name: &str) -> Result<Arc<dyn Filter>> {
        resolve_filter(self, name)
    }

    /// Resolve `name` to a picker.
    pub fn picker(&self, name: &str) -> Result<Arc<dyn Picker>> {
        self.plugin(name)
            .ok_or_else(|| ConfigError::UndefinedReference(name.to_string()))?
            .as_picker()
            .ok_or_else(|| ConfigError::NotAPicker(name.to_string()))
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Handle for PluginRegistry {
    fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.order)
            .finish()
    }
}

/// Look `name` up through `handle` and require the filter capability.
pub fn resolve_filter(handle: &dyn Handle, name: &str) -> Result<Arc<dyn Filter>> {
    handle
        .plugin(name)
        .ok_or_else(|| ConfigError::UndefinedReference(name.to_string()))?
        .as_filter()
        .ok_or_else(|| ConfigError::NotAFilter(name.to_string()))
}
