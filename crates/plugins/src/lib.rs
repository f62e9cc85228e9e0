//! Scheduling plugins: filters, pickers and the factories that build them.
//!
//! This crate provides:
//! - `DecisionTreeFilter` for composing filters into a flow chart
//! - `FilterChain` for plain sequential composition
//! - Leaf filters over pod metrics (queue length, KV-cache, LoRA affinity)
//! - Pickers that choose the final target
//! - `PluginFactoryRegistry` and `instantiate_plugins` for building all of
//!   the above from a JSON configuration
//!
//! ## Example Usage
//! ```ignore
//! use plugins::{instantiate_plugins, PluginFactoryRegistry, SchedulerConfig};
//!
//! let config = SchedulerConfig::load("config/scheduler.json")?;
//! let registry = instantiate_plugins(&config, &PluginFactoryRegistry::with_defaults())?;
//! let routing = registry.filter("routing")?;
//!
//! let survivors = routing.filter(&ctx, &mut CycleState::new(), &request, &pods);
//! ```

pub mod config;
pub mod factory;
pub mod filters;
pub mod pickers;

// Re-export main types
pub use config::{PluginSpec, ProfileSpec, SchedulerConfig, instantiate_plugins};
pub use factory::{PluginFactory, PluginFactoryRegistry, parse_parameters};
pub use filters::{DecisionTreeFilter, DecisionTreeSpec, FilterChain, Outcome, TreeEntry};
pub use pickers::{FirstPicker, RandomPicker};
