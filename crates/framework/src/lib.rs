//! # Framework Crate
//!
//! Shared vocabulary of the scheduler: the types a scheduling cycle works on
//! and the plugin traits every filter and picker implements.
//!
//! ## Main Components
//!
//! - **types**: Pods, requests, per-request state, cancellation context
//! - **plugin**: `Plugin`, `Filter` and `Picker` traits
//! - **registry**: Named plugin instances and the `Handle` lookup trait
//! - **parser**: JSON loaders for pods and requests
//! - **error**: Configuration error types
//!
//! ## Example Usage
//!
//! ```ignore
//! use framework::{CycleState, LlmRequest, PluginRegistry, SchedulingContext};
//!
//! let filter = registry.filter("low-queue")?;
//! let mut state = CycleState::new();
//! let request = LlmRequest::new("r-1", "llama-3");
//! let survivors = filter.filter(&SchedulingContext::new(), &mut state, &request, &pods);
//! ```

// Public modules
pub mod error;
pub mod parser;
pub mod plugin;
pub mod registry;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{ConfigError, Result};
pub use plugin::{Filter, Picker, Plugin};
pub use registry::{Handle, PluginRegistry, resolve_filter};
pub use types::{CycleState, LlmRequest, Pod, PodInfo, PodMetrics, SchedulingContext};
