//! Filter implementations.
//!
//! The decision tree composes the other filters; the rest are leaf criteria
//! over pod metrics.

pub mod decision_tree;
pub mod filter_chain;
pub mod least_kv_cache;
pub mod least_queue;
pub mod lora_affinity;
pub mod low_queue;

// Re-export for convenience
pub use decision_tree::{DecisionTreeFilter, DecisionTreeSpec, Outcome, TreeEntry};
pub use filter_chain::FilterChain;
pub use least_kv_cache::LeastKvCacheFilter;
pub use least_queue::LeastQueueFilter;
pub use lora_affinity::LoraAffinityFilter;
pub use low_queue::LowQueueFilter;
