//! Picker implementations: choose one target among the surviving pods.

pub mod first;
pub mod random;

pub use first::FirstPicker;
pub use random::RandomPicker;
