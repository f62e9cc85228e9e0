//! Picker choosing uniformly at random among the surviving pods.

use crate::factory::parse_parameters;
use framework::{CycleState, Handle, LlmRequest, Picker, Plugin, Pod, Result, SchedulingContext};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

pub const RANDOM_PICKER_TYPE: &str = "random-picker";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RandomPickerParameters {
    /// Fixed seed for reproducible picks
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Picks a random surviving pod.
///
/// Unseeded pickers draw from the thread-local generator; seeded ones share a
/// single `StdRng` behind a mutex so the sequence is reproducible.
pub struct RandomPicker {
    name: String,
    seeded: Option<Mutex<StdRng>>,
}

impl RandomPicker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seeded: None,
        }
    }

    pub fn with_seed(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Plugin for RandomPicker {
    fn plugin_type(&self) -> &str {
        RANDOM_PICKER_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_picker(self: Arc<Self>) -> Option<Arc<dyn Picker>> {
        Some(self)
    }
}

impl Picker for RandomPicker {
    fn pick(
        &self,
        _ctx: &SchedulingContext,
        _state: &mut CycleState,
        _request: &LlmRequest,
        pods: &[Pod],
    ) -> Option<Pod> {
        match &self.seeded {
            Some(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                pods.choose(&mut *rng).cloned()
            }
            None => pods.choose(&mut rand::rng()).cloned(),
        }
    }
}

pub fn random_picker_factory(
    name: &str,
    parameters: Option<&Value>,
    _handle: &dyn Handle,
) -> Result<Arc<dyn Plugin>> {
    let parameters: RandomPickerParameters = parse_parameters(name, parameters)?;
    let picker = match parameters.seed {
        Some(seed) => RandomPicker::with_seed(name, seed),
        None => RandomPicker::new(name),
    };
    Ok(Arc::new(picker))
}
