//! Deterministic picker, mostly useful for tests and dry runs.

use crate::factory::parse_parameters;
use framework::{CycleState, Handle, LlmRequest, Picker, Plugin, Pod, Result, SchedulingContext};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const FIRST_PICKER_TYPE: &str = "first-picker";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirstPickerParameters {}

/// Picks the first surviving pod.
pub struct FirstPicker {
    name: String,
}

impl FirstPicker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Plugin for FirstPicker {
    fn plugin_type(&self) -> &str {
        FIRST_PICKER_TYPE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_picker(self: Arc<Self>) -> Option<Arc<dyn Picker>> {
        Some(self)
    }
}

impl Picker for FirstPicker {
    fn pick(
        &self,
        _ctx: &SchedulingContext,
        _state: &mut CycleState,
        _request: &LlmRequest,
        pods: &[Pod],
    ) -> Option<Pod> {
        pods.first().cloned()
    }
}

pub fn first_picker_factory(
    name: &str,
    parameters: Option<&Value>,
    _handle: &dyn Handle,
) -> Result<Arc<dyn Plugin>> {
    let _: FirstPickerParameters = parse_parameters(name, parameters)?;
    Ok(Arc::new(FirstPicker::new(name)))
}
