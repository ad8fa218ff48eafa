use super::StepId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComponentError {
    /// Fatal; raised during `start` and aborts the run before any message is handled.
    #[error("configuration error in step '{step}': {reason}")]
    Configuration { step: StepId, reason: String },

    #[error("step '{step}' exceeded its {what} capacity of {limit}")]
    CapacityExceeded {
        step: StepId,
        what: &'static str,
        limit: usize,
    },

    #[error("unknown step '{0}'")]
    UnknownStep(StepId),

    #[error("unknown component type '{0}'")]
    UnknownComponentType(String),

    #[error("invalid flow definition: {0}")]
    InvalidFlow(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

impl ComponentError {
    pub fn configuration(step: &StepId, reason: impl Into<String>) -> Self {
        ComponentError::Configuration {
            step: step.clone(),
            reason: reason.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ComponentError::Configuration { .. })
    }
}
