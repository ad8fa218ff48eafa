use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Flow run states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Idle,
    Starting,
    Running {
        #[serde(skip)]
        start_time: Option<Instant>,
    },
    Completed {
        #[serde(skip)]
        duration: Option<Duration>,
    },
    Failed {
        error_msg: String,
    },
}

impl FlowState {
    /// Whether a flow in this state may move to `target`.
    pub fn can_transition_to(&self, target: &FlowState) -> bool {
        use FlowState::*;

        matches!(
            (self, target),
            // From Idle
            (Idle, Starting) |

            // From Starting
            (Starting, Running { .. }) |
            (Starting, Failed { .. }) |

            // From Running
            (Running { .. }, Completed { .. }) |
            (Running { .. }, Failed { .. }) |

            // Back to Idle for another run
            (Completed { .. }, Idle) |
            (Failed { .. }, Idle)
        )
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting",
            Self::Running { .. } => "Running",
            Self::Completed { .. } => "Completed",
            Self::Failed { .. } => "Failed",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

impl Default for FlowState {
    fn default() -> Self {
        Self::Idle
    }
}
