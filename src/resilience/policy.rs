use serde::{Deserialize, Serialize};

/// What a step worker does when `handle` fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Propagate the error; the step's worker ends and the run fails.
    #[default]
    Halt,

    /// Log and count the error, drop the message and keep handling.
    Continue,
}
