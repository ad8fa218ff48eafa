use super::{Payload, StepId};
use anyhow::Result;
use async_trait::async_trait;

/// Sink a component emits output through.
#[async_trait]
pub trait SendCallback: Send {
    /// Sends `payload` to `target`, or to every declared downstream target
    /// of the step when `target` is `None`.
    async fn send(
        &mut self,
        target: Option<&StepId>,
        payload: Payload,
        unit_of_work_boundary: bool,
    ) -> Result<()>;
}
