use crate::core::{ComponentContext, ComponentRuntime, Message, SendCallback};
use crate::observability::ComponentStatistics;
use super::ErrorPolicy;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, warn};

/// Wraps a component with statistics bookkeeping and an [`ErrorPolicy`].
pub struct ResilientComponent {
    inner: Box<dyn ComponentRuntime>,
    statistics: Arc<ComponentStatistics>,
    error_policy: ErrorPolicy,
    worker_index: usize,
}

impl ResilientComponent {
    pub fn new(
        inner: Box<dyn ComponentRuntime>,
        statistics: Arc<ComponentStatistics>,
        error_policy: ErrorPolicy,
    ) -> Self {
        Self {
            inner,
            statistics,
            error_policy,
            worker_index: 0,
        }
    }

    pub fn statistics(&self) -> &Arc<ComponentStatistics> {
        &self.statistics
    }
}

#[async_trait]
impl ComponentRuntime for ResilientComponent {
    async fn start(&mut self, worker_index: usize, context: ComponentContext) -> Result<()> {
        self.worker_index = worker_index;
        let context = context.with_statistics(self.statistics.clone());
        self.inner.start(worker_index, context).await
    }

    async fn handle(
        &mut self,
        message: Message,
        sink: &mut dyn SendCallback,
        unit_of_work_boundary: bool,
    ) -> Result<()> {
        let worker = self.worker_index;
        self.statistics.increment_inbound_messages(worker);
        let start = self.statistics.start_handling();

        let origin = message.origin().clone();
        let result = self.inner.handle(message, sink, unit_of_work_boundary).await;
        self.statistics.finish_handling(worker, start);

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.statistics.record_error(worker);

                match self.error_policy {
                    ErrorPolicy::Halt => {
                        error!(step = %self.statistics.step_id(), %origin, "handle failed: {:#}", e);
                        Err(e)
                    }
                    ErrorPolicy::Continue => {
                        warn!(step = %self.statistics.step_id(), %origin, "dropping message after handle failure: {:#}", e);
                        Ok(())
                    }
                }
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.inner.stop().await
    }

    fn supports_startup_messages(&self) -> bool {
        self.inner.supports_startup_messages()
    }
}
