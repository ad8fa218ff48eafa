use crate::core::{ComponentContext, ComponentRuntime, Message, SendCallback};
use crate::observability::ComponentStatistics;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use stepflow_macros::Component;

/// Forwards every message unchanged to all downstream steps.
#[derive(Component, Default)]
#[component_meta(type_name = "Noop", category = "Control")]
pub struct Noop {
    worker_index: usize,
    statistics: Option<Arc<ComponentStatistics>>,
}

#[async_trait]
impl ComponentRuntime for Noop {
    async fn start(&mut self, worker_index: usize, context: ComponentContext) -> Result<()> {
        self.worker_index = worker_index;
        self.statistics = Some(context.statistics().clone());
        Ok(())
    }

    async fn handle(
        &mut self,
        message: Message,
        sink: &mut dyn SendCallback,
        unit_of_work_boundary: bool,
    ) -> Result<()> {
        if message.is_startup() {
            return Ok(());
        }
        if let Some(statistics) = &self.statistics {
            statistics.add_entities_processed(self.worker_index, message.payload.len() as u64);
        }
        sink.send(None, message.payload, unit_of_work_boundary).await
    }

    fn supports_startup_messages(&self) -> bool {
        true
    }
}
