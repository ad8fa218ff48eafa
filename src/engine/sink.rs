use crate::core::{ComponentError, Message, Payload, SendCallback, StepId};
use crate::observability::ComponentStatistics;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Channel-backed [`SendCallback`] of one step.
///
/// Stamps every outgoing message with the step as origin and the next
/// sequence number of the step. Clones share the sequence counter.
#[derive(Clone)]
pub struct StepSink {
    origin: StepId,
    worker_index: usize,
    targets: Vec<(StepId, mpsc::Sender<Message>)>,
    taps: Vec<mpsc::UnboundedSender<Message>>,
    sequence: Arc<AtomicU64>,
    statistics: Arc<ComponentStatistics>,
}

impl StepSink {
    pub fn new(
        origin: StepId,
        targets: Vec<(StepId, mpsc::Sender<Message>)>,
        taps: Vec<mpsc::UnboundedSender<Message>>,
        statistics: Arc<ComponentStatistics>,
    ) -> Self {
        Self {
            origin,
            worker_index: 0,
            targets,
            taps,
            sequence: Arc::new(AtomicU64::new(0)),
            statistics,
        }
    }

    pub fn for_worker(mut self, worker_index: usize) -> Self {
        self.worker_index = worker_index;
        self
    }

    pub fn origin(&self) -> &StepId {
        &self.origin
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl SendCallback for StepSink {
    async fn send(
        &mut self,
        target: Option<&StepId>,
        payload: Payload,
        unit_of_work_boundary: bool,
    ) -> Result<()> {
        if let Some(target) = target {
            if !self.targets.iter().any(|(id, _)| id == target) {
                return Err(ComponentError::UnknownStep(target.clone()).into());
            }
        }

        let message = Message::content(
            self.origin.clone(),
            self.next_sequence(),
            unit_of_work_boundary,
            payload,
        );

        for tap in &self.taps {
            let _ = tap.send(message.clone());
        }

        for (id, output) in &self.targets {
            if target.map_or(true, |t| t == id) && output.send(message.clone()).await.is_err() {
                debug!(origin = %self.origin, target = %id, "downstream step closed, message dropped");
            }
        }

        self.statistics.increment_outbound_messages(self.worker_index);
        Ok(())
    }
}
