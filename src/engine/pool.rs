use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use crate::core::{ExpressionEvaluator, IdentityEvaluator, Message, Payload, StepId};
use super::{FlowDefinition, FlowRuntime};

/// One external payload published from an entry step.
#[derive(Debug, Clone)]
pub struct FlowInput {
    pub step: StepId,
    pub payload: Payload,
    pub unit_of_work_boundary: bool,
}

impl FlowInput {
    pub fn new(step: impl Into<StepId>, payload: impl Into<Payload>, unit_of_work_boundary: bool) -> Self {
        Self {
            step: step.into(),
            payload: payload.into(),
            unit_of_work_boundary,
        }
    }
}

/// Messages emitted by the collected steps of one run, in emission order.
pub type FlowOutput = HashMap<StepId, Vec<Message>>;

/// Runs independent instances of one flow concurrently. Instances share the
/// definition and nothing mutable.
pub struct FlowPool {
    definition: Arc<FlowDefinition>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl FlowPool {
    pub fn new(definition: FlowDefinition, max_concurrent: usize) -> Result<Self> {
        definition.validate()?;
        if max_concurrent == 0 {
            return Err(anyhow!("FlowPool needs at least one concurrent run"));
        }

        Ok(Self {
            definition: Arc::new(definition),
            evaluator: Arc::new(IdentityEvaluator),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Spawns one run: start, publish `inputs` in order, stop, and return
    /// what the `collect` steps emitted.
    pub fn execute(&self, inputs: Vec<FlowInput>, collect: Vec<StepId>) -> JoinHandle<Result<FlowOutput>> {
        let definition = self.definition.clone();
        let evaluator = self.evaluator.clone();
        let semaphore = self.semaphore.clone();

        tokio::spawn(async move {
            // Waits while max_concurrent runs are active
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| anyhow!("Flow pool is closed"))?;

            let mut runtime = FlowRuntime::from_shared(definition)?.with_evaluator(evaluator);

            let mut receivers = Vec::with_capacity(collect.len());
            for step in collect {
                let rx = runtime.subscribe(step.as_str())?;
                receivers.push((step, rx));
            }

            runtime.start().await?;
            let mut published = Ok(());
            for input in inputs {
                published = runtime
                    .emit_from(input.step.as_str(), input.payload, input.unit_of_work_boundary)
                    .await;
                if published.is_err() {
                    break;
                }
            }
            // Always drain the workers, even when publishing failed
            let stopped = runtime.stop().await;
            published?;
            stopped?;

            let mut output = FlowOutput::new();
            for (step, mut rx) in receivers {
                let messages = output.entry(step).or_default();
                while let Some(message) = rx.recv().await {
                    messages.push(message);
                }
            }
            Ok(output)
        })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
