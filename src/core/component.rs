use super::{
    AttributeSetting, ComponentError, ExpressionEvaluator, IdentityEvaluator, Message, Model,
    SendCallback, Settings, StepId,
};
use crate::engine::{FlowDefinition, FlowStep};
use crate::observability::ComponentStatistics;
use anyhow::Result;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

/// Base contract every processing unit in a flow satisfies.
///
/// The runtime drives one instance strictly sequentially:
/// `start`, then `handle` once per inbound message, then `stop`. `handle` is
/// never invoked concurrently on the same instance, so implementations keep
/// their state in plain fields.
#[async_trait]
pub trait ComponentRuntime: Send + Sync {
    /// One-time setup. A [`ComponentError::Configuration`] aborts the run
    /// before any message is handled.
    async fn start(&mut self, worker_index: usize, context: ComponentContext) -> Result<()>;

    /// Processes one inbound message.
    ///
    /// `unit_of_work_boundary` is true when every inbound origin of the step
    /// has reached the end of its current unit of work.
    async fn handle(
        &mut self,
        message: Message,
        sink: &mut dyn SendCallback,
        unit_of_work_boundary: bool,
    ) -> Result<()>;

    /// Releases accumulated state. Must be idempotent and leave the instance
    /// ready for another `start`.
    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether the runtime may deliver a synthetic startup message.
    fn supports_startup_messages(&self) -> bool {
        false
    }
}

/// Everything a component sees of the flow it runs in.
#[derive(Clone)]
pub struct ComponentContext {
    step: FlowStep,
    flow: Arc<FlowDefinition>,
    model: Arc<Model>,
    statistics: Arc<ComponentStatistics>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl ComponentContext {
    pub fn new(step: FlowStep, flow: Arc<FlowDefinition>, model: Arc<Model>) -> Self {
        let statistics = Arc::new(ComponentStatistics::new(step.id.clone()));
        Self {
            step,
            flow,
            model,
            statistics,
            evaluator: Arc::new(IdentityEvaluator),
        }
    }

    pub fn with_statistics(mut self, statistics: Arc<ComponentStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn step(&self) -> &FlowStep {
        &self.step
    }

    pub fn step_id(&self) -> &StepId {
        &self.step.id
    }

    pub fn flow(&self) -> &FlowDefinition {
        &self.flow
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn statistics(&self) -> &Arc<ComponentStatistics> {
        &self.statistics
    }

    pub fn evaluator(&self) -> &Arc<dyn ExpressionEvaluator> {
        &self.evaluator
    }

    pub fn settings(&self) -> &Settings {
        &self.step.settings
    }

    pub fn attribute_settings(&self) -> &[AttributeSetting] {
        &self.step.attribute_settings
    }

    pub fn configuration_error(&self, reason: impl Into<String>) -> ComponentError {
        ComponentError::configuration(&self.step.id, reason)
    }

    /// Non-blank value of a mandatory setting.
    pub fn required_setting(&self, key: &str) -> Result<&str, ComponentError> {
        self.settings()
            .get_non_blank(key)
            .ok_or_else(|| self.configuration_error(format!("setting '{}' must be specified", key)))
    }

    /// Parses an optional setting, falling back to `default` when absent or blank.
    pub fn parse_setting<T>(&self, key: &str, default: T) -> Result<T, ComponentError>
    where
        T: FromStr,
    {
        match self.settings().get_non_blank(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                self.configuration_error(format!("setting '{}' has invalid value '{}'", key, raw))
            }),
        }
    }
}
