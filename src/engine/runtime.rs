use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::core::{
    ComponentContext, ComponentError, ComponentRuntime, ExpressionEvaluator, IdentityEvaluator,
    Message, Model, Payload, SendCallback, StepId,
};
use crate::engine::state::FlowState;
use crate::engine::{FlowDefinition, StepSink, UnitOfWorkTracker};
use crate::observability::{ComponentStatistics, FlowMonitor, StatisticsCollector};
use crate::registry;
use crate::resilience::ResilientComponent;

/// Drives one run of a flow: one worker task per step, each handling its
/// inbound messages strictly in order.
pub struct FlowRuntime {
    definition: Arc<FlowDefinition>,
    model: Arc<Model>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    inbound: HashMap<StepId, mpsc::Sender<Message>>,
    emitters: HashMap<StepId, StepSink>,
    taps: HashMap<StepId, Vec<mpsc::UnboundedSender<Message>>>,
    handles: Vec<(StepId, JoinHandle<Result<()>>)>,
    collector: StatisticsCollector,
    state: FlowState,
}

impl FlowRuntime {
    pub fn new(definition: FlowDefinition) -> Result<Self> {
        Self::from_shared(Arc::new(definition))
    }

    pub fn from_shared(definition: Arc<FlowDefinition>) -> Result<Self> {
        definition.validate()?;
        let model = Arc::new(definition.model.clone());

        Ok(Self {
            definition,
            model,
            evaluator: Arc::new(IdentityEvaluator),
            inbound: HashMap::new(),
            emitters: HashMap::new(),
            taps: HashMap::new(),
            handles: Vec::new(),
            collector: StatisticsCollector::new(),
            state: FlowState::Idle,
        })
    }

    pub fn from_json(config: Value) -> Result<Self> {
        Self::new(FlowDefinition::from_json(config)?)
    }

    /// Replaces the expression evaluator handed to components at start.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn definition(&self) -> &FlowDefinition {
        &self.definition
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Moves to `new_state`, rejecting transitions the lifecycle does not allow.
    pub fn transition_to(&mut self, new_state: FlowState) -> Result<()> {
        if !self.state.can_transition_to(&new_state) {
            return Err(anyhow!(
                "Invalid state transition: {} -> {}",
                self.state.name(),
                new_state.name()
            ));
        }
        self.state = new_state;
        Ok(())
    }

    /// Receives a copy of every message `step` emits during the next run.
    /// Must be called before `start`.
    pub fn subscribe(&mut self, step: &str) -> Result<mpsc::UnboundedReceiver<Message>> {
        if self.state.is_running() {
            return Err(anyhow!("Cannot subscribe to step {} while the flow is running", step));
        }
        let step_id = self
            .definition
            .find_step(step)
            .map(|s| s.id.clone())
            .ok_or_else(|| ComponentError::UnknownStep(StepId::from(step)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.taps.entry(step_id).or_default().push(tx);
        Ok(rx)
    }

    /// Creates and starts every component, then spawns one worker per step.
    ///
    /// Any start failure stops the components started so far and leaves the
    /// flow `Failed` without a single message handled.
    pub async fn start(&mut self) -> Result<()> {
        if matches!(self.state, FlowState::Completed { .. } | FlowState::Failed { .. }) {
            self.transition_to(FlowState::Idle)?;
        }
        self.transition_to(FlowState::Starting)?;

        let components = match self.start_components().await {
            Ok(components) => components,
            Err(e) => {
                self.taps.clear();
                self.transition_to(FlowState::Failed {
                    error_msg: format!("{:#}", e),
                })?;
                return Err(e);
            }
        };

        let capacity = self.definition.runtime.channel_capacity;
        let mut receivers = HashMap::new();
        for step in &self.definition.steps {
            let (tx, rx) = mpsc::channel(capacity);
            self.inbound.insert(step.id.clone(), tx);
            receivers.insert(step.id.clone(), rx);
        }

        let mut taps = std::mem::take(&mut self.taps);
        let mut startup_targets = Vec::new();

        for component in components {
            let step_id = component.statistics().step_id().clone();

            let targets = self
                .definition
                .outbound_steps(step_id.as_str())
                .into_iter()
                .filter_map(|to| self.inbound.get(to).map(|tx| (to.clone(), tx.clone())))
                .collect();

            let sink = StepSink::new(
                step_id.clone(),
                targets,
                taps.remove(&step_id).unwrap_or_default(),
                component.statistics().clone(),
            );
            self.emitters.insert(step_id.clone(), sink.clone());

            let inbound: Vec<StepId> = self
                .definition
                .inbound_steps(step_id.as_str())
                .into_iter()
                .cloned()
                .collect();
            if inbound.is_empty() && component.supports_startup_messages() {
                startup_targets.push(step_id.clone());
            }

            let rx = receivers
                .remove(&step_id)
                .ok_or_else(|| anyhow!("No inbound channel for step {}", step_id))?;
            let tracker = UnitOfWorkTracker::new(inbound);

            let handle = tokio::spawn(run_step(component, rx, sink, tracker));
            self.handles.push((step_id, handle));
        }

        for step_id in startup_targets {
            if let Some(tx) = self.inbound.get(&step_id) {
                tx.send(Message::startup(step_id.clone()))
                    .await
                    .map_err(|_| anyhow!("Failed to send startup message to {}", step_id))?;
            }
        }

        self.transition_to(FlowState::Running {
            start_time: Some(std::time::Instant::now()),
        })?;

        info!(flow = %self.definition.name, steps = self.handles.len(), "flow started");
        Ok(())
    }

    async fn start_components(&mut self) -> Result<Vec<ResilientComponent>> {
        self.collector.clear();
        let flow = self.definition.clone();
        let model = self.model.clone();
        let evaluator = self.evaluator.clone();
        let policy = flow.runtime.error_policy;
        let mut started: Vec<ResilientComponent> = Vec::new();

        for step in flow.steps.iter() {
            let outcome = async {
                let definition = registry::find(&step.component_type)
                    .ok_or_else(|| ComponentError::UnknownComponentType(step.component_type.clone()))?;

                let unknown = definition.unknown_settings(&step.settings);
                if !unknown.is_empty() {
                    return Err(ComponentError::configuration(
                        &step.id,
                        format!("unknown settings: {}", unknown.join(", ")),
                    )
                    .into());
                }

                let missing = definition.missing_required(&step.settings);
                if !missing.is_empty() {
                    return Err(ComponentError::configuration(
                        &step.id,
                        format!("missing required settings: {}", missing.join(", ")),
                    )
                    .into());
                }

                let statistics = Arc::new(ComponentStatistics::new(step.id.clone()));
                let mut component =
                    ResilientComponent::new(definition.create_instance(), statistics.clone(), policy);
                let context = ComponentContext::new(step.clone(), flow.clone(), model.clone())
                    .with_evaluator(evaluator.clone());

                component.start(0, context).await?;
                debug!(step = %step.id, component = %step.component_type, "component started");
                Ok::<_, anyhow::Error>(component)
            }
            .await;

            match outcome {
                Ok(component) => {
                    self.collector.register(component.statistics().clone());
                    started.push(component);
                }
                Err(e) => {
                    warn!(step = %step.id, "failed to start component: {:#}", e);
                    for mut component in started {
                        if let Err(stop_error) = component.stop().await {
                            warn!("failed to stop component after aborted start: {:#}", stop_error);
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(started)
    }

    /// Publishes `payload` as output of `step`, through the step's own sink.
    pub async fn emit_from(&mut self, step: &str, payload: impl Into<Payload>, unit_of_work_boundary: bool) -> Result<()> {
        if !self.state.is_running() {
            return Err(anyhow!("Flow is not running"));
        }
        let sink = self
            .emitters
            .get_mut(step)
            .ok_or_else(|| ComponentError::UnknownStep(StepId::from(step)))?;
        sink.send(None, payload.into(), unit_of_work_boundary).await
    }

    /// Closes the flow's inputs, lets every worker drain and stop its
    /// component, and reports the first worker failure. Calling it on a flow
    /// that is not running is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        let start_time = match &self.state {
            FlowState::Running { start_time } => *start_time,
            _ => return Ok(()),
        };

        // Dropping our senders lets the workers see their inputs close once upstream is done
        self.inbound.clear();
        self.emitters.clear();

        let handles = std::mem::take(&mut self.handles);
        let mut failure: Option<anyhow::Error> = None;
        for (step_id, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(anyhow!("Worker for step {} panicked: {}", step_id, join_error)),
            };
            if let Err(e) = outcome {
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }

        match failure {
            None => {
                self.transition_to(FlowState::Completed {
                    duration: start_time.map(|t| t.elapsed()),
                })?;
                info!(flow = %self.definition.name, "flow completed");
                Ok(())
            }
            Some(e) => {
                self.transition_to(FlowState::Failed {
                    error_msg: format!("{:#}", e),
                })?;
                Err(e)
            }
        }
    }

    pub fn statistics(&self, step: &str) -> Option<Arc<ComponentStatistics>> {
        self.collector.get(step)
    }

    pub fn monitor(&self) -> FlowMonitor {
        FlowMonitor::new(self.collector.clone())
    }
}

async fn run_step(
    mut component: ResilientComponent,
    mut rx: mpsc::Receiver<Message>,
    mut sink: StepSink,
    mut tracker: UnitOfWorkTracker,
) -> Result<()> {
    let mut outcome = Ok(());

    while let Some(message) = rx.recv().await {
        let boundary = tracker.observe(&message);
        if let Err(e) = component.handle(message, &mut sink, boundary).await {
            outcome = Err(e);
            break;
        }
    }
    drop(rx);

    if let Err(e) = component.stop().await {
        warn!(step = %sink.origin(), "failed to stop component: {:#}", e);
    }
    debug!(step = %sink.origin(), "step worker finished");
    outcome
}
