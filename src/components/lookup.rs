use crate::core::{
    AttributeId, ComponentContext, ComponentError, ComponentRuntime, EntityRecord, Message,
    Payload, SendCallback, StepId, Value,
};
use crate::observability::ComponentStatistics;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use stepflow_macros::Component;
use tracing::{debug, info, warn};

pub const SOURCE_STEP: &str = "lookup.data.source.step";
pub const LOOKUP_KEY: &str = "lookup.key.attribute";
pub const LOOKUP_VALUE: &str = "lookup.value.attribute";
pub const REPLACEMENT_KEY_ATTRIBUTE: &str = "replacement.key.attribute";
pub const REPLACEMENT_VALUE_ATTRIBUTE: &str = "replacement.value.attribute";
pub const MAX_PENDING_MESSAGES: &str = "lookup.max.pending.messages";
pub const MAX_ENTRIES: &str = "lookup.max.entries";

/// Fan-in protocol state of a [`Lookup`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupState {
    /// The source stream has not delivered its unit-of-work boundary yet.
    #[default]
    Uninitialized,
    /// The table is complete for the rest of the run.
    Ready,
}

/// Where an inbound message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    MergeIntoTable,
    Queue,
    Enrich,
}

impl LookupState {
    pub fn route(self, from_source: bool) -> Route {
        match (from_source, self) {
            (true, _) => Route::MergeIntoTable,
            (false, LookupState::Uninitialized) => Route::Queue,
            (false, LookupState::Ready) => Route::Enrich,
        }
    }

    /// State after a source message was merged. `Ready` is terminal.
    pub fn after_source_message(self, unit_of_work_boundary: bool) -> Self {
        match (self, unit_of_work_boundary) {
            (LookupState::Ready, _) | (LookupState::Uninitialized, true) => LookupState::Ready,
            (LookupState::Uninitialized, false) => LookupState::Uninitialized,
        }
    }

    pub fn is_ready(self) -> bool {
        self == LookupState::Ready
    }

    pub fn name(self) -> &'static str {
        match self {
            LookupState::Uninitialized => "Uninitialized",
            LookupState::Ready => "Ready",
        }
    }
}

/// Enriches records from its main inputs with a value looked up in a table
/// built from a designated source step.
///
/// Main-input messages that arrive before the source step finished its unit
/// of work are held back and replayed, in arrival order, the moment the table
/// is complete. Neither the table nor the queue is bounded unless
/// `lookup.max.entries` / `lookup.max.pending.messages` are set; a source that
/// never finishes keeps the queue growing.
#[derive(Component, Default)]
#[component_meta(type_name = "Lookup", category = "Processors")]
pub struct Lookup {
    #[setting(key = "lookup.data.source.step", required)]
    source_step_id: StepId,

    #[setting(key = "lookup.key.attribute", required)]
    key_attribute_id: AttributeId,

    #[setting(key = "lookup.value.attribute", required)]
    value_attribute_id: AttributeId,

    #[setting(key = "replacement.key.attribute", required)]
    replacement_key_attribute_id: AttributeId,

    #[setting(key = "replacement.value.attribute", required)]
    replacement_value_attribute_id: AttributeId,

    /// 0 means unbounded.
    #[setting(key = "lookup.max.pending.messages", default = "0")]
    max_pending_messages: usize,

    /// 0 means unbounded.
    #[setting(key = "lookup.max.entries", default = "0")]
    max_entries: usize,

    step_id: StepId,
    worker_index: usize,
    statistics: Option<Arc<ComponentStatistics>>,
    state: LookupState,
    table: HashMap<Value, Value>,
    pending: VecDeque<Message>,
}

impl Lookup {
    pub fn state(&self) -> LookupState {
        self.state
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn resolve_attribute(
        context: &ComponentContext,
        key: &str,
    ) -> Result<AttributeId, ComponentError> {
        let id = context.required_setting(key)?;
        if !context.model().is_empty() && context.model().attribute(id).is_none() {
            return Err(context.configuration_error(format!(
                "attribute '{}' named by '{}' is not part of the input model",
                id, key
            )));
        }
        Ok(AttributeId::from(id))
    }

    /// Upserts every record of a source message. The whole message is
    /// rejected, leaving the table untouched, when its new keys would push the
    /// table past `max_entries`.
    fn merge(&mut self, message: &Message) -> Result<(), ComponentError> {
        if self.max_entries > 0 {
            let new_keys: HashSet<&Value> = message
                .records()
                .iter()
                .map(|record| record.value(self.key_attribute_id.as_str()))
                .filter(|key| !self.table.contains_key(*key))
                .collect();
            if self.table.len() + new_keys.len() > self.max_entries {
                return Err(ComponentError::CapacityExceeded {
                    step: self.step_id.clone(),
                    what: "lookup table",
                    limit: self.max_entries,
                });
            }
        }

        for record in message.records() {
            let key = record.value(self.key_attribute_id.as_str()).clone();
            let value = record.value(self.value_attribute_id.as_str()).clone();
            self.table.insert(key, value);
        }
        Ok(())
    }

    fn enqueue(&mut self, message: Message) -> Result<(), ComponentError> {
        if self.max_pending_messages > 0 && self.pending.len() >= self.max_pending_messages {
            return Err(ComponentError::CapacityExceeded {
                step: self.step_id.clone(),
                what: "pending queue",
                limit: self.max_pending_messages,
            });
        }
        self.pending.push_back(message);
        Ok(())
    }

    fn enrich(&self, record: &EntityRecord) -> EntityRecord {
        let key = record.value(self.replacement_key_attribute_id.as_str());
        let replacement = self.table.get(key).cloned().unwrap_or(Value::Null);
        let mut enriched = record.clone();
        enriched.insert(self.replacement_value_attribute_id.clone(), replacement);
        enriched
    }

    async fn enrich_and_send(&self, message: &Message, sink: &mut dyn SendCallback) -> Result<()> {
        debug!(step = %self.step_id, entries = self.table.len(), "using lookup table");

        let payload: Vec<EntityRecord> = message.records().iter().map(|r| self.enrich(r)).collect();
        let count = payload.len() as u64;

        sink.send(None, Payload::Records(payload), message.is_unit_of_work_boundary())
            .await?;

        if let Some(statistics) = &self.statistics {
            statistics.add_entities_processed(self.worker_index, count);
        }
        Ok(())
    }

    /// Sends every queued message in arrival order. A failed send leaves that
    /// message at the head of the queue.
    async fn replay_pending(&mut self, sink: &mut dyn SendCallback) -> Result<()> {
        while let Some(queued) = self.pending.front() {
            self.enrich_and_send(queued, sink).await?;
            self.pending.pop_front();
        }
        Ok(())
    }
}

#[async_trait]
impl ComponentRuntime for Lookup {
    async fn start(&mut self, worker_index: usize, context: ComponentContext) -> Result<()> {
        let source = context.required_setting(SOURCE_STEP)?;
        if context.flow().find_step(source).is_none() {
            return Err(context
                .configuration_error(format!("source step '{}' is not part of the flow", source))
                .into());
        }

        self.source_step_id = StepId::from(source);
        self.key_attribute_id = Self::resolve_attribute(&context, LOOKUP_KEY)?;
        self.value_attribute_id = Self::resolve_attribute(&context, LOOKUP_VALUE)?;
        self.replacement_key_attribute_id =
            Self::resolve_attribute(&context, REPLACEMENT_KEY_ATTRIBUTE)?;
        self.replacement_value_attribute_id =
            Self::resolve_attribute(&context, REPLACEMENT_VALUE_ATTRIBUTE)?;
        self.max_pending_messages = context.parse_setting(MAX_PENDING_MESSAGES, 0)?;
        self.max_entries = context.parse_setting(MAX_ENTRIES, 0)?;

        self.step_id = context.step_id().clone();
        self.worker_index = worker_index;
        self.statistics = Some(context.statistics().clone());
        self.state = LookupState::Uninitialized;
        self.table.clear();
        self.pending.clear();

        debug!(step = %self.step_id, source = %self.source_step_id, "lookup started");
        Ok(())
    }

    async fn handle(
        &mut self,
        message: Message,
        sink: &mut dyn SendCallback,
        _unit_of_work_boundary: bool,
    ) -> Result<()> {
        if message.is_startup() {
            return Ok(());
        }

        match self.state.route(message.origin() == &self.source_step_id) {
            Route::MergeIntoTable => {
                self.merge(&message)?;

                let previous = self.state;
                self.state = previous.after_source_message(message.is_unit_of_work_boundary());

                if !previous.is_ready() && self.state.is_ready() {
                    info!(
                        step = %self.step_id,
                        entries = self.table.len(),
                        queued = self.pending.len(),
                        "lookup table complete"
                    );
                }
                if self.state.is_ready() {
                    self.replay_pending(sink).await?;
                }
                Ok(())
            }
            Route::Queue => {
                self.enqueue(message)?;
                Ok(())
            }
            Route::Enrich => {
                self.replay_pending(sink).await?;
                self.enrich_and_send(&message, sink).await
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            warn!(
                step = %self.step_id,
                queued = self.pending.len(),
                "discarding messages queued while waiting for lookup source"
            );
        }
        self.state = LookupState::Uninitialized;
        self.table.clear();
        self.pending.clear();
        Ok(())
    }
}
