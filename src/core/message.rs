use super::{EntityRecord, StepId};
use serde::{Deserialize, Serialize};

/// Routing metadata attached to every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Step that produced the message.
    pub origin_step_id: StepId,

    /// Strictly increasing per origin step, starting at 1.
    pub sequence_number: u64,

    /// Marks the last message of one unit of work from the origin.
    pub unit_of_work_boundary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Synthetic start-of-run signal, only delivered to components that ask for it.
    Startup,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Records(Vec<EntityRecord>),
    Text(Vec<String>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Records(records) => records.len(),
            Payload::Text(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Records(Vec::new())
    }
}

impl From<Vec<EntityRecord>> for Payload {
    fn from(records: Vec<EntityRecord>) -> Self {
        Payload::Records(records)
    }
}

impl From<Vec<String>> for Payload {
    fn from(lines: Vec<String>) -> Self {
        Payload::Text(lines)
    }
}

/// Envelope passed between steps. Consumers never mutate a received message;
/// it is handed to `handle` by value and consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub header: MessageHeader,
    pub kind: MessageKind,
    pub payload: Payload,
}

impl Message {
    pub fn content(
        origin_step_id: impl Into<StepId>,
        sequence_number: u64,
        unit_of_work_boundary: bool,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            header: MessageHeader {
                origin_step_id: origin_step_id.into(),
                sequence_number,
                unit_of_work_boundary,
            },
            kind: MessageKind::Content,
            payload: payload.into(),
        }
    }

    pub fn startup(origin_step_id: impl Into<StepId>) -> Self {
        Self {
            header: MessageHeader {
                origin_step_id: origin_step_id.into(),
                sequence_number: 0,
                unit_of_work_boundary: false,
            },
            kind: MessageKind::Startup,
            payload: Payload::default(),
        }
    }

    pub fn origin(&self) -> &StepId {
        &self.header.origin_step_id
    }

    pub fn is_unit_of_work_boundary(&self) -> bool {
        self.header.unit_of_work_boundary
    }

    pub fn is_startup(&self) -> bool {
        self.kind == MessageKind::Startup
    }

    /// Records carried by the message; empty for text payloads.
    pub fn records(&self) -> &[EntityRecord] {
        match &self.payload {
            Payload::Records(records) => records,
            Payload::Text(_) => &[],
        }
    }

    /// Lines carried by the message; empty for record payloads.
    pub fn lines(&self) -> &[String] {
        match &self.payload {
            Payload::Text(lines) => lines,
            Payload::Records(_) => &[],
        }
    }
}
