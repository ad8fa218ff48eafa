#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use stepflow::core::{
    AttributeSetting, ComponentContext, EntityRecord, Model, ModelAttribute, ModelEntity, Payload,
    SendCallback, Settings, StepId,
};
use stepflow::engine::{FlowDefinition, FlowLink, FlowStep};

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub target: Option<StepId>,
    pub payload: Payload,
    pub unit_of_work_boundary: bool,
}

/// Callback that keeps everything a component sends.
#[derive(Debug, Default)]
pub struct RecordingCallback {
    pub sent: Vec<SentMessage>,
}

impl RecordingCallback {
    pub fn records(&self, index: usize) -> &[EntityRecord] {
        match &self.sent[index].payload {
            Payload::Records(records) => records,
            Payload::Text(_) => panic!("message {} carries text", index),
        }
    }

    pub fn lines(&self, index: usize) -> &[String] {
        match &self.sent[index].payload {
            Payload::Text(lines) => lines,
            Payload::Records(_) => panic!("message {} carries records", index),
        }
    }
}

#[async_trait]
impl SendCallback for RecordingCallback {
    async fn send(
        &mut self,
        target: Option<&StepId>,
        payload: Payload,
        unit_of_work_boundary: bool,
    ) -> Result<()> {
        self.sent.push(SentMessage {
            target: target.cloned(),
            payload,
            unit_of_work_boundary,
        });
        Ok(())
    }
}

fn attribute(id: &str, entity: &str, name: &str) -> ModelAttribute {
    ModelAttribute {
        id: id.into(),
        entity_id: entity.into(),
        name: name.to_string(),
        data_type: None,
    }
}

/// Two entities: a lookup source (`k`, `v`) and a main input (`rk`, `rv`, `a`, `b`, `c`).
pub fn test_model() -> Model {
    Model::new(
        vec![
            ModelEntity {
                id: "source".into(),
                name: "SOURCE".to_string(),
            },
            ModelEntity {
                id: "main".into(),
                name: "MAIN".to_string(),
            },
        ],
        vec![
            attribute("k", "source", "KEY"),
            attribute("v", "source", "VALUE"),
            attribute("rk", "main", "REF"),
            attribute("rv", "main", "REF_VALUE"),
            attribute("a", "main", "A_NAME"),
            attribute("b", "main", "B_NAME"),
            attribute("c", "main", "C"),
        ],
    )
    .unwrap()
}

pub fn lookup_settings(source: &str) -> Settings {
    Settings::new()
        .with("lookup.data.source.step", source)
        .with("lookup.key.attribute", "k")
        .with("lookup.value.attribute", "v")
        .with("replacement.key.attribute", "rk")
        .with("replacement.value.attribute", "rv")
}

pub fn format_settings(layout: &[(&str, i32, usize)]) -> Vec<AttributeSetting> {
    layout
        .iter()
        .flat_map(|(id, ordinal, length)| {
            vec![
                AttributeSetting::new(*id, "fixed.length.formatter.attribute.ordinal", ordinal.to_string()),
                AttributeSetting::new(*id, "fixed.length.formatter.attribute.length", length.to_string()),
            ]
        })
        .collect()
}

pub fn flow(steps: Vec<FlowStep>, links: &[(&str, &str)]) -> FlowDefinition {
    FlowDefinition {
        name: "test-flow".to_string(),
        steps,
        links: links
            .iter()
            .map(|(from, to)| FlowLink {
                from: (*from).into(),
                to: (*to).into(),
            })
            .collect(),
        model: test_model(),
        runtime: Default::default(),
    }
}

/// Source and main entry steps feeding a lookup step.
pub fn lookup_flow(settings: Settings) -> FlowDefinition {
    flow(
        vec![
            FlowStep::new("source", "Noop"),
            FlowStep::new("main", "Noop"),
            FlowStep::new("lookup", "Lookup").with_settings(settings),
        ],
        &[("source", "lookup"), ("main", "lookup")],
    )
}

/// Context for running `step` of `flow` outside the runtime.
pub fn context(flow: FlowDefinition, step: &str) -> ComponentContext {
    let step = flow.find_step(step).unwrap().clone();
    let model = Arc::new(flow.model.clone());
    ComponentContext::new(step, Arc::new(flow), model)
}

pub fn record(fields: &[(&str, stepflow::core::Value)]) -> EntityRecord {
    fields.iter().cloned().collect()
}
