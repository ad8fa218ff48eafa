use crate::core::{AttributeSetting, ComponentError, Model, Settings, StepId};
use crate::resilience::ErrorPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

fn default_channel_capacity() -> usize {
    100
}

/// A named position in the flow graph and the component it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub id: StepId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub attribute_settings: Vec<AttributeSetting>,
}

impl FlowStep {
    pub fn new(id: impl Into<StepId>, component_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            component_type: component_type.into(),
            settings: Settings::default(),
            attribute_settings: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_attribute_settings(mut self, attribute_settings: Vec<AttributeSetting>) -> Self {
        self.attribute_settings = attribute_settings;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLink {
    pub from: StepId,
    pub to: StepId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Capacity of each step's inbound channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            error_policy: ErrorPolicy::default(),
        }
    }
}

/// Declarative description of a flow: steps, links, the data model the
/// steps resolve attributes against, and runtime tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowDefinition {
    #[serde(default)]
    pub name: String,
    pub steps: Vec<FlowStep>,
    #[serde(default)]
    pub links: Vec<FlowLink>,
    #[serde(default)]
    pub model: Model,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl FlowDefinition {
    pub fn from_json(config: Value) -> Result<Self> {
        let definition: FlowDefinition =
            serde_json::from_value(config).context("Failed to parse flow definition")?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn from_json_str(config: &str) -> Result<Self> {
        let definition: FlowDefinition =
            serde_json::from_str(config).context("Failed to parse flow definition")?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read flow definition {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Rejects duplicate step ids, links to unknown steps and a zero channel capacity.
    pub fn validate(&self) -> Result<(), ComponentError> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.is_blank() {
                return Err(ComponentError::InvalidFlow("step with blank id".to_string()));
            }
            if !seen.insert(&step.id) {
                return Err(ComponentError::InvalidFlow(format!(
                    "duplicate step id '{}'",
                    step.id
                )));
            }
        }

        for link in &self.links {
            for end in [&link.from, &link.to] {
                if !seen.contains(end) {
                    return Err(ComponentError::InvalidFlow(format!(
                        "link {} -> {} references unknown step '{}'",
                        link.from, link.to, end
                    )));
                }
            }
        }

        if self.runtime.channel_capacity == 0 {
            return Err(ComponentError::InvalidFlow(
                "channel_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn find_step(&self, id: &str) -> Option<&FlowStep> {
        self.steps.iter().find(|step| step.id.as_str() == id)
    }

    /// Steps with a link into `id`, in link order.
    pub fn inbound_steps(&self, id: &str) -> Vec<&StepId> {
        self.links
            .iter()
            .filter(|link| link.to.as_str() == id)
            .map(|link| &link.from)
            .collect()
    }

    /// Steps `id` links to, in link order.
    pub fn outbound_steps(&self, id: &str) -> Vec<&StepId> {
        self.links
            .iter()
            .filter(|link| link.from.as_str() == id)
            .map(|link| &link.to)
            .collect()
    }

    /// Steps without inbound links.
    pub fn entry_steps(&self) -> Vec<&FlowStep> {
        self.steps
            .iter()
            .filter(|step| !self.links.iter().any(|link| link.to == step.id))
            .collect()
    }
}
