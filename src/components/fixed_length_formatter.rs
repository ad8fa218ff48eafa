use crate::core::{
    AttributeId, ComponentContext, ComponentError, ComponentRuntime, EntityRecord, Evaluation,
    ExpressionEvaluator, Message, ModelAttribute, ModelEntity, Payload, SendCallback, StepId,
    Value,
};
use crate::observability::ComponentStatistics;
use anyhow::Result;
use async_trait::async_trait;
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::sync::Arc;
use stepflow_macros::Component;
use tracing::{debug, warn};

pub const WRITE_HEADER: &str = "fixed.length.formatter.header";
pub const TRUNCATE: &str = "fixed.length.formatter.truncate";

pub const ATTRIBUTE_ORDINAL: &str = "fixed.length.formatter.attribute.ordinal";
pub const ATTRIBUTE_LENGTH: &str = "fixed.length.formatter.attribute.length";
pub const ATTRIBUTE_FORMAT_FUNCTION: &str = "fixed.length.formatter.attribute.format.function";

/// Layout of one output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFormat {
    pub attribute: ModelAttribute,
    pub entity: ModelEntity,
    pub ordinal: i32,
    pub length: usize,
    pub format_expression: Option<String>,
}

impl AttributeFormat {
    fn new(attribute: ModelAttribute, entity: ModelEntity) -> Self {
        Self {
            attribute,
            entity,
            ordinal: 0,
            length: 0,
            format_expression: None,
        }
    }

    pub fn attribute_id(&self) -> &AttributeId {
        &self.attribute.id
    }
}

/// Right-pads `text` with spaces to `width` chars. Longer text is cut to
/// `width` when `truncate` is set and passed through whole otherwise.
pub fn fit(text: &str, width: usize, truncate: bool) -> String {
    let len = text.chars().count();
    if len >= width {
        if truncate {
            text.chars().take(width).collect()
        } else {
            text.to_string()
        }
    } else {
        let mut padded = String::with_capacity(text.len() + width - len);
        padded.push_str(text);
        padded.extend(std::iter::repeat(' ').take(width - len));
        padded
    }
}

/// Renders each input record as one fixed-width text line.
#[derive(Component, Default)]
#[component_meta(type_name = "Format Fixed", category = "Formatters")]
pub struct FixedLengthFormatter {
    #[setting(key = "fixed.length.formatter.header", default = "false")]
    write_header: bool,

    #[setting(key = "fixed.length.formatter.truncate", default = "false")]
    truncate: bool,

    step_id: StepId,
    worker_index: usize,
    formats: Vec<AttributeFormat>,
    statistics: Option<Arc<ComponentStatistics>>,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
}

impl FixedLengthFormatter {
    /// Column layout in ordinal order, as resolved by the last `start`.
    pub fn formats(&self) -> &[AttributeFormat] {
        &self.formats
    }

    /// Merges the attribute settings of the step into one format per
    /// attribute and sorts them by ordinal. Equal ordinals keep the order in
    /// which their attributes first appear in the settings.
    fn resolve_formats(context: &ComponentContext) -> Result<Vec<AttributeFormat>, ComponentError> {
        let mut formats: IndexMap<AttributeId, AttributeFormat> = IndexMap::new();

        for setting in context.attribute_settings() {
            let format = match formats.entry(setting.attribute_id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let (attribute, entity) = context
                        .model()
                        .resolve(setting.attribute_id.as_str())
                        .ok_or_else(|| {
                            context.configuration_error(format!(
                                "attribute '{}' is not part of the input model",
                                setting.attribute_id
                            ))
                        })?;
                    entry.insert(AttributeFormat::new(attribute.clone(), entity.clone()))
                }
            };

            let invalid = |what: &str| {
                context.configuration_error(format!(
                    "invalid {} '{}' for attribute '{}'",
                    what, setting.value, setting.attribute_id
                ))
            };

            if setting.name.eq_ignore_ascii_case(ATTRIBUTE_ORDINAL) {
                format.ordinal = setting.value.trim().parse().map_err(|_| invalid("ordinal"))?;
            } else if setting.name.eq_ignore_ascii_case(ATTRIBUTE_LENGTH) {
                format.length = setting.value.trim().parse().map_err(|_| invalid("length"))?;
            } else if setting.name.eq_ignore_ascii_case(ATTRIBUTE_FORMAT_FUNCTION) {
                let expression = setting.value.trim();
                format.format_expression =
                    (!expression.is_empty()).then(|| expression.to_string());
            } else {
                return Err(context.configuration_error(format!(
                    "unknown attribute setting '{}' for attribute '{}'",
                    setting.name, setting.attribute_id
                )));
            }
        }

        let mut formats: Vec<AttributeFormat> = formats.into_values().collect();
        formats.sort_by_key(|format| format.ordinal);
        Ok(formats)
    }

    fn header_line(&self) -> String {
        self.formats
            .iter()
            .map(|format| fit(&format.attribute.name, format.length, self.truncate))
            .collect()
    }

    fn field_value(&self, format: &AttributeFormat, record: &EntityRecord) -> Value {
        let raw = record.value(format.attribute_id().as_str());

        let (Some(expression), Some(evaluator)) = (&format.format_expression, &self.evaluator) else {
            return raw.clone();
        };

        let input = Evaluation {
            attribute: &format.attribute,
            value: raw,
            entity: &format.entity,
            record,
            expression,
        };

        match evaluator.evaluate(&input) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    step = %self.step_id,
                    attribute = %format.attribute.id,
                    "format expression failed, writing empty field: {:#}",
                    e
                );
                Value::Null
            }
        }
    }

    fn record_line(&self, record: &EntityRecord) -> String {
        self.formats
            .iter()
            .map(|format| {
                let value = self.field_value(format, record);
                fit(&value.to_string(), format.length, self.truncate)
            })
            .collect()
    }
}

#[async_trait]
impl ComponentRuntime for FixedLengthFormatter {
    async fn start(&mut self, worker_index: usize, context: ComponentContext) -> Result<()> {
        self.write_header = context.settings().is(WRITE_HEADER);
        self.truncate = context.settings().is(TRUNCATE);

        let formats = Self::resolve_formats(&context)?;
        if formats.is_empty() {
            return Err(context
                .configuration_error("there are no format attributes configured")
                .into());
        }

        self.formats = formats;
        self.step_id = context.step_id().clone();
        self.worker_index = worker_index;
        self.statistics = Some(context.statistics().clone());
        self.evaluator = Some(context.evaluator().clone());
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

        let records = message.records();
        let mut lines = Vec::with_capacity(records.len() + 1);

        if self.write_header {
            lines.push(self.header_line());
        }

        for record in records {
            let line = self.record_line(record);
            debug!(step = %self.step_id, "generated record: {}", line);
            if let Some(statistics) = &self.statistics {
                statistics.increment_entities_processed(self.worker_index);
            }
            lines.push(line);
        }

        sink.send(None, Payload::Text(lines), unit_of_work_boundary).await
    }

    async fn stop(&mut self) -> Result<()> {
        self.formats.clear();
        Ok(())
    }
}
