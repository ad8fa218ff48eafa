use super::{EntityRecord, ModelAttribute, ModelEntity, Value};
use anyhow::Result;

/// Arguments handed to an [`ExpressionEvaluator`] for one field.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub attribute: &'a ModelAttribute,
    pub value: &'a Value,
    pub entity: &'a ModelEntity,
    pub record: &'a EntityRecord,
    pub expression: &'a str,
}

/// Evaluates per-field transform expressions. Implementations must be free
/// of side effects; the runtime may call them from any worker.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, input: &Evaluation<'_>) -> Result<Value>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&Evaluation<'_>) -> Result<Value> + Send + Sync,
{
    fn evaluate(&self, input: &Evaluation<'_>) -> Result<Value> {
        self(input)
    }
}

/// Returns the raw value unchanged. Used when no expression language is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityEvaluator;

impl ExpressionEvaluator for IdentityEvaluator {
    fn evaluate(&self, input: &Evaluation<'_>) -> Result<Value> {
        Ok(input.value.clone())
    }
}
