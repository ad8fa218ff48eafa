use super::{AttributeId, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

static NULL: Value = Value::Null;

/// Ordered mapping from attribute id to value; one row of payload data.
///
/// Records are shared between downstream consumers, so a consumer that needs
/// a modified record clones it first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRecord(IndexMap<AttributeId, Value>);

impl EntityRecord {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn get(&self, attribute_id: &str) -> Option<&Value> {
        self.0.get(attribute_id)
    }

    /// Value of `attribute_id`, or null when the record does not carry it.
    pub fn value(&self, attribute_id: &str) -> &Value {
        self.0.get(attribute_id).unwrap_or(&NULL)
    }

    /// Inserts or overwrites a field. A new attribute goes to the end; an
    /// existing one keeps its position.
    pub fn insert(&mut self, attribute_id: impl Into<AttributeId>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(attribute_id.into(), value.into())
    }

    pub fn with(mut self, attribute_id: impl Into<AttributeId>, value: impl Into<Value>) -> Self {
        self.insert(attribute_id, value);
        self
    }

    pub fn contains(&self, attribute_id: &str) -> bool {
        self.0.contains_key(attribute_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeId, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for EntityRecord
where
    K: Into<AttributeId>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
