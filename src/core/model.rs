use super::{AttributeId, ComponentError, EntityId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntity {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAttribute {
    pub id: AttributeId,
    pub entity_id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// Serialized form of a [`Model`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub entities: Vec<ModelEntity>,
    #[serde(default)]
    pub attributes: Vec<ModelAttribute>,
}

/// Data model that components resolve attribute ids against at start.
///
/// Built once and validated: every attribute belongs to a known entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ModelDocument", into = "ModelDocument")]
pub struct Model {
    entities: IndexMap<EntityId, ModelEntity>,
    attributes: IndexMap<AttributeId, ModelAttribute>,
}

impl Model {
    pub fn new(
        entities: impl IntoIterator<Item = ModelEntity>,
        attributes: impl IntoIterator<Item = ModelAttribute>,
    ) -> Result<Self, ComponentError> {
        let entities: IndexMap<EntityId, ModelEntity> = entities
            .into_iter()
            .map(|entity| (entity.id.clone(), entity))
            .collect();

        let mut indexed = IndexMap::new();
        for attribute in attributes {
            if !entities.contains_key(&attribute.entity_id) {
                return Err(ComponentError::InvalidModel(format!(
                    "attribute '{}' references unknown entity '{}'",
                    attribute.id, attribute.entity_id
                )));
            }
            if indexed.contains_key(&attribute.id) {
                return Err(ComponentError::InvalidModel(format!(
                    "duplicate attribute id '{}'",
                    attribute.id
                )));
            }
            indexed.insert(attribute.id.clone(), attribute);
        }

        Ok(Self {
            entities,
            attributes: indexed,
        })
    }

    pub fn attribute(&self, id: &str) -> Option<&ModelAttribute> {
        self.attributes.get(id)
    }

    pub fn entity(&self, id: &str) -> Option<&ModelEntity> {
        self.entities.get(id)
    }

    /// Resolves an attribute together with its owning entity.
    pub fn resolve(&self, id: &str) -> Option<(&ModelAttribute, &ModelEntity)> {
        let attribute = self.attribute(id)?;
        let entity = self.entity(attribute.entity_id.as_str())?;
        Some((attribute, entity))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &ModelAttribute> {
        self.attributes.values()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl TryFrom<ModelDocument> for Model {
    type Error = ComponentError;

    fn try_from(document: ModelDocument) -> Result<Self, Self::Error> {
        Model::new(document.entities, document.attributes)
    }
}

impl From<Model> for ModelDocument {
    fn from(model: Model) -> Self {
        ModelDocument {
            entities: model.entities.into_values().collect(),
            attributes: model.attributes.into_values().collect(),
        }
    }
}
