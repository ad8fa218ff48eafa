use crate::core::{ComponentRuntime, Settings};
use serde::{Deserialize, Serialize};

/// Schema of one named setting a component reads at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingSchema {
    pub key: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
}

/// Factory function type for creating component instances
pub type ComponentFactory = fn() -> Box<dyn ComponentRuntime>;

/// Complete metadata for a component type
#[derive(Clone)]
pub struct ComponentDefinition {
    pub type_name: String,
    pub category: String,
    pub settings: Vec<SettingSchema>,
    pub factory: ComponentFactory,
}

impl ComponentDefinition {
    /// Create a new, unstarted instance of this component type
    pub fn create_instance(&self) -> Box<dyn ComponentRuntime> {
        (self.factory)()
    }

    pub fn setting(&self, key: &str) -> Option<&SettingSchema> {
        self.settings.iter().find(|s| s.key == key)
    }

    /// Keys of required settings that are absent or blank in `settings`.
    pub fn missing_required<'a>(&'a self, settings: &Settings) -> Vec<&'a str> {
        self.settings
            .iter()
            .filter(|s| s.required && settings.get_non_blank(&s.key).is_none())
            .map(|s| s.key.as_str())
            .collect()
    }

    /// Keys in `settings` that the component does not declare, sorted.
    pub fn unknown_settings<'a>(&self, settings: &'a Settings) -> Vec<&'a str> {
        let mut unknown: Vec<&str> = settings
            .iter()
            .map(|(key, _)| key)
            .filter(|key| self.setting(key).is_none())
            .collect();
        unknown.sort_unstable();
        unknown
    }
}

impl std::fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("type_name", &self.type_name)
            .field("category", &self.category)
            .field("settings", &self.settings)
            .finish()
    }
}

// Factory type for creating component definitions at runtime
pub type ComponentDefinitionFactory = fn() -> ComponentDefinition;

// Wrapper for inventory collection
pub struct ComponentDefinitionFactoryWrapper(pub ComponentDefinitionFactory);

// Inventory submission type
inventory::collect!(ComponentDefinitionFactoryWrapper);
