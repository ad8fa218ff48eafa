pub mod metadata;

pub use metadata::{
    ComponentDefinition, ComponentDefinitionFactory, ComponentDefinitionFactoryWrapper,
    ComponentFactory, SettingSchema,
};

/// Every component type linked into the binary, sorted by type name.
pub fn all() -> Vec<ComponentDefinition> {
    crate::components::link_builtin();
    let mut definitions: Vec<ComponentDefinition> = inventory::iter::<ComponentDefinitionFactoryWrapper>
        .into_iter()
        .map(|wrapper| (wrapper.0)())
        .collect();
    definitions.sort_by(|a, b| a.type_name.cmp(&b.type_name));
    definitions
}

/// Finds a component type by its registered type name.
pub fn find(type_name: &str) -> Option<ComponentDefinition> {
    crate::components::link_builtin();
    inventory::iter::<ComponentDefinitionFactoryWrapper>
        .into_iter()
        .map(|wrapper| (wrapper.0)())
        .find(|definition| definition.type_name == type_name)
}
