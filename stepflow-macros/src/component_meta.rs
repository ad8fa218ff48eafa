use darling::{FromAttributes, FromField};
use syn::{DeriveInput, Fields};

/// Parsed attributes from #[component_meta(...)]
#[derive(Debug, FromAttributes)]
#[darling(attributes(component_meta))]
pub struct ComponentMetaArgs {
    pub type_name: String,
    pub category: String,
}

/// Parsed attributes from #[setting(...)]
#[derive(Debug, FromField)]
#[darling(attributes(setting))]
pub struct SettingField {
    pub ident: Option<syn::Ident>,
    pub ty: syn::Type,

    /// Key under which the setting appears in the step's flat settings map.
    /// Falls back to the field name.
    #[darling(default)]
    pub key: Option<String>,

    #[darling(default)]
    pub default: Option<String>,

    #[darling(default)]
    pub data_type: Option<String>,

    #[darling(default)]
    pub required: bool,
}

pub fn parse_component_info(input: &DeriveInput) -> darling::Result<ComponentMetaArgs> {
    ComponentMetaArgs::from_attributes(&input.attrs)
}

pub fn parse_settings(input: &DeriveInput) -> darling::Result<Vec<SettingField>> {
    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Ok(Vec::new()),
        },
        _ => return Ok(Vec::new()),
    };

    fields
        .iter()
        .filter(|f| f.attrs.iter().any(|attr| attr.path().is_ident("setting")))
        .map(SettingField::from_field)
        .collect()
}
