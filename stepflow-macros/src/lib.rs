use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod component_meta;
use component_meta::{parse_component_info, parse_settings};

/// Registers a component type with the runtime's registry.
///
/// The struct must implement `Default` and `ComponentRuntime`. Every field
/// tagged `#[setting(...)]` contributes a `SettingSchema` to the generated
/// `ComponentDefinition`.
#[proc_macro_derive(Component, attributes(component_meta, setting))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let info = match parse_component_info(&input) {
        Ok(info) => info,
        Err(e) => return e.write_errors().into(),
    };

    let fields = match parse_settings(&input) {
        Ok(fields) => fields,
        Err(e) => return e.write_errors().into(),
    };

    let struct_name = &input.ident;
    let type_name = &info.type_name;
    let category = &info.category;

    let settings = fields.iter().filter_map(|f| {
        let field_name = f.ident.as_ref()?.to_string();
        let key = f.key.clone().unwrap_or(field_name);
        let data_type = f
            .data_type
            .clone()
            .unwrap_or_else(|| extract_type_name(&f.ty).to_string());
        let required = f.required;

        let default = match &f.default {
            Some(value) => quote! { Some(#value.to_string()) },
            None => quote! { None },
        };

        Some(quote! {
            ::stepflow::registry::SettingSchema {
                key: #key.to_string(),
                data_type: #data_type.to_string(),
                default: #default,
                required: #required,
            }
        })
    });

    let lowered = struct_name.to_string().to_lowercase();

    let mod_name = syn::Ident::new(
        &format!("__component_registration_{}", lowered),
        struct_name.span(),
    );

    let factory_fn_name = syn::Ident::new(
        &format!("create_definition_{}", lowered),
        struct_name.span(),
    );

    let expanded = quote! {
        #[doc(hidden)]
        mod #mod_name {
            use super::*;

            fn #factory_fn_name() -> ::stepflow::registry::ComponentDefinition {
                ::stepflow::registry::ComponentDefinition {
                    type_name: #type_name.to_string(),
                    category: #category.to_string(),
                    settings: vec![#(#settings),*],
                    factory: || Box::new(#struct_name::default()),
                }
            }

            ::stepflow::inventory::submit! {
                ::stepflow::registry::ComponentDefinitionFactoryWrapper(#factory_fn_name)
            }
        }
    };

    TokenStream::from(expanded)
}

fn extract_type_name(ty: &syn::Type) -> &'static str {
    let type_str = quote!(#ty).to_string();

    if type_str.contains("f64") || type_str.contains("f32") {
        "number"
    } else if type_str.contains("u32") || type_str.contains("i32")
        || type_str.contains("u64") || type_str.contains("i64")
        || type_str.contains("usize") || type_str.contains("isize") {
        "integer"
    } else if type_str.contains("StepId") {
        "step"
    } else if type_str.contains("AttributeId") {
        "attribute"
    } else if type_str.contains("String") || type_str.contains("str") {
        "string"
    } else if type_str.contains("bool") {
        "boolean"
    } else {
        "unknown"
    }
}
