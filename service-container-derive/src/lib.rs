//! Derive macro for service-container
//!
//! `#[derive(Reflect)]` generates the constructor metadata the container
//! autowires from: one parameter per named field, in declaration order, and a
//! constructor that converts the resolved arguments back into the struct.
//!
//! # Example
//!
//! ```rust,ignore
//! use service_container::{Container, Reflect};
//! use std::sync::Arc;
//!
//! #[derive(Reflect)]
//! #[class(name = "App\\Logger")]
//! struct Logger;
//!
//! #[derive(Reflect)]
//! struct Mailer {
//!     host: String,
//!     #[param(default = 25)]
//!     port: i64,
//!     logger: Arc<Logger>,
//!     // Not a constructor parameter, filled with Default::default()
//!     #[param(skip)]
//!     sent: u64,
//! }
//!
//! let container = Container::new();
//! container.register::<Logger>();
//! container.register::<Mailer>();
//! container.set_parameter("host", "smtp.local");
//!
//! let mailer = container.get("Mailer").unwrap();
//! ```
//!
//! # Attributes
//!
//! - `#[class(name = "...")]` - Class name to register under (defaults to the struct name)
//! - `#[param(default = expr)]` - Default used when nothing else supplies the parameter
//! - `#[param(name = "...")]` - Parameter name (defaults to the field name)
//! - `#[param(skip)]` - Leave the field out of the constructor

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, LitStr, parse_macro_input};

#[proc_macro_derive(Reflect, attributes(class, param))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic types",
        ));
    }

    let class_name = match class_name(&input.attrs)? {
        Some(lit) => lit.value(),
        None => name.to_string(),
    };

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "Reflect can only be derived for structs"));
    };

    let mut params = Vec::new();
    let body = match &data.fields {
        Fields::Unit => quote! { Self },
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Reflect requires named fields: parameters are matched by name",
            ));
        }
        Fields::Named(fields) => {
            let mut inits = Vec::new();
            let mut index = 0usize;

            for field in &fields.named {
                let Some(field_name) = field.ident.as_ref() else {
                    continue;
                };
                let ty = &field.ty;
                let attr = ParamAttr::parse(&field.attrs)?;

                if attr.skip {
                    inits.push(quote! { #field_name: ::std::default::Default::default() });
                    continue;
                }

                let param_name = attr.name.map(|lit| lit.value()).unwrap_or_else(|| field_name.to_string());
                let with_default = attr.default.map(|expr| quote! { .with_default(#expr) });
                params.push(quote! {
                    .param(::service_container::Param::of::<#ty>(#param_name) #with_default)
                });
                inits.push(quote! {
                    #field_name: <#ty as ::service_container::FromValue>::from_value(
                        ::service_container::argument(args, #index)
                    )?
                });
                index += 1;
            }

            quote! { Self { #(#inits),* } }
        }
    };

    let args = if params.is_empty() { quote! { _args } } else { quote! { args } };

    Ok(quote! {
        impl ::service_container::Reflect for #name {
            fn class_name() -> &'static str {
                #class_name
            }

            fn class_info() -> ::service_container::ClassInfo {
                ::service_container::ClassInfo::new(#class_name)
                    #(#params)*
                    .constructor(|#args: &[::service_container::Value]| {
                        ::std::result::Result::Ok(::service_container::Value::object(#class_name, #body))
                    })
            }
        }
    })
}

fn class_name(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("class")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

#[derive(Default)]
struct ParamAttr {
    skip: bool,
    name: Option<LitStr>,
    default: Option<Expr>,
}

impl ParamAttr {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("param")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                } else if meta.path.is_ident("name") {
                    parsed.name = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("default") {
                    parsed.default = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("expected `skip`, `name = \"...\"` or `default = expr`"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}
