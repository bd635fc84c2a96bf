//! Generation of the `Fields` trait implementation.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields as SynFields};

use crate::attributes;

/// Everything the generators need to know about one struct field.
pub struct FieldInfo<'a> {
    pub ident: &'a syn::Ident,
    pub name: String,
    pub ty: &'a syn::Type,
    pub annotation: String,
    pub embedded: bool,
}

pub fn collect_fields(input: &DeriveInput) -> syn::Result<Vec<FieldInfo<'_>>> {
    let fields = match &input.data {
        Data::Struct(syn::DataStruct {
            fields: SynFields::Named(named),
            ..
        }) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Record can only be derived for structs with named fields",
            ));
        }
    };
    let mut infos = Vec::new();
    for field in fields {
        let ident = field.ident.as_ref().expect("named field has an ident");
        let annotation = attributes::extract_annotation(field)?.unwrap_or_default();
        // Top-level token scan is enough to spot the embed marker; the
        // runtime parser handles the full nesting-aware grammar.
        let embedded = annotation
            .split(',')
            .any(|t| t.trim() == "embed" || t.trim().starts_with("embed="));
        infos.push(FieldInfo {
            ident,
            name: ident.to_string(),
            ty: &field.ty,
            annotation,
            embedded,
        });
    }
    Ok(infos)
}

pub fn expand_fields_impl(input: &DeriveInput, infos: &[FieldInfo<'_>]) -> TokenStream2 {
    let struct_name = &input.ident;

    let descriptors = infos.iter().map(|f| {
        let name = &f.name;
        let annotation = &f.annotation;
        let ty = f.ty;
        if f.embedded {
            quote! {
                ::ballast::FieldDescriptor::embed(
                    #name,
                    #annotation,
                    <#ty as ::ballast::Fields>::fields,
                )
            }
        } else {
            quote! {
                ::ballast::FieldDescriptor::new(
                    #name,
                    #annotation,
                    <#ty as ::ballast::SqlKind>::kind(),
                    <#ty as ::ballast::SqlKind>::declare,
                )
            }
        }
    });

    let get_arms = infos.iter().filter(|f| !f.embedded).map(|f| {
        let name = &f.name;
        let ident = f.ident;
        quote! {
            #name => ::std::option::Option::Some(::ballast::Value::from(self.#ident.clone())),
        }
    });

    let set_arms = infos.iter().filter(|f| !f.embedded).map(|f| {
        let name = &f.name;
        let ident = f.ident;
        quote! {
            #name => {
                self.#ident = ::ballast::FromValue::from_value(value)?;
                ::std::result::Result::Ok(())
            }
        }
    });

    let embed_gets = infos.iter().filter(|f| f.embedded).map(|f| {
        let ident = f.ident;
        quote! {
            if let ::std::option::Option::Some(v) =
                ::ballast::Fields::get(&self.#ident, field)
            {
                return ::std::option::Option::Some(v);
            }
        }
    });

    let embed_sets = infos.iter().filter(|f| f.embedded).map(|f| {
        let ident = f.ident;
        let ty = f.ty;
        quote! {
            if <#ty as ::ballast::Fields>::has_field(field) {
                return ::ballast::Fields::set(&mut self.#ident, field, value.clone());
            }
        }
    });

    quote! {
        impl ::ballast::Fields for #struct_name {
            fn fields() -> ::std::vec::Vec<::ballast::FieldDescriptor> {
                ::std::vec![ #(#descriptors),* ]
            }

            fn get(&self, field: &str) -> ::std::option::Option<::ballast::Value> {
                match field {
                    #(#get_arms)*
                    _ => {
                        #(#embed_gets)*
                        ::std::option::Option::None
                    }
                }
            }

            fn set(
                &mut self,
                field: &str,
                value: ::ballast::Value,
            ) -> ::std::result::Result<(), ::ballast::Error> {
                match field {
                    #(#set_arms)*
                    _ => {
                        #(#embed_sets)*
                        ::std::result::Result::Err(::ballast::Error::query(
                            ::std::format!("unknown field '{}'", field),
                        ))
                    }
                }
            }
        }
    }
}
