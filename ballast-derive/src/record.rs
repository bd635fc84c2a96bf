//! Generation of the `Record` and `Hooks` trait implementations.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::DeriveInput;

use crate::attributes;
use crate::fields;
use crate::utils;

pub fn expand_record(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let infos = fields::collect_fields(input)?;
    let fields_impl = fields::expand_fields_impl(input, &infos);

    let attrs = attributes::extract_record_attrs(&input.attrs)?;
    let constraints = attributes::extract_constraints(&input.attrs)?;
    let indexes = attributes::extract_indexes(&input.attrs)?;

    let struct_name = &input.ident;
    let table = attrs
        .table
        .unwrap_or_else(|| utils::snake_case(&struct_name.to_string()));

    let ignored = attrs.ignore.iter().map(|s| quote! { #s });
    let constraint_items = constraints.iter().map(|c| {
        let kind = &c.kind;
        let fields = &c.fields;
        let statement = &c.statement;
        quote! {
            ::ballast::CompositeConstraint {
                kind: #kind,
                fields: #fields,
                statement: #statement,
            }
        }
    });
    let index_items = indexes.iter().map(|i| {
        let kind = &i.kind;
        let fields = &i.fields;
        quote! {
            ::ballast::CompositeIndex {
                kind: #kind,
                fields: #fields,
            }
        }
    });

    let hooks_impl = if attrs.custom_hooks {
        quote! {}
    } else {
        quote! {
            impl ::ballast::Hooks for #struct_name {}
        }
    };

    Ok(quote! {
        #fields_impl

        impl ::ballast::Record for #struct_name {
            fn table_name() -> &'static str {
                #table
            }

            fn ignored() -> ::std::vec::Vec<&'static str> {
                ::std::vec![ #(#ignored),* ]
            }

            fn constraints() -> ::std::vec::Vec<::ballast::CompositeConstraint> {
                ::std::vec![ #(#constraint_items),* ]
            }

            fn indexes() -> ::std::vec::Vec<::ballast::CompositeIndex> {
                ::std::vec![ #(#index_items),* ]
            }
        }

        #hooks_impl
    })
}

pub fn expand_embedded(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let infos = fields::collect_fields(input)?;
    Ok(fields::expand_fields_impl(input, &infos))
}
