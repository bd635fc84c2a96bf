//! Procedural macros for the Ballast mapping core.
//!
//! This crate provides the `Record` and `Embedded` derives. They are thin
//! front ends: the field annotation stays a raw string (`#[sql("...")]`)
//! that the runtime property parser interprets during schema reflection;
//! the macros only collect field names, types and annotations into
//! descriptor lists and generate the dynamic get/set plumbing.

mod attributes;
mod fields;
mod record;
mod utils;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for a table-owning mapped type.
///
/// Generates the `Fields` and `Record` trait implementations, plus an empty
/// `Hooks` implementation unless the type opts out with
/// `#[record(custom_hooks)]`.
///
/// # Attributes
///
/// - struct level: `#[record(table = "crews", ignore = "a,b",
///   custom_hooks)]`, repeated `#[constraint(kind = "unique",
///   fields = "first_name,last_name", statement = "...")]` and
///   `#[index(kind = "btree", fields = "region,age")]`
/// - field level: `#[sql("size=80,unique,nullable=false")]` carrying the
///   raw annotation; `#[sql("-")]` excludes the field; the `embed` property
///   flattens a composite field that itself derives `Embedded` or `Record`.
///
/// The type must also implement `Default`.
#[proc_macro_derive(Record, attributes(record, sql, constraint, index))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand_record(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive macro for an embedded composite: generates the `Fields`
/// implementation only, so the type can be flattened into a record with
/// `#[sql("embed")]`.
#[proc_macro_derive(Embedded, attributes(sql))]
pub fn derive_embedded(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand_embedded(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
