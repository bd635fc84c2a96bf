//! Attribute parsing utilities

use syn::{Attribute, Field, LitStr};

/// Struct-level `#[record(...)]` attributes.
pub struct RecordAttrs {
    pub table: Option<String>,
    pub ignore: Vec<String>,
    pub custom_hooks: bool,
}

pub fn extract_record_attrs(attrs: &[Attribute]) -> syn::Result<RecordAttrs> {
    let mut out = RecordAttrs {
        table: None,
        ignore: Vec::new(),
        custom_hooks: false,
    };
    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                out.table = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("ignore") {
                let lit: LitStr = meta.value()?.parse()?;
                out.ignore = lit
                    .value()
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                Ok(())
            } else if meta.path.is_ident("custom_hooks") {
                out.custom_hooks = true;
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute"))
            }
        })?;
    }
    Ok(out)
}

/// One `#[constraint(kind = "...", fields = "...", statement = "...")]`
/// declaration.
pub struct ConstraintAttr {
    pub kind: String,
    pub fields: String,
    pub statement: String,
}

pub fn extract_constraints(attrs: &[Attribute]) -> syn::Result<Vec<ConstraintAttr>> {
    let mut out = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("constraint") {
            continue;
        }
        let mut kind = String::new();
        let mut fields = String::new();
        let mut statement = String::new();
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("kind") {
                kind = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else if meta.path.is_ident("fields") {
                fields = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else if meta.path.is_ident("statement") {
                statement = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("unsupported constraint attribute"))
            }
        })?;
        out.push(ConstraintAttr {
            kind,
            fields,
            statement,
        });
    }
    Ok(out)
}

/// One `#[index(kind = "...", fields = "...")]` declaration.
pub struct IndexAttr {
    pub kind: String,
    pub fields: String,
}

pub fn extract_indexes(attrs: &[Attribute]) -> syn::Result<Vec<IndexAttr>> {
    let mut out = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("index") {
            continue;
        }
        let mut kind = String::new();
        let mut fields = String::new();
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("kind") {
                kind = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else if meta.path.is_ident("fields") {
                fields = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("unsupported index attribute"))
            }
        })?;
        out.push(IndexAttr { kind, fields });
    }
    Ok(out)
}

/// The raw annotation string from a field's `#[sql("...")]` attribute.
pub fn extract_annotation(field: &Field) -> syn::Result<Option<String>> {
    for attr in &field.attrs {
        if attr.path().is_ident("sql") {
            let lit: LitStr = attr.parse_args()?;
            return Ok(Some(lit.value()));
        }
    }
    Ok(None)
}
