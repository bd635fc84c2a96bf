//! Query-description value objects.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::value::Value;

static PURE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z][A-Za-z0-9_]*$").expect("valid identifier pattern"));

/// Whether a projection string is a plain field reference (as opposed to a
/// raw expression fragment).
pub(crate) fn is_pure_field(s: &str) -> bool {
    PURE_FIELD.is_match(s)
}

/// How a filter combines with the preceding one. The first filter in a list
/// always renders as `WHERE` regardless of its conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

/// One WHERE predicate.
///
/// An empty operator marks a raw, pre-built fragment: the field string is
/// emitted verbatim and the value is unused. A reversed filter renders the
/// placeholder on the left of the operator and the field on the right
/// (e.g. `$1 < created_at`).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub conjunction: Conjunction,
    pub reversed: bool,
    pub field: String,
    pub operator: String,
    pub function: String,
    pub value: Value,
}

impl QueryFilter {
    /// Equality filter on a field.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        QueryFilter {
            conjunction: Conjunction::And,
            reversed: false,
            field: field.into(),
            operator: "=".to_string(),
            function: String::new(),
            value: value.into(),
        }
    }

    /// Filter with an explicit comparison operator.
    pub fn with_op(
        field: impl Into<String>,
        value: impl Into<Value>,
        operator: impl Into<String>,
    ) -> Self {
        QueryFilter {
            operator: operator.into(),
            ..QueryFilter::new(field, value)
        }
    }

    /// Raw, pre-built predicate fragment emitted verbatim.
    pub fn raw(fragment: impl Into<String>) -> Self {
        QueryFilter {
            operator: String::new(),
            ..QueryFilter::new(fragment, Value::Null)
        }
    }

    pub fn or(mut self) -> Self {
        self.conjunction = Conjunction::Or;
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Wrap the value placeholder in a SQL function call.
    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Asc,
    Desc,
}

/// One ORDER BY entry. The string form `"-field"` parses as descending.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOrder {
    pub kind: OrderKind,
    pub field: String,
}

impl QueryOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        QueryOrder {
            kind: OrderKind::Asc,
            field: field.into(),
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        QueryOrder {
            kind: OrderKind::Desc,
            field: field.into(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.strip_prefix('-') {
            Some(rest) => QueryOrder::desc(rest),
            None => QueryOrder::asc(s),
        }
    }
}

/// One projection entry: a field reference, optionally wrapped in a
/// function, optionally aliased.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryColumn {
    pub field: String,
    pub function: String,
    pub alias: String,
}

impl QueryColumn {
    pub fn named(field: impl Into<String>) -> Self {
        QueryColumn {
            field: field.into(),
            ..QueryColumn::default()
        }
    }

    pub fn aliased(field: impl Into<String>, alias: impl Into<String>) -> Self {
        QueryColumn {
            field: field.into(),
            alias: alias.into(),
            ..QueryColumn::default()
        }
    }

    pub fn function(function: impl Into<String>, field: impl Into<String>) -> Self {
        QueryColumn {
            field: field.into(),
            function: function.into(),
            ..QueryColumn::default()
        }
    }

    /// Render the projection fragment. Plain field references are quoted;
    /// anything else is emitted verbatim.
    pub fn render(&self, with_alias: bool) -> String {
        let mut s = if !self.function.is_empty() {
            format!("{}(\"{}\")", self.function, self.field)
        } else if is_pure_field(&self.field) {
            format!("\"{}\"", self.field)
        } else {
            self.field.clone()
        };
        if with_alias && !self.alias.is_empty() {
            s = format!("{} AS {}", s, self.alias);
        }
        s
    }
}

/// One SET entry of an UPDATE. An empty operator marks a raw, pre-built
/// fragment (e.g. `updated = now()`); the value is unused in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateColumn {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl UpdateColumn {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        UpdateColumn {
            field: field.into(),
            operator: "=".to_string(),
            value: value.into(),
        }
    }

    pub fn raw(fragment: impl Into<String>) -> Self {
        UpdateColumn {
            field: fragment.into(),
            operator: String::new(),
            value: Value::Null,
        }
    }
}

/// Polymorphic input to [`QuerySet::filter`](crate::QuerySet::filter):
/// a raw field fragment, a key/value mapping (each pair becomes an equality
/// filter), or pre-built filter values.
#[derive(Debug, Clone)]
pub enum FilterArg {
    Raw(String),
    Pairs(Vec<(String, Value)>),
    Filters(Vec<QueryFilter>),
}

impl From<&str> for FilterArg {
    fn from(s: &str) -> Self {
        FilterArg::Raw(s.to_string())
    }
}

impl From<String> for FilterArg {
    fn from(s: String) -> Self {
        FilterArg::Raw(s)
    }
}

impl From<QueryFilter> for FilterArg {
    fn from(f: QueryFilter) -> Self {
        FilterArg::Filters(vec![f])
    }
}

impl From<Vec<QueryFilter>> for FilterArg {
    fn from(f: Vec<QueryFilter>) -> Self {
        FilterArg::Filters(f)
    }
}

impl<V: Into<Value>> From<Vec<(&str, V)>> for FilterArg {
    fn from(pairs: Vec<(&str, V)>) -> Self {
        FilterArg::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl<V: Into<Value>> From<HashMap<String, V>> for FilterArg {
    fn from(map: HashMap<String, V>) -> Self {
        FilterArg::Pairs(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Polymorphic ORDER BY input: a field name (with the `-` descending
/// prefix) or a pre-built order.
#[derive(Debug, Clone)]
pub enum OrderArg {
    Name(String),
    Order(QueryOrder),
}

impl From<&str> for OrderArg {
    fn from(s: &str) -> Self {
        OrderArg::Name(s.to_string())
    }
}

impl From<String> for OrderArg {
    fn from(s: String) -> Self {
        OrderArg::Name(s)
    }
}

impl From<QueryOrder> for OrderArg {
    fn from(o: QueryOrder) -> Self {
        OrderArg::Order(o)
    }
}

/// Polymorphic input to [`QuerySet::update`](crate::QuerySet::update):
/// a column/value mapping or pre-built update columns.
#[derive(Debug, Clone)]
pub enum SetArg {
    Pairs(Vec<(String, Value)>),
    Columns(Vec<UpdateColumn>),
}

impl<V: Into<Value>> From<Vec<(&str, V)>> for SetArg {
    fn from(pairs: Vec<(&str, V)>) -> Self {
        SetArg::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl<V: Into<Value>> From<HashMap<String, V>> for SetArg {
    fn from(map: HashMap<String, V>) -> Self {
        SetArg::Pairs(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<Vec<UpdateColumn>> for SetArg {
    fn from(columns: Vec<UpdateColumn>) -> Self {
        SetArg::Columns(columns)
    }
}

impl From<UpdateColumn> for SetArg {
    fn from(column: UpdateColumn) -> Self {
        SetArg::Columns(vec![column])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_pure_field_is_quoted() {
        assert_eq!(QueryColumn::named("age").render(false), "\"age\"");
    }

    #[test]
    fn test_render_expression_is_verbatim() {
        assert_eq!(
            QueryColumn::named("age + 1").render(false),
            "age + 1"
        );
    }

    #[test]
    fn test_render_function_and_alias() {
        let qc = QueryColumn {
            field: "id".to_string(),
            function: "COUNT".to_string(),
            alias: "total".to_string(),
        };
        assert_eq!(qc.render(true), "COUNT(\"id\") AS total");
        assert_eq!(qc.render(false), "COUNT(\"id\")");
    }

    #[test]
    fn test_order_parse_descending_prefix() {
        assert_eq!(QueryOrder::parse("-age"), QueryOrder::desc("age"));
        assert_eq!(QueryOrder::parse("age"), QueryOrder::asc("age"));
    }

    #[test]
    fn test_filter_defaults() {
        let f = QueryFilter::new("region", "US");
        assert_eq!(f.operator, "=");
        assert_eq!(f.conjunction, Conjunction::And);
        assert!(!f.reversed);
    }

    #[test]
    fn test_raw_filter_has_no_operator() {
        let f = QueryFilter::raw("age > 18");
        assert!(f.operator.is_empty());
    }
}
