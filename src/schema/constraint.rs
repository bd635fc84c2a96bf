//! Constraint descriptors and the per-column constraint builder.

use crate::properties::PropertySet;

/// The rule a constraint enforces. Determines which optional fields of
/// [`Constraint`] are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Check,
    NotNull,
    Unique,
    PrimaryKey,
    ForeignKey,
    Exclude,
}

impl ConstraintKind {
    /// Parse a table-level declaration kind. Unknown names yield `None` and
    /// are skipped silently by the composite builder.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "check" => Some(ConstraintKind::Check),
            "notnull" | "not_null" => Some(ConstraintKind::NotNull),
            "unique" => Some(ConstraintKind::Unique),
            "primarykey" | "pk" => Some(ConstraintKind::PrimaryKey),
            "foreignkey" | "fk" => Some(ConstraintKind::ForeignKey),
            "exclude" => Some(ConstraintKind::Exclude),
            _ => None,
        }
    }

    /// Suffix used in generated constraint identifiers
    /// (`{table}_{fields}_{suffix}`).
    pub fn suffix(&self) -> &'static str {
        match self {
            ConstraintKind::Check => "check",
            ConstraintKind::NotNull => "notnull",
            ConstraintKind::Unique => "unique",
            ConstraintKind::PrimaryKey => "pkey",
            ConstraintKind::ForeignKey => "fkey",
            ConstraintKind::Exclude => "exclude",
        }
    }
}

/// A typed rule attached to one or more columns (by storage name).
///
/// The column list is never empty. `statement` carries the check
/// expression, foreign-key target, or exclusion operator class depending on
/// the kind; the referential actions are meaningful for foreign keys only.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    pub statement: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl Constraint {
    fn bare(kind: ConstraintKind, column: &str) -> Self {
        Constraint {
            kind,
            columns: vec![column.to_string()],
            statement: None,
            on_delete: None,
            on_update: None,
        }
    }

    pub fn not_null(column: &str) -> Self {
        Constraint::bare(ConstraintKind::NotNull, column)
    }

    pub fn unique(column: &str) -> Self {
        Constraint::bare(ConstraintKind::Unique, column)
    }

    pub fn primary_key(column: &str) -> Self {
        Constraint::bare(ConstraintKind::PrimaryKey, column)
    }

    /// Check constraint from the column's `check` property. An empty or
    /// absent expression skips the whole constraint.
    pub fn check(column: &str, props: &mut PropertySet) -> Option<Self> {
        let (expr, _) = props.pop_str("check", "");
        if expr.is_empty() {
            return None;
        }
        Some(Constraint {
            statement: Some(expr),
            ..Constraint::bare(ConstraintKind::Check, column)
        })
    }

    /// Foreign-key constraint from the column's `fk`/`foreignkey` property
    /// (either alias accepted), with optional `ondelete`/`onupdate` actions.
    pub fn foreign_key(column: &str, props: &mut PropertySet) -> Option<Self> {
        let (on_delete, od_found) = props.pop_str("ondelete", "");
        let (on_update, ou_found) = props.pop_str("onupdate", "");
        let target = match props.pop_str("fk", "") {
            (t, true) if !t.is_empty() => t,
            _ => match props.pop_str("foreignkey", "") {
                (t, true) if !t.is_empty() => t,
                _ => return None,
            },
        };
        Some(Constraint {
            statement: Some(target),
            on_delete: (od_found && !on_delete.is_empty()).then_some(on_delete),
            on_update: (ou_found && !on_update.is_empty()).then_some(on_update),
            ..Constraint::bare(ConstraintKind::ForeignKey, column)
        })
    }

    /// Exclusion constraint from the column's `exclude` property (an
    /// operator-class expression). Skipped when empty.
    pub fn exclude(column: &str, props: &mut PropertySet) -> Option<Self> {
        let (expr, _) = props.pop_str("exclude", "");
        if expr.is_empty() {
            return None;
        }
        Some(Constraint {
            statement: Some(expr),
            ..Constraint::bare(ConstraintKind::Exclude, column)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_skipped_when_expression_empty() {
        let mut props = PropertySet::parse("check=").unwrap();
        assert!(Constraint::check("age", &mut props).is_none());
        let mut props = PropertySet::parse("size=4").unwrap();
        assert!(Constraint::check("age", &mut props).is_none());
    }

    #[test]
    fn test_check_carries_expression() {
        let mut props = PropertySet::parse("check=(age>18)").unwrap();
        let c = Constraint::check("age", &mut props).unwrap();
        assert_eq!(c.statement.as_deref(), Some("(age>18)"));
        assert_eq!(c.columns, vec!["age"]);
        assert!(!props.has_key("check"));
    }

    #[test]
    fn test_foreign_key_accepts_either_alias() {
        let mut props = PropertySet::parse("fk=users.id").unwrap();
        let c = Constraint::foreign_key("user_id", &mut props).unwrap();
        assert_eq!(c.statement.as_deref(), Some("users.id"));

        let mut props = PropertySet::parse("foreignkey=users.id,ondelete=CASCADE").unwrap();
        let c = Constraint::foreign_key("user_id", &mut props).unwrap();
        assert_eq!(c.statement.as_deref(), Some("users.id"));
        assert_eq!(c.on_delete.as_deref(), Some("CASCADE"));
        assert_eq!(c.on_update, None);
    }

    #[test]
    fn test_kind_parse_unknown_is_none() {
        assert_eq!(ConstraintKind::parse("fulltext"), None);
        assert_eq!(ConstraintKind::parse("UNIQUE"), Some(ConstraintKind::Unique));
        assert_eq!(ConstraintKind::parse("pk"), Some(ConstraintKind::PrimaryKey));
    }
}
