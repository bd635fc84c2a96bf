//! Index descriptors.

/// Index access method. Mirrors the PostgreSQL index types; backends that
/// support fewer methods ignore or reject what they cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    BTree,
    Hash,
    Gist,
    SpGist,
    Gin,
    Brin,
}

impl IndexKind {
    /// Parse a table-level declaration kind. Unknown names yield `None` and
    /// are skipped silently by the composite builder.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "btree" => Some(IndexKind::BTree),
            "hash" => Some(IndexKind::Hash),
            "gist" => Some(IndexKind::Gist),
            "spgist" | "sp_gist" => Some(IndexKind::SpGist),
            "gin" => Some(IndexKind::Gin),
            "brin" => Some(IndexKind::Brin),
            _ => None,
        }
    }

    /// Access-method name as it appears in `USING <method>`.
    pub fn method(&self) -> &'static str {
        match self {
            IndexKind::BTree => "btree",
            IndexKind::Hash => "hash",
            IndexKind::Gist => "gist",
            IndexKind::SpGist => "spgist",
            IndexKind::Gin => "gin",
            IndexKind::Brin => "brin",
        }
    }
}

/// A named lookup structure over one or more columns (by storage name).
/// Names are unique within a table's index set.
#[derive(Debug, Clone)]
pub struct Index {
    pub kind: IndexKind,
    pub name: String,
    pub columns: Vec<String>,
}

impl Index {
    pub fn named(kind: IndexKind, name: impl Into<String>, columns: Vec<String>) -> Self {
        Index {
            kind,
            name: name.into(),
            columns,
        }
    }

    /// Index with the generated identifier `{table}_{f1}_{f2}..._idx`.
    pub fn generated(table: &str, kind: IndexKind, columns: Vec<String>) -> Self {
        let name = format!("{}_{}_idx", table, columns.join("_"));
        Index {
            kind,
            name,
            columns,
        }
    }
}
