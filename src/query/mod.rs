//! Query building: transient query descriptions and the chainable
//! [`QuerySet`].
//!
//! Filters, orders, projections and update columns are plain value objects
//! created per query and discarded after compilation. `QuerySet` is the
//! immutable, chainable description that carries them to a dialect
//! compiler and an executor.

pub mod filter;
pub mod queryset;

pub use filter::{
    Conjunction, FilterArg, OrderArg, OrderKind, QueryColumn, QueryFilter, QueryOrder,
    SetArg, UpdateColumn,
};
pub use queryset::QuerySet;
