//! Parameterized SQL builders.
//!
//! Builders never inline values. Every value position renders as a `?`
//! placeholder and is recorded by *name* in [`Rendered::params`], so the
//! same statement can be rendered once and executed many times with
//! different bindings.
//!
//! # Example
//!
//! ```rust
//! use oxide_spec_core::builder::{col, Filter, OrderTerm, Select};
//!
//! let rendered = Select::from("users")
//!     .columns(["id", "name"])
//!     .filter(col("age").gt_eq("min_age"))
//!     .order_by(OrderTerm::new("name"))
//!     .render()
//!     .unwrap();
//!
//! assert_eq!(
//!     rendered.sql,
//!     "SELECT id, name FROM users WHERE age >= ? ORDER BY name ASC"
//! );
//! assert_eq!(rendered.params, vec!["min_age"]);
//! ```
//!
//! Identifiers and operators are checked when a statement renders:
//!
//! ```rust
//! use oxide_spec_core::builder::{BuildError, Filter, Select};
//!
//! let err = Select::from("users")
//!     .where_cond("name", "= '' OR 1 =", "x")
//!     .render()
//!     .unwrap_err();
//! assert!(matches!(err, BuildError::UnsupportedOperator(_)));
//! ```

mod aggregate;
mod compound;
mod condition;
mod delete;
mod error;
mod insert;
mod render;
mod select;
mod update;
pub mod value;

pub use aggregate::{Aggregate, AggregateFunc, DEFAULT_AGGREGATE_FUNC};
pub use compound::{Compound, SetOperation};
pub use condition::{col, Column, Condition, Filter, Operand};
pub use delete::Delete;
pub use error::{BuildError, Result};
pub use insert::{ConflictAction, Insert};
pub use render::Rendered;
pub use select::{
    Bound, HavingAggregate, LockMode, NullsOrder, OrderTerm, Select, SelectExpr, SortOrder,
};
pub use update::Update;
pub use value::{SqlValue, ToSqlValue};
