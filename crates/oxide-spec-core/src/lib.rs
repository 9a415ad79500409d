//! # oxide-spec-core
//!
//! Parameterized SQL builders and table metadata.
//!
//! This crate provides:
//! - Fluent builders for SELECT, UPDATE, DELETE, INSERT, single-value
//!   aggregates and set-operation compounds
//! - Named parameters: statements render to SQL with `?` placeholders plus
//!   the ordered list of parameter names they bind
//! - Table metadata (`TableMeta`, `FieldMeta`) and the `Model` trait
//!   implemented by `#[derive(Model)]`
//!
//! ## SQL Injection Prevention
//!
//! Values never appear in SQL text. Identifiers and operators are checked
//! against an allow-list when a statement renders:
//!
//! ```rust
//! use oxide_spec_core::builder::{Filter, Select};
//!
//! let rendered = Select::from("users")
//!     .columns(["id"])
//!     .where_cond("name", "=", "name")
//!     .render()
//!     .unwrap();
//! assert_eq!(rendered.sql, "SELECT id FROM users WHERE name = ?");
//!
//! assert!(Select::from("users; DROP TABLE users").render().is_err());
//! ```

pub mod builder;
pub mod schema;

pub use builder::{
    col, Aggregate, AggregateFunc, BuildError, Compound, Condition, Delete, Filter, Insert,
    Rendered, Select, SqlValue, Update,
};
pub use schema::{FieldMeta, Model, TableMeta, ANY_TYPE};
