//! # oxide-spec
//!
//! Declarative query specs bound to a table as named capabilities.
//!
//! This crate provides:
//! - JSON-serializable specs for queries, selects, updates, deletes,
//!   aggregates, compounds and inserts
//! - Parameter derivation: every placeholder a spec needs, typed from the
//!   table metadata
//! - `Factory`, a per-table registry of named capabilities with a render
//!   cache, safe to share between threads
//! - `CapabilityExecutor`, which binds named values and runs capabilities
//!   against SQLite through sqlx
//!
//! ## Quick Start
//!
//! ```rust
//! use oxide_spec::spec::{ConditionSpec, QuerySpec};
//! use oxide_spec::{CapabilityKind, Factory, QueryCapability};
//! use oxide_spec_core::{FieldMeta, TableMeta};
//!
//! let users = TableMeta::new("users")
//!     .field(FieldMeta::new("id", "integer").primary_key())
//!     .field(FieldMeta::new("email", "string"))
//!     .field(FieldMeta::new("age", "integer"));
//! let factory = Factory::new(users).unwrap();
//!
//! let adults = QuerySpec {
//!     filter: vec![ConditionSpec::simple("age", ">=", "min_age")],
//!     ..QuerySpec::default()
//! };
//! factory
//!     .add_query(QueryCapability::new("adults", adults).description("Adult users"))
//!     .unwrap();
//!
//! let rendered = factory.render(CapabilityKind::Query, "adults").unwrap();
//! assert_eq!(rendered.sql, "SELECT * FROM users WHERE age >= ?");
//!
//! let params = factory.params(CapabilityKind::Query, "adults").unwrap();
//! assert_eq!(params[0].name, "min_age");
//! assert_eq!(params[0].param_type, "integer");
//! ```

pub mod builders;
pub mod capability;
pub mod config;
pub mod error;
mod events;
pub mod exec;
pub mod factory;
pub mod params;
pub mod spec;
pub mod translate;

pub use capability::{
    AggregateCapability, AnyCapability, CapabilityKind, CapabilitySummary, Catalog,
    DeleteCapability, QueryCapability, SelectCapability, UpdateCapability,
};
pub use config::{FactoryConfig, DEFAULT_MAX_CONDITION_DEPTH};
pub use error::{Result, SpecError};
pub use exec::{CapabilityExecutor, Prepared};
pub use factory::Factory;
pub use params::{ParamDeriver, ParamSpec, Params};

/// Re-export of the builder crate.
pub use oxide_spec_core as core;
