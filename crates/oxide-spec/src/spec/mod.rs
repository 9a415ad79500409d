//! Declarative, JSON-serializable operation specs.
//!
//! Specs describe the shape of an operation (columns, predicates, ordering)
//! without naming a table; a [`Factory`](crate::Factory) binds them to one.

mod compound;
mod condition;
mod mutation;
mod query;

pub use compound::{CompoundQuerySpec, SetOperandSpec};
pub use condition::{ConditionSpec, Logic};
pub use mutation::{DeleteSpec, InsertSpec, UpdateSpec};
pub use query::{AggregateSpec, HavingAggSpec, OrderBySpec, QuerySpec, SelectExprSpec, SelectSpec};
