//! Structured events emitted through `tracing`.
//!
//! Registry events carry the table and, where relevant, the capability
//! kind and name as fields. Events are observational only.

use tracing::{debug, info, warn};

use crate::capability::CapabilityKind;

pub(crate) fn factory_created(table: &str, primary_key: &[&str], max_depth: usize) {
    info!(table, primary_key = ?primary_key, max_depth, "capability factory created");
}

pub(crate) fn capability_added(table: &str, kind: CapabilityKind, name: &str, params: usize) {
    info!(table, kind = %kind, capability = name, params, "capability added");
}

pub(crate) fn capability_removed(table: &str, kind: CapabilityKind, name: &str) {
    info!(table, kind = %kind, capability = name, "capability removed");
}

pub(crate) fn capability_not_found(table: &str, kind: CapabilityKind, name: &str) {
    warn!(table, kind = %kind, capability = name, "capability not found");
}

pub(crate) fn executor_created(table: &str) {
    info!(table, "capability executor created");
}

pub(crate) fn cache_hit(table: &str, kind: CapabilityKind, name: &str) {
    debug!(table, kind = %kind, capability = name, "render cache hit");
}

pub(crate) fn cache_miss(table: &str, kind: CapabilityKind, name: &str) {
    debug!(table, kind = %kind, capability = name, "render cache miss");
}

pub(crate) fn statement_executed(capability: &str, sql: &str, params: usize) {
    debug!(capability, sql, params, "statement executed");
}
