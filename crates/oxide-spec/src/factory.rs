//! The per-table capability registry and its render cache.

use std::collections::HashMap;
use std::sync::Arc;

use oxide_spec_core::builder::{AggregateFunc, Rendered};
use oxide_spec_core::schema::{Model, TableMeta};
use parking_lot::RwLock;

use crate::capability::{
    AggregateCapability, AnyCapability, Capability, CapabilityKind, CapabilitySummary, Catalog,
    DeleteCapability, QueryCapability, SelectCapability, UpdateCapability,
};
use crate::config::FactoryConfig;
use crate::error::{Result, SpecError};
use crate::events;
use crate::exec::{CapabilityExecutor, Prepared};
use crate::params::{ParamDeriver, ParamSpec};
use crate::spec::{AggregateSpec, ConditionSpec, DeleteSpec, OrderBySpec, QuerySpec, SelectSpec};

/// Name of the default single-row lookup by primary key.
pub const DEFAULT_SELECT: &str = "select";
/// Name of the default list-all query.
pub const DEFAULT_QUERY: &str = "query";
/// Name of the default delete by primary key.
pub const DEFAULT_DELETE: &str = "delete";
/// Name of the default row count.
pub const DEFAULT_COUNT: &str = "count";

/// Everything guarded by the factory lock.
struct Registry {
    max_depth: usize,
    queries: HashMap<String, Arc<QueryCapability>>,
    selects: HashMap<String, Arc<SelectCapability>>,
    updates: HashMap<String, Arc<UpdateCapability>>,
    deletes: HashMap<String, Arc<DeleteCapability>>,
    aggregates: HashMap<String, Arc<AggregateCapability>>,
    cache: HashMap<String, Rendered>,
}

/// Selects the map holding a capability type.
trait Slot: Capability {
    fn map(registry: &Registry) -> &HashMap<String, Arc<Self>>;
    fn map_mut(registry: &mut Registry) -> &mut HashMap<String, Arc<Self>>;
}

macro_rules! impl_slot {
    ($ty:ty, $field:ident) => {
        impl Slot for $ty {
            fn map(registry: &Registry) -> &HashMap<String, Arc<Self>> {
                &registry.$field
            }

            fn map_mut(registry: &mut Registry) -> &mut HashMap<String, Arc<Self>> {
                &mut registry.$field
            }
        }
    };
}

impl_slot!(QueryCapability, queries);
impl_slot!(SelectCapability, selects);
impl_slot!(UpdateCapability, updates);
impl_slot!(DeleteCapability, deletes);
impl_slot!(AggregateCapability, aggregates);

fn cache_key(kind: CapabilityKind, name: &str) -> String {
    format!("{kind}:{name}")
}

/// Named capabilities for one table.
///
/// Construction discovers the primary key and registers four defaults:
/// `select` and `delete` (one equality predicate per key column), `query`
/// (every row ordered by the key) and `count`. Any of them may be replaced
/// or removed afterwards.
///
/// All state sits behind a single reader-writer lock. Adds and removes
/// invalidate the cached render for that kind and name under the same
/// write lock, so a render never observes a stale entry.
pub struct Factory {
    table: TableMeta,
    primary_key: Vec<String>,
    state: RwLock<Registry>,
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("table", &self.table.name)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

impl Factory {
    /// Creates a factory with the default configuration.
    pub fn new(table: TableMeta) -> Result<Self> {
        Self::with_config(table, FactoryConfig::default())
    }

    /// Creates a factory from a model's derived metadata.
    pub fn for_model<M: Model>() -> Result<Self> {
        Self::new(M::table_meta())
    }

    /// Creates a factory. Fails when no field carries a primary key constraint.
    pub fn with_config(table: TableMeta, config: FactoryConfig) -> Result<Self> {
        let primary_key: Vec<String> = table.primary_key().into_iter().map(String::from).collect();
        if primary_key.is_empty() {
            return Err(SpecError::MissingPrimaryKey {
                table: table.name.clone(),
            });
        }

        let factory = Self {
            table,
            primary_key,
            state: RwLock::new(Registry {
                max_depth: config.max_condition_depth,
                queries: HashMap::new(),
                selects: HashMap::new(),
                updates: HashMap::new(),
                deletes: HashMap::new(),
                aggregates: HashMap::new(),
                cache: HashMap::new(),
            }),
        };
        let pk: Vec<&str> = factory.primary_key.iter().map(String::as_str).collect();
        events::factory_created(&factory.table.name, &pk, config.max_condition_depth);
        factory.register_defaults()?;
        Ok(factory)
    }

    fn register_defaults(&self) -> Result<()> {
        let by_key: Vec<ConditionSpec> = self
            .primary_key
            .iter()
            .map(|column| ConditionSpec::simple(column, "=", column))
            .collect();

        self.add_select(
            SelectCapability::new(
                DEFAULT_SELECT,
                SelectSpec {
                    filter: by_key.clone(),
                    ..SelectSpec::default()
                },
            )
            .description("Fetch one row by primary key"),
        )?;
        self.add_query(
            QueryCapability::new(
                DEFAULT_QUERY,
                QuerySpec {
                    order_by: self.primary_key.iter().map(|c| OrderBySpec::asc(c)).collect(),
                    ..QuerySpec::default()
                },
            )
            .description("List all rows ordered by primary key"),
        )?;
        self.add_delete(
            DeleteCapability::new(DEFAULT_DELETE, DeleteSpec { filter: by_key })
                .description("Delete one row by primary key"),
        )?;
        self.add_aggregate(
            AggregateCapability::new(DEFAULT_COUNT, AggregateFunc::Count, AggregateSpec::default())
                .description("Count all rows"),
        )
    }

    /// Table metadata.
    #[must_use]
    pub const fn table(&self) -> &TableMeta {
        &self.table
    }

    /// Table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    /// Primary key columns.
    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Current depth limit; `0` means unlimited.
    #[must_use]
    pub fn max_condition_depth(&self) -> usize {
        self.state.read().max_depth
    }

    /// Changes the depth limit for future registrations.
    pub fn set_max_condition_depth(&self, depth: usize) {
        self.state.write().max_depth = depth;
    }

    /// A deriver using the current depth limit.
    #[must_use]
    pub fn deriver(&self) -> ParamDeriver<'_> {
        ParamDeriver::new(&self.table, self.max_condition_depth())
    }

    /// Returns an executor bound to this factory.
    #[must_use]
    pub fn executor(&self) -> CapabilityExecutor<'_> {
        events::executor_created(&self.table.name);
        CapabilityExecutor::new(self)
    }

    fn add<C: Slot>(&self, mut cap: C) -> Result<()> {
        let (name, params) = {
            let mut state = self.state.write();
            // Derivation always runs so depth violations are caught even
            // when the caller declares parameters.
            let derived = cap.derive(&ParamDeriver::new(&self.table, state.max_depth))?;
            if cap.declared_params().is_empty() {
                cap.set_params(derived);
            }
            let name = String::from(cap.name());
            let params = cap.declared_params().len();
            state.cache.remove(&cache_key(C::KIND, &name));
            C::map_mut(&mut state).insert(name.clone(), Arc::new(cap));
            (name, params)
        };
        events::capability_added(&self.table.name, C::KIND, &name, params);
        Ok(())
    }

    fn remove_slot<C: Slot>(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            state.cache.remove(&cache_key(C::KIND, name));
            C::map_mut(&mut state).remove(name).is_some()
        };
        if removed {
            events::capability_removed(&self.table.name, C::KIND, name);
        }
        removed
    }

    fn has_slot<C: Slot>(&self, name: &str) -> bool {
        C::map(&self.state.read()).contains_key(name)
    }

    fn get<C: Slot>(&self, name: &str) -> Option<Arc<C>> {
        C::map(&self.state.read()).get(name).cloned()
    }

    fn list<C: Slot>(&self) -> Vec<Arc<C>> {
        let mut caps: Vec<Arc<C>> = C::map(&self.state.read()).values().cloned().collect();
        caps.sort_by(|a, b| a.name().cmp(b.name()));
        caps
    }

    fn not_found<C: Slot>(&self, name: &str) -> SpecError {
        events::capability_not_found(&self.table.name, C::KIND, name);
        SpecError::NotFound {
            kind: C::KIND,
            name: String::from(name),
        }
    }

    /// Returns the cached render and the record it came from.
    fn resolve<C: Slot>(&self, name: &str) -> Result<(Rendered, Arc<C>)> {
        let key = cache_key(C::KIND, name);
        {
            let state = self.state.read();
            if let (Some(hit), Some(cap)) = (state.cache.get(&key), C::map(&state).get(name)) {
                events::cache_hit(&self.table.name, C::KIND, name);
                return Ok((hit.clone(), Arc::clone(cap)));
            }
        }

        let mut state = self.state.write();
        let Some(cap) = C::map(&state).get(name).cloned() else {
            drop(state);
            return Err(self.not_found::<C>(name));
        };
        if let Some(hit) = state.cache.get(&key) {
            events::cache_hit(&self.table.name, C::KIND, name);
            return Ok((hit.clone(), cap));
        }
        events::cache_miss(&self.table.name, C::KIND, name);
        let rendered = cap.render(&self.table.name)?;
        state.cache.insert(key, rendered.clone());
        Ok((rendered, cap))
    }

    fn prepared<C: Slot>(&self, name: &str) -> Result<Prepared> {
        let (rendered, cap) = self.resolve::<C>(name)?;
        Ok(Prepared::new(
            Some(C::KIND),
            name,
            rendered,
            cap.declared_params().to_vec(),
        ))
    }

    /// Registers or replaces a query capability.
    pub fn add_query(&self, cap: QueryCapability) -> Result<()> {
        self.add(cap)
    }

    /// Registers or replaces a select capability.
    pub fn add_select(&self, cap: SelectCapability) -> Result<()> {
        self.add(cap)
    }

    /// Registers or replaces an update capability.
    pub fn add_update(&self, cap: UpdateCapability) -> Result<()> {
        self.add(cap)
    }

    /// Registers or replaces a delete capability.
    pub fn add_delete(&self, cap: DeleteCapability) -> Result<()> {
        self.add(cap)
    }

    /// Registers or replaces an aggregate capability.
    pub fn add_aggregate(&self, cap: AggregateCapability) -> Result<()> {
        self.add(cap)
    }

    /// Registers a capability of any kind.
    pub fn add_any(&self, cap: AnyCapability) -> Result<()> {
        match cap {
            AnyCapability::Query(c) => self.add(c),
            AnyCapability::Select(c) => self.add(c),
            AnyCapability::Update(c) => self.add(c),
            AnyCapability::Delete(c) => self.add(c),
            AnyCapability::Aggregate(c) => self.add(c),
        }
    }

    /// Registers capabilities in order, stopping at the first failure.
    pub fn add_all<I: IntoIterator<Item = AnyCapability>>(&self, caps: I) -> Result<()> {
        caps.into_iter().try_for_each(|cap| self.add_any(cap))
    }

    /// Removes a query capability; returns whether it existed.
    pub fn remove_query(&self, name: &str) -> bool {
        self.remove_slot::<QueryCapability>(name)
    }

    /// Removes a select capability; returns whether it existed.
    pub fn remove_select(&self, name: &str) -> bool {
        self.remove_slot::<SelectCapability>(name)
    }

    /// Removes an update capability; returns whether it existed.
    pub fn remove_update(&self, name: &str) -> bool {
        self.remove_slot::<UpdateCapability>(name)
    }

    /// Removes a delete capability; returns whether it existed.
    pub fn remove_delete(&self, name: &str) -> bool {
        self.remove_slot::<DeleteCapability>(name)
    }

    /// Removes an aggregate capability; returns whether it existed.
    pub fn remove_aggregate(&self, name: &str) -> bool {
        self.remove_slot::<AggregateCapability>(name)
    }

    /// Removes a capability of `kind`; returns whether it existed.
    pub fn remove(&self, kind: CapabilityKind, name: &str) -> bool {
        match kind {
            CapabilityKind::Query => self.remove_query(name),
            CapabilityKind::Select => self.remove_select(name),
            CapabilityKind::Update => self.remove_update(name),
            CapabilityKind::Delete => self.remove_delete(name),
            CapabilityKind::Aggregate => self.remove_aggregate(name),
        }
    }

    /// Whether a query capability is registered.
    #[must_use]
    pub fn has_query(&self, name: &str) -> bool {
        self.has_slot::<QueryCapability>(name)
    }

    /// Whether a select capability is registered.
    #[must_use]
    pub fn has_select(&self, name: &str) -> bool {
        self.has_slot::<SelectCapability>(name)
    }

    /// Whether an update capability is registered.
    #[must_use]
    pub fn has_update(&self, name: &str) -> bool {
        self.has_slot::<UpdateCapability>(name)
    }

    /// Whether a delete capability is registered.
    #[must_use]
    pub fn has_delete(&self, name: &str) -> bool {
        self.has_slot::<DeleteCapability>(name)
    }

    /// Whether an aggregate capability is registered.
    #[must_use]
    pub fn has_aggregate(&self, name: &str) -> bool {
        self.has_slot::<AggregateCapability>(name)
    }

    /// Whether a capability of `kind` is registered.
    #[must_use]
    pub fn has(&self, kind: CapabilityKind, name: &str) -> bool {
        match kind {
            CapabilityKind::Query => self.has_query(name),
            CapabilityKind::Select => self.has_select(name),
            CapabilityKind::Update => self.has_update(name),
            CapabilityKind::Delete => self.has_delete(name),
            CapabilityKind::Aggregate => self.has_aggregate(name),
        }
    }

    /// Returns a query capability.
    #[must_use]
    pub fn get_query(&self, name: &str) -> Option<Arc<QueryCapability>> {
        self.get(name)
    }

    /// Returns a select capability.
    #[must_use]
    pub fn get_select(&self, name: &str) -> Option<Arc<SelectCapability>> {
        self.get(name)
    }

    /// Returns an update capability.
    #[must_use]
    pub fn get_update(&self, name: &str) -> Option<Arc<UpdateCapability>> {
        self.get(name)
    }

    /// Returns a delete capability.
    #[must_use]
    pub fn get_delete(&self, name: &str) -> Option<Arc<DeleteCapability>> {
        self.get(name)
    }

    /// Returns an aggregate capability.
    #[must_use]
    pub fn get_aggregate(&self, name: &str) -> Option<Arc<AggregateCapability>> {
        self.get(name)
    }

    /// Query capabilities sorted by name.
    #[must_use]
    pub fn list_queries(&self) -> Vec<Arc<QueryCapability>> {
        self.list()
    }

    /// Select capabilities sorted by name.
    #[must_use]
    pub fn list_selects(&self) -> Vec<Arc<SelectCapability>> {
        self.list()
    }

    /// Update capabilities sorted by name.
    #[must_use]
    pub fn list_updates(&self) -> Vec<Arc<UpdateCapability>> {
        self.list()
    }

    /// Delete capabilities sorted by name.
    #[must_use]
    pub fn list_deletes(&self) -> Vec<Arc<DeleteCapability>> {
        self.list()
    }

    /// Aggregate capabilities sorted by name.
    #[must_use]
    pub fn list_aggregates(&self) -> Vec<Arc<AggregateCapability>> {
        self.list()
    }

    /// Renders a query capability, using the cache.
    pub fn render_query(&self, name: &str) -> Result<Rendered> {
        self.resolve::<QueryCapability>(name).map(|(r, _)| r)
    }

    /// Renders a select capability, using the cache.
    pub fn render_select(&self, name: &str) -> Result<Rendered> {
        self.resolve::<SelectCapability>(name).map(|(r, _)| r)
    }

    /// Renders an update capability, using the cache.
    pub fn render_update(&self, name: &str) -> Result<Rendered> {
        self.resolve::<UpdateCapability>(name).map(|(r, _)| r)
    }

    /// Renders a delete capability, using the cache.
    pub fn render_delete(&self, name: &str) -> Result<Rendered> {
        self.resolve::<DeleteCapability>(name).map(|(r, _)| r)
    }

    /// Renders an aggregate capability, using the cache.
    pub fn render_aggregate(&self, name: &str) -> Result<Rendered> {
        self.resolve::<AggregateCapability>(name).map(|(r, _)| r)
    }

    /// Renders a capability of `kind`, using the cache.
    pub fn render(&self, kind: CapabilityKind, name: &str) -> Result<Rendered> {
        self.prepare(kind, name).map(Prepared::into_rendered)
    }

    /// Resolves a capability into a reusable statement handle.
    pub fn prepare(&self, kind: CapabilityKind, name: &str) -> Result<Prepared> {
        match kind {
            CapabilityKind::Query => self.prepared::<QueryCapability>(name),
            CapabilityKind::Select => self.prepared::<SelectCapability>(name),
            CapabilityKind::Update => self.prepared::<UpdateCapability>(name),
            CapabilityKind::Delete => self.prepared::<DeleteCapability>(name),
            CapabilityKind::Aggregate => self.prepared::<AggregateCapability>(name),
        }
    }

    /// Declared or derived parameters of a capability.
    pub fn params(&self, kind: CapabilityKind, name: &str) -> Result<Vec<ParamSpec>> {
        fn of<C: Slot>(factory: &Factory, name: &str) -> Result<Vec<ParamSpec>> {
            factory
                .get::<C>(name)
                .map(|cap| cap.declared_params().to_vec())
                .ok_or_else(|| factory.not_found::<C>(name))
        }
        match kind {
            CapabilityKind::Query => of::<QueryCapability>(self, name),
            CapabilityKind::Select => of::<SelectCapability>(self, name),
            CapabilityKind::Update => of::<UpdateCapability>(self, name),
            CapabilityKind::Delete => of::<DeleteCapability>(self, name),
            CapabilityKind::Aggregate => of::<AggregateCapability>(self, name),
        }
    }

    /// Snapshot of every registered capability.
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        fn summaries<C: Slot>(registry: &Registry, out: &mut Vec<CapabilitySummary>) {
            out.extend(C::map(registry).values().map(|cap| cap.summary()));
        }
        let mut capabilities = Vec::new();
        {
            let state = self.state.read();
            summaries::<QueryCapability>(&state, &mut capabilities);
            summaries::<SelectCapability>(&state, &mut capabilities);
            summaries::<UpdateCapability>(&state, &mut capabilities);
            summaries::<DeleteCapability>(&state, &mut capabilities);
            summaries::<AggregateCapability>(&state, &mut capabilities);
        }
        capabilities.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
        Catalog {
            table: self.table.name.clone(),
            primary_key: self.primary_key.clone(),
            capabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use oxide_spec_core::schema::FieldMeta;

    use super::*;

    fn users() -> TableMeta {
        TableMeta::new("users")
            .field(FieldMeta::new("id", "integer").primary_key())
            .field(FieldMeta::new("age", "integer"))
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key(CapabilityKind::Query, "adults"), "query:adults");
    }

    #[test]
    fn test_cache_populated_and_invalidated() {
        let factory = Factory::new(users()).unwrap();
        factory.render_query(DEFAULT_QUERY).unwrap();
        assert!(factory.state.read().cache.contains_key("query:query"));
        assert!(factory.remove_query(DEFAULT_QUERY));
        assert!(!factory.state.read().cache.contains_key("query:query"));
    }

    #[test]
    fn test_replace_invalidates_only_that_entry() {
        let factory = Factory::new(users()).unwrap();
        factory.render_select(DEFAULT_SELECT).unwrap();
        factory.render_delete(DEFAULT_DELETE).unwrap();
        factory
            .add_select(SelectCapability::new(DEFAULT_SELECT, SelectSpec::default()))
            .unwrap();
        let state = factory.state.read();
        assert!(!state.cache.contains_key("select:select"));
        assert!(state.cache.contains_key("delete:delete"));
    }

    fn fresh(kind: CapabilityKind) -> AnyCapability {
        let filter = vec![ConditionSpec::simple("age", ">", "min_age")];
        match kind {
            CapabilityKind::Query => AnyCapability::Query(QueryCapability::new(
                "fresh",
                QuerySpec {
                    filter,
                    ..QuerySpec::default()
                },
            )),
            CapabilityKind::Select => AnyCapability::Select(SelectCapability::new(
                "fresh",
                SelectSpec {
                    filter,
                    ..SelectSpec::default()
                },
            )),
            CapabilityKind::Update => AnyCapability::Update(UpdateCapability::new(
                "fresh",
                crate::spec::UpdateSpec {
                    set: [(String::from("age"), String::from("age"))].into(),
                    filter,
                },
            )),
            CapabilityKind::Delete => {
                AnyCapability::Delete(DeleteCapability::new("fresh", DeleteSpec { filter }))
            }
            CapabilityKind::Aggregate => AnyCapability::Aggregate(AggregateCapability::new(
                "fresh",
                AggregateFunc::Max,
                AggregateSpec {
                    field: Some(String::from("age")),
                    filter,
                },
            )),
        }
    }

    fn remove_typed(factory: &Factory, kind: CapabilityKind, name: &str) -> bool {
        match kind {
            CapabilityKind::Query => factory.remove_query(name),
            CapabilityKind::Select => factory.remove_select(name),
            CapabilityKind::Update => factory.remove_update(name),
            CapabilityKind::Delete => factory.remove_delete(name),
            CapabilityKind::Aggregate => factory.remove_aggregate(name),
        }
    }

    #[test]
    fn test_add_then_remove_every_kind() {
        let factory = Factory::new(users()).unwrap();
        for kind in CapabilityKind::ALL {
            factory.add_any(fresh(kind)).unwrap();
            assert!(factory.has(kind, "fresh"), "{kind}");
            factory.render(kind, "fresh").unwrap();
            assert!(factory.state.read().cache.contains_key(&cache_key(kind, "fresh")));

            assert!(remove_typed(&factory, kind, "fresh"), "{kind}");
            assert!(!factory.has(kind, "fresh"), "{kind}");
            assert!(!factory.state.read().cache.contains_key(&cache_key(kind, "fresh")));
            assert!(!remove_typed(&factory, kind, "fresh"), "{kind}");
            assert!(!factory.remove(kind, "fresh"), "{kind}");
            assert!(matches!(
                factory.render(kind, "fresh"),
                Err(SpecError::NotFound { kind: k, .. }) if k == kind
            ));
        }
    }

    #[test]
    fn test_same_name_in_different_kinds() {
        let factory = Factory::new(users()).unwrap();
        factory
            .add_update(UpdateCapability::new(DEFAULT_SELECT, crate::spec::UpdateSpec::default()))
            .unwrap();
        assert!(factory.has_select(DEFAULT_SELECT));
        assert!(factory.has_update(DEFAULT_SELECT));
    }
}
