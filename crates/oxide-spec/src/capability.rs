//! Named capability records and the catalog exposed to callers.

use std::fmt;
use std::str::FromStr;

use oxide_spec_core::builder::{AggregateFunc, Rendered};
use serde::{Deserialize, Serialize};

use crate::builders::{
    aggregate_from_spec, delete_from_spec, query_from_spec, select_from_spec, update_from_spec,
};
use crate::error::Result;
use crate::params::{ParamDeriver, ParamSpec};
use crate::spec::{AggregateSpec, DeleteSpec, QuerySpec, SelectSpec, UpdateSpec};

/// The five registrable operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Multi-row query.
    Query,
    /// Single-row select.
    Select,
    /// Update.
    Update,
    /// Delete.
    Delete,
    /// Single-value aggregate.
    Aggregate,
}

impl CapabilityKind {
    /// All kinds, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::Query,
        Self::Select,
        Self::Update,
        Self::Delete,
        Self::Aggregate,
    ];

    /// Lower-case name, also the render-cache key prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Select => "select",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown capability kind `{s}`"))
    }
}

macro_rules! capability_record {
    ($(#[$doc:meta])* $name:ident, $spec:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Unique name within the kind.
            pub name: String,
            /// Human description.
            #[serde(default, skip_serializing_if = "String::is_empty")]
            pub description: String,
            /// Operation shape.
            #[serde(default)]
            pub spec: $spec,
            /// Declared parameters; derived at registration when empty.
            #[serde(default, skip_serializing_if = "Vec::is_empty")]
            pub params: Vec<ParamSpec>,
            /// Free-form tags.
            #[serde(default, skip_serializing_if = "Vec::is_empty")]
            pub tags: Vec<String>,
        }

        impl $name {
            /// Creates a record with derived parameters.
            #[must_use]
            pub fn new(name: &str, spec: $spec) -> Self {
                Self {
                    name: String::from(name),
                    description: String::new(),
                    spec,
                    params: vec![],
                    tags: vec![],
                }
            }

            /// Sets the description.
            #[must_use]
            pub fn description(mut self, description: &str) -> Self {
                self.description = String::from(description);
                self
            }

            /// Declares parameters instead of deriving them.
            #[must_use]
            pub fn params(mut self, params: Vec<ParamSpec>) -> Self {
                self.params = params;
                self
            }

            /// Adds a tag.
            #[must_use]
            pub fn tag(mut self, tag: &str) -> Self {
                self.tags.push(String::from(tag));
                self
            }
        }
    };
}

capability_record!(
    /// A named multi-row query.
    QueryCapability,
    QuerySpec
);
capability_record!(
    /// A named single-row select.
    SelectCapability,
    SelectSpec
);
capability_record!(
    /// A named update.
    UpdateCapability,
    UpdateSpec
);
capability_record!(
    /// A named delete.
    DeleteCapability,
    DeleteSpec
);

/// A named single-value aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCapability {
    /// Unique name within the kind.
    pub name: String,
    /// Human description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Function; unknown names fall back to COUNT.
    #[serde(default)]
    pub func: AggregateFunc,
    /// Operation shape.
    #[serde(default)]
    pub spec: AggregateSpec,
    /// Declared parameters; derived at registration when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl AggregateCapability {
    /// Creates a record with derived parameters.
    #[must_use]
    pub fn new(name: &str, func: AggregateFunc, spec: AggregateSpec) -> Self {
        Self {
            name: String::from(name),
            description: String::new(),
            func,
            spec,
            params: vec![],
            tags: vec![],
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = String::from(description);
        self
    }

    /// Declares parameters instead of deriving them.
    #[must_use]
    pub fn params(mut self, params: Vec<ParamSpec>) -> Self {
        self.params = params;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(String::from(tag));
        self
    }
}

/// Behaviour shared by every capability record.
pub(crate) trait Capability: Clone + Send + Sync + 'static {
    const KIND: CapabilityKind;

    fn name(&self) -> &str;
    fn declared_params(&self) -> &[ParamSpec];
    fn set_params(&mut self, params: Vec<ParamSpec>);
    fn derive(&self, deriver: &ParamDeriver<'_>) -> Result<Vec<ParamSpec>>;
    fn render(&self, table: &str) -> Result<Rendered>;
    fn summary(&self) -> CapabilitySummary;
}

macro_rules! impl_capability {
    ($name:ident, $kind:expr, $derive:ident, |$cap:ident, $table:ident| $render:expr) => {
        impl Capability for $name {
            const KIND: CapabilityKind = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn declared_params(&self) -> &[ParamSpec] {
                &self.params
            }

            fn set_params(&mut self, params: Vec<ParamSpec>) {
                self.params = params;
            }

            fn derive(&self, deriver: &ParamDeriver<'_>) -> Result<Vec<ParamSpec>> {
                deriver.$derive(&self.spec)
            }

            fn render(&self, table: &str) -> Result<Rendered> {
                let $cap = self;
                let $table = table;
                Ok($render)
            }

            fn summary(&self) -> CapabilitySummary {
                CapabilitySummary {
                    kind: Self::KIND,
                    name: self.name.clone(),
                    description: self.description.clone(),
                    params: self.params.clone(),
                    tags: self.tags.clone(),
                    func: None,
                }
            }
        }
    };
}

impl_capability!(QueryCapability, CapabilityKind::Query, derive_query, |cap, table| {
    query_from_spec(table, &cap.spec)?.render()?
});
impl_capability!(SelectCapability, CapabilityKind::Select, derive_query, |cap, table| {
    select_from_spec(table, &cap.spec)?.render()?
});
impl_capability!(UpdateCapability, CapabilityKind::Update, derive_update, |cap, table| {
    update_from_spec(table, &cap.spec).render()?
});
impl_capability!(DeleteCapability, CapabilityKind::Delete, derive_delete, |cap, table| {
    delete_from_spec(table, &cap.spec).render()?
});

impl Capability for AggregateCapability {
    const KIND: CapabilityKind = CapabilityKind::Aggregate;

    fn name(&self) -> &str {
        &self.name
    }

    fn declared_params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn set_params(&mut self, params: Vec<ParamSpec>) {
        self.params = params;
    }

    fn derive(&self, deriver: &ParamDeriver<'_>) -> Result<Vec<ParamSpec>> {
        deriver.derive_aggregate(&self.spec)
    }

    fn render(&self, table: &str) -> Result<Rendered> {
        Ok(aggregate_from_spec(table, self.func, &self.spec).render()?)
    }

    fn summary(&self) -> CapabilitySummary {
        CapabilitySummary {
            kind: Self::KIND,
            name: self.name.clone(),
            description: self.description.clone(),
            params: self.params.clone(),
            tags: self.tags.clone(),
            func: Some(self.func),
        }
    }
}

/// Any capability, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnyCapability {
    /// See [`QueryCapability`].
    Query(QueryCapability),
    /// See [`SelectCapability`].
    Select(SelectCapability),
    /// See [`UpdateCapability`].
    Update(UpdateCapability),
    /// See [`DeleteCapability`].
    Delete(DeleteCapability),
    /// See [`AggregateCapability`].
    Aggregate(AggregateCapability),
}

impl AnyCapability {
    /// The record's kind.
    #[must_use]
    pub const fn kind(&self) -> CapabilityKind {
        match self {
            Self::Query(_) => CapabilityKind::Query,
            Self::Select(_) => CapabilityKind::Select,
            Self::Update(_) => CapabilityKind::Update,
            Self::Delete(_) => CapabilityKind::Delete,
            Self::Aggregate(_) => CapabilityKind::Aggregate,
        }
    }

    /// The record's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Query(c) => &c.name,
            Self::Select(c) => &c.name,
            Self::Update(c) => &c.name,
            Self::Delete(c) => &c.name,
            Self::Aggregate(c) => &c.name,
        }
    }
}

/// What a caller needs to invoke a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySummary {
    /// Operation kind.
    pub kind: CapabilityKind,
    /// Capability name.
    pub name: String,
    /// Human description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Parameters to supply.
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Aggregate function, for aggregate capabilities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<AggregateFunc>,
}

/// Every capability registered for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Table name.
    pub table: String,
    /// Primary key columns.
    pub primary_key: Vec<String>,
    /// Capabilities ordered by kind, then name.
    pub capabilities: Vec<CapabilitySummary>,
}
