//! Table metadata used to discover primary keys and type parameters.
//!
//! Metadata is usually produced by `#[derive(Model)]`, but it can also be
//! assembled by hand or loaded from JSON.

use serde::{Deserialize, Serialize};

/// Type name reported for fields that carry no type information.
pub const ANY_TYPE: &str = "any";

fn any_type() -> String {
    String::from(ANY_TYPE)
}

/// Metadata for one field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Rust field name.
    pub name: String,
    /// SQL column name.
    pub column: String,
    /// Semantic type (`integer`, `string`, ...).
    #[serde(rename = "type", default = "any_type")]
    pub sql_type: String,
    /// Constraint tags such as `primary_key` or `unique`.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Whether the field accepts NULL.
    #[serde(default)]
    pub nullable: bool,
}

impl FieldMeta {
    /// A field whose column has the same name.
    #[must_use]
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: String::from(name),
            column: String::from(name),
            sql_type: String::from(sql_type),
            constraints: vec![],
            nullable: false,
        }
    }

    /// Sets the column name.
    #[must_use]
    pub fn column(mut self, column: &str) -> Self {
        self.column = String::from(column);
        self
    }

    /// Adds a constraint tag.
    #[must_use]
    pub fn constraint(mut self, constraint: &str) -> Self {
        self.constraints.push(String::from(constraint));
        self
    }

    /// Marks the field as a primary key column.
    #[must_use]
    pub fn primary_key(self) -> Self {
        self.constraint("primary_key")
    }

    /// Marks the field as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Whether a `primary_key` (or `pk`) constraint is present.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.constraints.iter().any(|c| {
            let c = c.trim();
            c.eq_ignore_ascii_case("primary_key") || c.eq_ignore_ascii_case("pk")
        })
    }
}

/// Metadata for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    /// SQL table name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldMeta>,
}

impl TableMeta {
    /// A table without fields.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            fields: vec![],
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    /// Primary key columns in declaration order. Empty when none is tagged.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_primary_key())
            .map(|f| f.column.as_str())
            .collect()
    }

    /// Finds a field by column or Rust name. A `table.` qualifier is ignored.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&FieldMeta> {
        let name = name.rsplit('.').next().unwrap_or(name);
        self.fields
            .iter()
            .find(|f| f.column == name)
            .or_else(|| self.fields.iter().find(|f| f.name == name))
    }

    /// Semantic type of a field, if the field exists.
    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|f| f.sql_type.as_str())
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.column.as_str()).collect()
    }
}

/// Types that describe a database table.
///
/// Derive it with `#[derive(Model)]` from `oxide-spec-derive`.
pub trait Model {
    /// Returns the table metadata.
    fn table_meta() -> TableMeta;
}
