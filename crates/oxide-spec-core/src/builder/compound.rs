//! Set-operation (UNION / INTERSECT / EXCEPT) builder.

use super::error::Result;
use super::render::{Rendered, SqlWriter};
use super::select::{write_bounds, write_order_by, Bound, OrderTerm, Select};

/// Set operations combining two SELECTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    /// `UNION`
    Union,
    /// `UNION ALL`
    UnionAll,
    /// `INTERSECT`
    Intersect,
    /// `INTERSECT ALL`
    IntersectAll,
    /// `EXCEPT`
    Except,
    /// `EXCEPT ALL`
    ExceptAll,
}

impl SetOperation {
    /// Parses `union`, `union_all`, `UNION ALL`, etc.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized = tag
            .trim()
            .to_ascii_lowercase()
            .split(|c: char| c == '_' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        match normalized.as_str() {
            "union" => Some(Self::Union),
            "union_all" => Some(Self::UnionAll),
            "intersect" => Some(Self::Intersect),
            "intersect_all" => Some(Self::IntersectAll),
            "except" => Some(Self::Except),
            "except_all" => Some(Self::ExceptAll),
            _ => None,
        }
    }

    /// Returns the SQL keyword(s).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::IntersectAll => "INTERSECT ALL",
            Self::Except => "EXCEPT",
            Self::ExceptAll => "EXCEPT ALL",
        }
    }
}

/// A chain of SELECTs joined by set operations.
///
/// ORDER BY, LIMIT and OFFSET set here apply to the combined result and are
/// rendered last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    base: Select,
    operands: Vec<(SetOperation, Select)>,
    order_by: Vec<OrderTerm>,
    limit: Option<Bound>,
    offset: Option<Bound>,
}

impl Compound {
    /// Seeds the compound with `base <op> first`.
    #[must_use]
    pub fn new(base: Select, op: SetOperation, first: Select) -> Self {
        Self {
            base,
            operands: vec![(op, first)],
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    /// Combines the result so far with another SELECT.
    #[must_use]
    pub fn then(mut self, op: SetOperation, select: Select) -> Self {
        self.operands.push((op, select));
        self
    }

    /// Orders the combined result.
    #[must_use]
    pub fn order_by(mut self, term: OrderTerm) -> Self {
        self.order_by.push(term);
        self
    }

    /// Sets a literal LIMIT on the combined result.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(Bound::Literal(n));
        self
    }

    /// Binds the combined LIMIT to a parameter.
    #[must_use]
    pub fn limit_param(mut self, param: &str) -> Self {
        self.limit = Some(Bound::Param(String::from(param)));
        self
    }

    /// Sets a literal OFFSET on the combined result.
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(Bound::Literal(n));
        self
    }

    /// Binds the combined OFFSET to a parameter.
    #[must_use]
    pub fn offset_param(mut self, param: &str) -> Self {
        self.offset = Some(Bound::Param(String::from(param)));
        self
    }

    /// Renders the statement.
    pub fn render(&self) -> Result<Rendered> {
        let mut w = SqlWriter::new();
        write_member(&mut w, &self.base, 0)?;
        for (i, (op, select)) in self.operands.iter().enumerate() {
            w.push(" ");
            w.push(op.as_sql());
            w.push(" ");
            write_member(&mut w, select, i + 1)?;
        }
        write_order_by(&mut w, &self.order_by)?;
        write_bounds(&mut w, self.limit.as_ref(), self.offset.as_ref())?;
        Ok(w.finish())
    }
}

/// Members with their own trailing clauses are wrapped in a derived table,
/// which both SQLite and PostgreSQL accept inside a compound.
fn write_member(w: &mut SqlWriter, select: &Select, index: usize) -> Result<()> {
    if select.has_trailing_clauses() {
        w.push("SELECT * FROM (");
        select.write(w)?;
        w.push(&format!(") AS m{index}"));
    } else {
        select.write(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::condition::Filter;

    #[test]
    fn test_set_operation_parse() {
        assert_eq!(SetOperation::parse("union"), Some(SetOperation::Union));
        assert_eq!(SetOperation::parse("UNION_ALL"), Some(SetOperation::UnionAll));
        assert_eq!(SetOperation::parse("except all"), Some(SetOperation::ExceptAll));
        assert_eq!(SetOperation::parse("Intersect"), Some(SetOperation::Intersect));
        assert_eq!(SetOperation::parse("merge"), None);
        assert_eq!(SetOperation::parse(""), None);
    }

    #[test]
    fn test_union_all_with_outer_order() {
        let rendered = Compound::new(
            Select::from("admins").columns(["email"]),
            SetOperation::UnionAll,
            Select::from("users")
                .columns(["email"])
                .where_cond("active", "=", "active"),
        )
        .order_by(OrderTerm::new("email"))
        .limit_param("max")
        .render()
        .unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT email FROM admins UNION ALL SELECT email FROM users WHERE active = ? \
             ORDER BY email ASC LIMIT ?"
        );
        assert_eq!(rendered.params, vec!["active", "max"]);
    }

    #[test]
    fn test_member_with_limit_is_wrapped() {
        let rendered = Compound::new(
            Select::from("a").columns(["id"]),
            SetOperation::Except,
            Select::from("b").columns(["id"]).limit(3),
        )
        .then(SetOperation::Intersect, Select::from("c").columns(["id"]))
        .render()
        .unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT id FROM a EXCEPT SELECT * FROM (SELECT id FROM b LIMIT 3) AS m1 \
             INTERSECT SELECT id FROM c"
        );
    }
}
