//! Spec to builder conversion for every operation kind.

use oxide_spec_core::builder::{
    Aggregate, AggregateFunc, BuildError, Compound, ConflictAction, Delete, Insert, LockMode,
    OrderTerm, Select, SelectExpr, SetOperation, Update,
};

use crate::error::{Result, SpecError};
use crate::spec::{
    AggregateSpec, CompoundQuerySpec, DeleteSpec, InsertSpec, OrderBySpec, QuerySpec,
    SelectExprSpec, SelectSpec, UpdateSpec,
};
use crate::translate::{apply_where, translate};

/// Builds a multi-row SELECT. Fails on an unknown row-locking mode.
pub fn query_from_spec(table: &str, spec: &QuerySpec) -> Result<Select> {
    let lock = LockMode::parse(&spec.lock)?;

    let mut select = Select::from(table).columns(spec.fields.iter().cloned());
    for expr in &spec.select_exprs {
        select = select.expr(select_expr(expr));
    }
    if spec.distinct {
        select = select.distinct();
    }
    if !spec.distinct_on.is_empty() {
        select = select.distinct_on(spec.distinct_on.iter().cloned());
    }
    select = apply_where(select, &spec.filter);
    if !spec.group_by.is_empty() {
        select = select.group_by(spec.group_by.iter().cloned());
    }
    for condition in &spec.having {
        select = select.having(translate(condition));
    }
    for agg in &spec.having_agg {
        select = select.having_agg(agg.func, agg.field.as_deref(), &agg.operator, &agg.param);
    }
    for term in &spec.order_by {
        select = select.order_by(order_term(term));
    }
    match (&spec.limit_param, spec.limit) {
        (Some(param), _) => select = select.limit_param(param),
        (None, Some(n)) => select = select.limit(n),
        (None, None) => {}
    }
    match (&spec.offset_param, spec.offset) {
        (Some(param), _) => select = select.offset_param(param),
        (None, Some(n)) => select = select.offset(n),
        (None, None) => {}
    }
    if let Some(lock) = lock {
        select = select.lock(lock);
    }
    Ok(select)
}

/// Builds a single-row SELECT; same shape as a query.
pub fn select_from_spec(table: &str, spec: &SelectSpec) -> Result<Select> {
    query_from_spec(table, spec)
}

/// Builds an UPDATE.
#[must_use]
pub fn update_from_spec(table: &str, spec: &UpdateSpec) -> Update {
    let update = spec
        .set
        .iter()
        .fold(Update::table(table), |update, (column, param)| {
            update.set(column, param)
        });
    apply_where(update, &spec.filter)
}

/// Builds a DELETE.
#[must_use]
pub fn delete_from_spec(table: &str, spec: &DeleteSpec) -> Delete {
    apply_where(Delete::from(table), &spec.filter)
}

/// Builds a single-value aggregate for `func`.
#[must_use]
pub fn aggregate_from_spec(table: &str, func: AggregateFunc, spec: &AggregateSpec) -> Aggregate {
    let mut aggregate = match func {
        AggregateFunc::Sum | AggregateFunc::Avg | AggregateFunc::Min | AggregateFunc::Max => {
            Aggregate::new(func, table)
        }
        AggregateFunc::Count => Aggregate::count(table),
    };
    if let Some(field) = &spec.field {
        aggregate = aggregate.field(field);
    }
    apply_where(aggregate, &spec.filter)
}

/// Builds a set-operation compound.
///
/// Needs at least one operand. Errors from the base or an operand are
/// wrapped with their position.
pub fn compound_from_spec(table: &str, spec: &CompoundQuerySpec) -> Result<Compound> {
    let Some((first, rest)) = spec.operands.split_first() else {
        return Err(SpecError::EmptyCompound);
    };
    let base = query_from_spec(table, &spec.base).map_err(|e| SpecError::Base(Box::new(e)))?;

    let (op, select) = operand(table, 0, &first.operation, &first.query)?;
    let mut compound = Compound::new(base, op, select);
    for (i, next) in rest.iter().enumerate() {
        let (op, select) = operand(table, i + 1, &next.operation, &next.query)?;
        compound = compound.then(op, select);
    }

    for term in &spec.order_by {
        compound = compound.order_by(order_term(term));
    }
    match (&spec.limit_param, spec.limit) {
        (Some(param), _) => compound = compound.limit_param(param),
        (None, Some(n)) => compound = compound.limit(n),
        (None, None) => {}
    }
    match (&spec.offset_param, spec.offset) {
        (Some(param), _) => compound = compound.offset_param(param),
        (None, Some(n)) => compound = compound.offset(n),
        (None, None) => {}
    }
    Ok(compound)
}

fn operand(
    table: &str,
    index: usize,
    operation: &str,
    query: &QuerySpec,
) -> Result<(SetOperation, Select)> {
    let op = SetOperation::parse(operation).ok_or_else(|| SpecError::UnknownSetOperation {
        index,
        operation: String::from(operation),
    })?;
    let select = query_from_spec(table, query).map_err(|e| SpecError::Operand {
        index,
        source: Box::new(e),
    })?;
    Ok((op, select))
}

/// Builds an INSERT. Conflict columns need a `nothing` or `update` action.
pub fn insert_from_spec(table: &str, spec: &InsertSpec) -> Result<Insert> {
    let mut insert = spec
        .values
        .iter()
        .fold(Insert::into_table(table), |insert, (column, param)| {
            insert.value(column, param)
        });
    if spec.conflict_action.trim().is_empty() {
        if !spec.conflict_columns.is_empty() {
            return Err(BuildError::MissingConflictAction.into());
        }
        return Ok(insert);
    }
    let action = ConflictAction::parse(&spec.conflict_action)?;
    insert = insert.on_conflict(spec.conflict_columns.iter().cloned(), action);
    if !spec.update_columns.is_empty() {
        insert = insert.update_columns(spec.update_columns.iter().cloned());
    }
    Ok(insert)
}

fn order_term(spec: &OrderBySpec) -> OrderTerm {
    let mut term = OrderTerm::new(&spec.field).order(spec.direction);
    if let Some(nulls) = spec.nulls {
        term = term.nulls(nulls);
    }
    if let (Some(operator), Some(param)) = (&spec.operator, &spec.param) {
        term = term.expr(operator, param);
    }
    term
}

fn select_expr(spec: &SelectExprSpec) -> SelectExpr {
    match spec.operator_expr() {
        Some((field, operator, param)) => SelectExpr::Operator {
            field: String::from(field),
            op: String::from(operator),
            param: String::from(param),
            alias: spec.alias.clone(),
        },
        None => SelectExpr::Aggregate {
            func: spec.func.unwrap_or_default(),
            field: spec.field.clone(),
            alias: spec.alias.clone(),
        },
    }
}
