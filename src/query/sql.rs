//! Rendering of a [`QuerySpec`](super::QuerySpec) into PostgreSQL through `sqlx::QueryBuilder`.
//!
//! Every fragment assumes the `movies` table is aliased as `m`. Operand values
//! are always bound, never interpolated; only column names from
//! [`MOVIE_COLUMNS`] and fixed keywords are pushed as SQL text.

use sqlx::{Postgres, QueryBuilder};

use super::filter::{FieldPredicate, FilterPredicate, FilterValue};
use super::translator::{Pagination, SortKey};
use super::QueryError;

/// Storage kind of a column, which decides how operands are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Numeric,
    TextArray,
    Timestamp,
}

/// Mapping of a public (camelCase) field name onto its SQL column.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub field: &'static str,
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn column(field: &'static str, name: &'static str, kind: ColumnKind) -> Column {
    Column { field, name, kind }
}

pub const MOVIE_COLUMNS: &[Column] = &[
    column("id", "m.id", ColumnKind::Uuid),
    column("title", "m.title", ColumnKind::Text),
    column("slug", "m.slug", ColumnKind::Text),
    column("description", "m.description", ColumnKind::Text),
    column("duration", "m.duration", ColumnKind::Numeric),
    column("releaseYear", "m.release_year", ColumnKind::Numeric),
    column("ratings", "m.ratings", ColumnKind::Numeric),
    column("totalRatings", "m.total_ratings", ColumnKind::Numeric),
    column("releaseDate", "m.release_date", ColumnKind::Timestamp),
    column("genres", "m.genres", ColumnKind::TextArray),
    column("director", "m.director", ColumnKind::TextArray),
    column("casts", "m.casts", ColumnKind::TextArray),
    column("language", "m.language", ColumnKind::TextArray),
    column("coverImage", "m.cover_image", ColumnKind::Text),
    column("price", "m.price", ColumnKind::Numeric),
    column("createdAt", "m.created_at", ColumnKind::Timestamp),
    column("updatedAt", "m.updated_at", ColumnKind::Timestamp),
];

pub fn movie_column(field: &str) -> Option<&'static Column> {
    MOVIE_COLUMNS.iter().find(|c| c.field == field)
}

/// Appends ` AND <condition>` for every field predicate.
pub fn push_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &FilterPredicate,
) -> Result<(), QueryError> {
    for (field, predicate) in filter.iter() {
        let column = movie_column(field)
            .ok_or_else(|| QueryError::invalid_parameter(field, "cannot filter on this field"))?;
        builder.push(" AND ");
        push_predicate(builder, column, predicate)?;
    }
    Ok(())
}

fn push_predicate(
    builder: &mut QueryBuilder<'_, Postgres>,
    column: &Column,
    predicate: &FieldPredicate,
) -> Result<(), QueryError> {
    match (predicate, column.kind) {
        (FieldPredicate::AnyOf(alternatives), ColumnKind::TextArray) => {
            builder
                .push("EXISTS (SELECT 1 FROM unnest(")
                .push(column.name)
                .push(") AS v WHERE lower(v) = ANY(")
                .push_bind(lowercased(alternatives))
                .push("))");
        }
        (FieldPredicate::Equals(value), ColumnKind::Numeric) => {
            builder.push(column.name).push(" = ");
            push_number(builder, column.field, value)?;
        }
        (FieldPredicate::Range(bounds), ColumnKind::Numeric) => {
            builder.push("(");
            let mut first = true;
            for (op, value) in bounds.iter() {
                if !first {
                    builder.push(" AND ");
                }
                first = false;
                builder.push(column.name).push(" ").push(op.sql()).push(" ");
                let key = format!("{}[{}]", column.field, op.as_str());
                push_number(builder, &key, value)?;
            }
            if first {
                builder.push("TRUE");
            }
            builder.push(")");
        }
        (FieldPredicate::Range(_), ColumnKind::TextArray) => {
            return Err(QueryError::invalid_parameter(
                column.field,
                "does not support comparison operators",
            ));
        }
        _ => {
            return Err(QueryError::invalid_parameter(
                column.field,
                "cannot filter on this field",
            ));
        }
    }
    Ok(())
}

/// Filterable scalars are all numeric; text operands are rejected here.
fn push_number(
    builder: &mut QueryBuilder<'_, Postgres>,
    key: &str,
    value: &FilterValue,
) -> Result<(), QueryError> {
    match value {
        FilterValue::Number(number) => {
            builder.push_bind(*number);
            Ok(())
        }
        FilterValue::Text(_) => Err(QueryError::invalid_parameter(key, "expects a number")),
    }
}

fn lowercased(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

/// Appends ` ORDER BY ...`, with `m.id` as the final tie-breaker.
pub fn push_order_by(
    builder: &mut QueryBuilder<'_, Postgres>,
    sort_keys: &[SortKey],
) -> Result<(), QueryError> {
    builder.push(" ORDER BY ");
    for key in sort_keys {
        let column = movie_column(&key.field)
            .filter(|c| c.kind != ColumnKind::TextArray)
            .ok_or_else(|| {
                QueryError::invalid_parameter("sort", format!("cannot sort by `{}`", key.field))
            })?;
        builder
            .push(column.name)
            .push(" ")
            .push(key.direction.sql())
            .push(", ");
    }
    builder.push("m.id ASC");
    Ok(())
}

/// Appends ` LIMIT $n OFFSET $m`.
pub fn push_window(builder: &mut QueryBuilder<'_, Postgres>, pagination: &Pagination) {
    builder
        .push(" LIMIT ")
        .push_bind(pagination.page_size)
        .push(" OFFSET ")
        .push_bind(pagination.skip);
}
