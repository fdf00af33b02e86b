//! Interpreter for parsed queries.
//!
//! Evaluates a [`QueryExpr`] against a [`Dataset`]. Column names are resolved
//! by exact match; aggregate operations require numeric columns. The
//! [`QueryExpr::Invalid`] marker evaluates to the fixed invalid-code error,
//! so sanitizer rejections surface here like any other evaluation failure.

use super::{Aggregate, CmpOp, Filter, Literal, QueryExpr, Value};
use crate::dataset::{CellValue, ColumnType, Dataset};
use crate::error::QueryError;

/// Evaluate a query against a dataset.
pub fn evaluate(expr: &QueryExpr, dataset: &Dataset) -> Result<Value, QueryError> {
    match expr {
        QueryExpr::Invalid => Err(QueryError::InvalidCode),

        QueryExpr::Table => Ok(Value::Table(dataset.clone())),

        QueryExpr::RowCount { filter: None } => Ok(Value::Count(dataset.row_count())),

        QueryExpr::RowCount {
            filter: Some(filter),
        } => {
            let indices = matching_rows(filter, dataset)?;
            Ok(Value::Count(indices.len()))
        }

        QueryExpr::FilterRows(filter) => {
            let indices = matching_rows(filter, dataset)?;
            Ok(Value::Table(dataset.select_rows(&indices)))
        }

        QueryExpr::ColumnSelect { column, filter } => {
            let col = column_index(dataset, column)?;
            let values: Vec<CellValue> = match filter {
                Some(filter) => {
                    let indices = matching_rows(filter, dataset)?;
                    indices
                        .iter()
                        .map(|&i| dataset.rows()[i][col].clone())
                        .collect()
                }
                None => dataset.column_values(col).cloned().collect(),
            };
            Ok(Value::Column {
                name: column.clone(),
                values,
            })
        }

        QueryExpr::ColumnAgg { column, agg } => {
            let col = column_index(dataset, column)?;
            aggregate_column(dataset, col, column, *agg)
        }

        QueryExpr::GroupCount { column } => {
            let col = column_index(dataset, column)?;
            let mut entries: Vec<(String, f64)> = Vec::new();
            for value in dataset.column_values(col) {
                if value.is_empty() {
                    continue;
                }
                let key = value.to_string();
                match entries.iter().position(|(k, _)| *k == key) {
                    Some(i) => entries[i].1 += 1.0,
                    None => entries.push((key, 1.0)),
                }
            }
            Ok(Value::Series {
                name: column.clone(),
                entries,
            })
        }

        QueryExpr::GroupAgg { group, target, agg } => {
            let group_col = column_index(dataset, group)?;
            let target_col = column_index(dataset, target)?;
            if needs_numeric(*agg) && dataset.column_types()[target_col] != ColumnType::Number {
                return Err(QueryError::TypeMismatch {
                    operation: agg.name().to_string(),
                    column: target.clone(),
                });
            }

            // Bucket target cells per group, preserving first-seen order.
            // Empty cells are skipped so they count toward nothing.
            let mut groups: Vec<(String, Vec<CellValue>)> = Vec::new();
            for row in dataset.rows() {
                let key_cell = &row[group_col];
                if key_cell.is_empty() {
                    continue;
                }
                let key = key_cell.to_string();
                let idx = match groups.iter().position(|(k, _)| *k == key) {
                    Some(i) => i,
                    None => {
                        groups.push((key, Vec::new()));
                        groups.len() - 1
                    }
                };
                let cell = &row[target_col];
                if !cell.is_empty() {
                    groups[idx].1.push(cell.clone());
                }
            }

            let entries: Vec<(String, f64)> = groups
                .into_iter()
                .map(|(key, cells)| (key, aggregate_cells(*agg, &cells)))
                .collect();
            Ok(Value::Series {
                name: format!("{}.{}", target, agg.name()),
                entries,
            })
        }
    }
}

/// Indices of rows matching a filter, top to bottom.
fn matching_rows(filter: &Filter, dataset: &Dataset) -> Result<Vec<usize>, QueryError> {
    let col = column_index(dataset, &filter.column)?;

    // Comparing a text column against a number (or the reverse) is a type
    // error, matching what a real frame library would raise.
    let kind = dataset.column_types()[col];
    let compatible = match &filter.value {
        Literal::Number(_) => kind == ColumnType::Number,
        Literal::Text(_) => kind != ColumnType::Number,
    };
    if !compatible && matches!(filter.op, CmpOp::Gt | CmpOp::Ge | CmpOp::Lt | CmpOp::Le) {
        return Err(QueryError::BadComparison {
            column: filter.column.clone(),
            literal: filter.value.to_string(),
        });
    }

    let mut indices = Vec::new();
    for (i, row) in dataset.rows().iter().enumerate() {
        if cell_matches(&row[col], filter) {
            indices.push(i);
        }
    }
    Ok(indices)
}

/// Whether a single cell satisfies the filter. Empty cells never match.
fn cell_matches(cell: &CellValue, filter: &Filter) -> bool {
    if cell.is_empty() {
        return false;
    }
    match &filter.value {
        Literal::Number(target) => match cell.as_number() {
            Some(n) => compare_ord(filter.op, n.partial_cmp(target)),
            None => filter.op == CmpOp::Ne,
        },
        // Equality across mismatched types matches nothing, so a text
        // literal only ever equals a text cell.
        Literal::Text(target) => match cell {
            CellValue::Text(text) => {
                compare_ord(filter.op, Some(text.as_str().cmp(target.as_str())))
            }
            _ => filter.op == CmpOp::Ne,
        },
    }
}

fn compare_ord(op: CmpOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        CmpOp::Eq => ordering == Equal,
        CmpOp::Ne => ordering != Equal,
        CmpOp::Gt => ordering == Greater,
        CmpOp::Ge => ordering != Less,
        CmpOp::Lt => ordering == Less,
        CmpOp::Le => ordering != Greater,
    }
}

fn column_index(dataset: &Dataset, name: &str) -> Result<usize, QueryError> {
    dataset
        .column_index(name)
        .ok_or_else(|| QueryError::ColumnNotFound {
            column: name.to_string(),
        })
}

fn needs_numeric(agg: Aggregate) -> bool {
    !matches!(agg, Aggregate::Count | Aggregate::Nunique)
}

/// Aggregate a whole column.
fn aggregate_column(
    dataset: &Dataset,
    col: usize,
    name: &str,
    agg: Aggregate,
) -> Result<Value, QueryError> {
    match agg {
        Aggregate::Count => {
            let count = dataset.column_values(col).filter(|v| !v.is_empty()).count();
            Ok(Value::Count(count))
        }
        Aggregate::Nunique => {
            let mut seen: Vec<String> = Vec::new();
            for value in dataset.column_values(col) {
                if value.is_empty() {
                    continue;
                }
                let key = value.to_string();
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
            Ok(Value::Count(seen.len()))
        }
        _ => {
            if dataset.column_types()[col] != ColumnType::Number {
                return Err(QueryError::TypeMismatch {
                    operation: agg.name().to_string(),
                    column: name.to_string(),
                });
            }
            let values: Vec<f64> = dataset
                .column_values(col)
                .filter_map(|v| v.as_number())
                .collect();
            Ok(Value::Number(apply_aggregate(agg, &values)))
        }
    }
}

/// Aggregate one group's cells. Count and nunique work on any cell kind;
/// the numeric aggregates see only the values that parse as numbers.
fn aggregate_cells(agg: Aggregate, cells: &[CellValue]) -> f64 {
    match agg {
        Aggregate::Count => cells.len() as f64,
        Aggregate::Nunique => {
            let mut seen: Vec<String> = Vec::new();
            for cell in cells {
                let key = cell.to_string();
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
            seen.len() as f64
        }
        _ => {
            let values: Vec<f64> = cells.iter().filter_map(CellValue::as_number).collect();
            apply_aggregate(agg, &values)
        }
    }
}

fn apply_aggregate(agg: Aggregate, values: &[f64]) -> f64 {
    match agg {
        Aggregate::Sum => values.iter().sum(),
        Aggregate::Mean => {
            if values.is_empty() {
                f64::NAN
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        }
        Aggregate::Min => values.iter().copied().fold(f64::NAN, f64::min),
        Aggregate::Max => values.iter().copied().fold(f64::NAN, f64::max),
        // Count and nunique are handled on cells before reaching here.
        Aggregate::Count | Aggregate::Nunique => values.len() as f64,
    }
}
