//! The closed query capability.
//!
//! Sanitized expression text is parsed into a [`QueryExpr`] — a tagged
//! variant over a small, explicitly-enumerated set of operations — and
//! interpreted against the dataset. Arbitrary code is never executed; an
//! expression outside this grammar is an error, not a fallthrough to eval.
//!
//! Supported operations: whole-table select, row count, column select,
//! column aggregates, filter by comparison, group-and-count, and
//! group-and-aggregate.

mod eval;
mod parser;

pub use eval::evaluate;
pub use parser::parse;

use std::fmt;

use crate::dataset::{CellValue, Dataset};

/// An aggregate function over a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    Nunique,
}

impl Aggregate {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Sum => "sum",
            Aggregate::Mean => "mean",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Count => "count",
            Aggregate::Nunique => "nunique",
        }
    }
}

/// A comparison operator in a row filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A comparison literal: quoted text or a bare number.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(s) => write!(f, "'{}'", s),
            Literal::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A row filter: `df['column'] <op> <literal>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: CmpOp,
    pub value: Literal,
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// `df` — the whole table.
    Table,
    /// `df.shape[0]` or `df[<filter>].shape[0]`.
    RowCount { filter: Option<Filter> },
    /// `df[<filter>]` — the matching rows.
    FilterRows(Filter),
    /// `df['col']` or `df[<filter>]['col']`.
    ColumnSelect {
        column: String,
        filter: Option<Filter>,
    },
    /// `df['col'].sum()` and friends.
    ColumnAgg { column: String, agg: Aggregate },
    /// `df.groupby('col').size()` or `df['col'].value_counts()`.
    GroupCount { column: String },
    /// `df.groupby('g')['t'].sum()` and friends.
    GroupAgg {
        group: String,
        target: String,
        agg: Aggregate,
    },
    /// The sanitizer's canned invalid marker; evaluates to the fixed error.
    Invalid,
}

/// The result of evaluating a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An integer count.
    Count(usize),
    /// A scalar number.
    Number(f64),
    /// A single column of values.
    Column {
        name: String,
        values: Vec<CellValue>,
    },
    /// Per-group numeric results, in first-seen group order.
    Series {
        name: String,
        entries: Vec<(String, f64)>,
    },
    /// A row subset.
    Table(Dataset),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Count(n) => write!(f, "{}", n),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Column { values, .. } => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Value::Series { entries, .. } => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, Value::Number(*v)))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Value::Table(ds) => write!(f, "<{} rows x {} columns>", ds.row_count(), ds.columns().len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display_scalars() {
        assert_eq!(Value::Count(12).to_string(), "12");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(599.0).to_string(), "599");
    }

    #[test]
    fn test_value_display_series() {
        let value = Value::Series {
            name: "size".to_string(),
            entries: vec![("Electronics".to_string(), 2.0), ("Furniture".to_string(), 1.0)],
        };
        assert_eq!(value.to_string(), "{Electronics: 2, Furniture: 1}");
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Text("Books".into()).to_string(), "'Books'");
        assert_eq!(Literal::Number(5.0).to_string(), "5");
    }
}
