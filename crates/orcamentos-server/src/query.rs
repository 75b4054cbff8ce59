//! PostgREST-style query strings: `column=op.value`, `order=column.dir`,
//! `limit=n`.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::error::ServerError;

/// Query keys that are not column filters.
const RESERVED: [&str; 3] = ["order", "select", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub op: Op,
    pub value: String,
}

impl RowFilter {
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let cell = row.get(&self.column).unwrap_or(&Value::Null);
        match self.op {
            Op::Eq => cell_text(cell).as_deref() == Some(self.value.as_str()),
            Op::Lt => match cell_text(cell) {
                Some(text) if !cell.is_null() => compare_text(&text, &self.value) == Ordering::Less,
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOrder {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    pub filters: Vec<RowFilter>,
    pub order: Option<RowOrder>,
    pub limit: Option<usize>,
}

impl RowQuery {
    pub fn parse(params: &[(String, String)]) -> Result<Self, ServerError> {
        let mut query = Self::default();

        for (key, value) in params {
            match key.as_str() {
                "order" => query.order = Some(parse_order(value)?),
                "limit" => {
                    let limit = value
                        .parse()
                        .map_err(|_| ServerError::BadRequest(format!("Invalid limit: {value}")))?;
                    query.limit = Some(limit);
                }
                k if RESERVED.contains(&k) => {}
                column => query.filters.push(parse_filter(column, value)?),
            }
        }

        Ok(query)
    }

    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Order `rows` (kept in insertion order) and apply the limit. Ties keep
    /// insertion order when ascending and newest-first when descending.
    pub fn arrange(&self, mut rows: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
        if let Some(order) = &self.order {
            if !order.ascending {
                rows.reverse();
            }
            rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

fn parse_filter(column: &str, value: &str) -> Result<RowFilter, ServerError> {
    let (op, operand) = value
        .split_once('.')
        .ok_or_else(|| ServerError::BadRequest(format!("Malformed filter {column}={value}")))?;
    let op = match op {
        "eq" => Op::Eq,
        "lt" => Op::Lt,
        other => {
            return Err(ServerError::BadRequest(format!(
                "Unsupported operator {other:?} on {column}"
            )))
        }
    };
    Ok(RowFilter {
        column: column.to_string(),
        op,
        value: operand.to_string(),
    })
}

fn parse_order(value: &str) -> Result<RowOrder, ServerError> {
    let (column, dir) = value.rsplit_once('.').unwrap_or((value, "asc"));
    let ascending = match dir {
        "asc" => true,
        "desc" => false,
        other => {
            return Err(ServerError::BadRequest(format!(
                "Unsupported order direction {other:?}"
            )))
        }
    };
    Ok(RowOrder {
        column: column.to_string(),
        ascending,
    })
}

/// Textual form of a cell as it appears in a query string.
fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => Some("null".to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Compare as timestamps when both sides are RFC 3339, as numbers when both
/// are numeric, otherwise as strings.
fn compare_text(a: &str, b: &str) -> Ordering {
    if let (Some(a), Some(b)) = (parse_timestamp(a), parse_timestamp(b)) {
        return a.cmp(&b);
    }
    if let (Ok(a), Ok(b)) = (a.parse::<f64>(), b.parse::<f64>()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    a.cmp(b)
}

/// Nulls sort last.
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let text = |v: Option<&Value>| v.filter(|v| !v.is_null()).and_then(cell_text);
    match (text(a), text(b)) {
        (Some(a), Some(b)) => compare_text(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok()
}
