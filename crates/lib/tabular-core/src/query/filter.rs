use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use tabular_store::models::{ColumnType, NumericSummary, QueryResult, Table, Value};
use tabular_store::schema::MAX_RESULT_ROWS;

use super::{FilterRequest, QueryError};
use crate::parsers::{BinaryOp, Expr, FilterParser, Method, UnaryOp, parse_temporal};

/// Runs a row filter against a table.
///
/// Rows are scanned in file order. Only the first `MAX_RESULT_ROWS` matches
/// are materialised; later matches are counted and folded into the numeric
/// summary.
///
/// # Errors
/// Returns `QueryError` if a referenced column does not exist or the filter
/// expression is forbidden or malformed.
pub fn run_filter(table: &Table, request: &FilterRequest) -> Result<QueryResult, QueryError> {
    let projection = resolve_projection(table, &request.columns)?;
    let predicate = request
        .filter_text()
        .map(|text| BoundFilter::bind(table, text))
        .transpose()?;

    let mut summaries: Vec<SummaryAccumulator> = projection
        .iter()
        .filter(|&&index| table.columns[index].column_type == ColumnType::Numeric)
        .map(|&index| SummaryAccumulator::new(index))
        .collect();

    let mut rows = Vec::new();
    let mut matched = 0;
    for row in 0..table.row_count {
        if let Some(predicate) = &predicate {
            if !predicate.matches(row) {
                continue;
            }
        }
        matched += 1;
        if rows.len() < MAX_RESULT_ROWS {
            rows.push(table.row(row, &projection));
        }
        for summary in &mut summaries {
            summary.push(&table.columns[summary.column].values[row]);
        }
    }

    Ok(QueryResult {
        query: request.filter_text().unwrap_or_default().to_string(),
        tables: vec![table.name.clone()],
        columns: projection
            .iter()
            .map(|&index| table.columns[index].name.clone())
            .collect(),
        returned_rows: rows.len(),
        rows,
        matched_rows: Some(matched),
        truncated: matched > MAX_RESULT_ROWS,
        numeric_summary: summaries
            .into_iter()
            .map(|summary| summary.finish(table))
            .collect(),
    })
}

fn resolve_projection(table: &Table, columns: &[String]) -> Result<Vec<usize>, QueryError> {
    if columns.is_empty() {
        return Ok((0..table.columns.len()).collect());
    }
    columns
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| QueryError::ColumnNotFound {
                    table: table.name.clone(),
                    column: name.clone(),
                })
        })
        .collect()
}

/// A parsed filter whose column references are resolved against a table.
struct BoundFilter<'a> {
    table: &'a Table,
    expr: Expr,
    columns: HashMap<String, usize>,
}

impl<'a> BoundFilter<'a> {
    fn bind(table: &'a Table, text: &str) -> Result<Self, QueryError> {
        let expr = FilterParser::parse(text)?;
        let mut columns = HashMap::new();
        for name in expr.columns() {
            let index = table
                .column_index(name)
                .ok_or_else(|| QueryError::ColumnNotFound {
                    table: table.name.clone(),
                    column: name.to_string(),
                })?;
            columns.insert(name.to_string(), index);
        }
        Ok(Self {
            table,
            expr,
            columns,
        })
    }

    fn matches(&self, row: usize) -> bool {
        is_true(&self.eval(&self.expr, row))
    }

    fn cell(&self, name: &str, row: usize) -> &'a Value {
        self.columns
            .get(name)
            .and_then(|&index| self.table.columns[index].values.get(row))
            .unwrap_or(&Value::Null)
    }

    fn eval(&self, expr: &Expr, row: usize) -> Cow<'a, Value> {
        match expr {
            Expr::Literal(value) => Cow::Owned(value.clone()),
            Expr::Column(name) => Cow::Borrowed(self.cell(name, row)),
            Expr::Unary { op, expr } => {
                let value = self.eval(expr, row);
                Cow::Owned(match op {
                    UnaryOp::Not => Value::Bool(!is_true(&value)),
                    UnaryOp::Neg => negate(&value),
                })
            }
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => Cow::Owned(Value::Bool(
                is_true(&self.eval(left, row)) && is_true(&self.eval(right, row)),
            )),
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => Cow::Owned(Value::Bool(
                is_true(&self.eval(left, row)) || is_true(&self.eval(right, row)),
            )),
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, row);
                let right = self.eval(right, row);
                Cow::Owned(apply_binary(*op, &left, &right))
            }
            Expr::In {
                expr,
                list,
                negated,
            } => {
                let value = self.eval(expr, row);
                let found = list
                    .iter()
                    .any(|item| values_equal(&value, &self.eval(item, row)));
                Cow::Owned(Value::Bool(found != *negated))
            }
            Expr::Method {
                column,
                method,
                argument,
            } => {
                let value = self.cell(column, row);
                Cow::Owned(Value::Bool(apply_method(
                    *method,
                    value,
                    argument.as_deref(),
                )))
            }
        }
    }
}

const fn is_true(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn negate(value: &Value) -> Value {
    match value {
        Value::Int(value) => value.checked_neg().map_or(Value::Null, Value::Int),
        Value::Float(value) => Value::Float(-value),
        _ => Value::Null,
    }
}

fn apply_method(method: Method, value: &Value, argument: Option<&str>) -> bool {
    match method {
        Method::IsNull => value.is_null(),
        Method::NotNull => !value.is_null(),
        Method::Contains | Method::StartsWith | Method::EndsWith => {
            let (Value::Text(text), Some(needle)) = (value, argument) else {
                return false;
            };
            match method {
                Method::Contains => text.contains(needle),
                Method::StartsWith => text.starts_with(needle),
                _ => text.ends_with(needle),
            }
        }
    }
}

/// Orders two values, reading text as a timestamp when compared to a
/// temporal value.
fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Text(text), other) if other.is_temporal() => {
            parse_temporal(text)?.compare(other)
        }
        (other, Value::Text(text)) if other.is_temporal() => {
            other.compare(&parse_temporal(text)?)
        }
        _ => left.compare(right),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return left.is_null() && right.is_null();
    }
    ordering(left, right) == Some(Ordering::Equal)
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Eq => Value::Bool(values_equal(left, right)),
        BinaryOp::NotEq => Value::Bool(!values_equal(left, right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let Some(order) = ordering(left, right) else {
                return Value::Bool(false);
            };
            Value::Bool(match op {
                BinaryOp::Lt => order == Ordering::Less,
                BinaryOp::Le => order != Ordering::Greater,
                BinaryOp::Gt => order == Ordering::Greater,
                _ => order != Ordering::Less,
            })
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, left, right)
        }
        BinaryOp::And => Value::Bool(is_true(left) && is_true(right)),
        BinaryOp::Or => Value::Bool(is_true(left) || is_true(right)),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) if op != BinaryOp::Div => {
            let result = match op {
                BinaryOp::Add => l.checked_add(*r),
                BinaryOp::Sub => l.checked_sub(*r),
                BinaryOp::Mul => l.checked_mul(*r),
                _ => l.checked_rem(*r),
            };
            result.map_or(Value::Null, Value::Int)
        }
        (Value::Text(l), Value::Text(r)) if op == BinaryOp::Add => Value::Text(format!("{l}{r}")),
        _ => {
            let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
                return Value::Null;
            };
            let result = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div if r == 0.0 => return Value::Null,
                BinaryOp::Div => l / r,
                _ if r == 0.0 => return Value::Null,
                _ => l % r,
            };
            if result.is_finite() {
                Value::Float(result)
            } else {
                Value::Null
            }
        }
    }
}

/// Streaming count/mean/min/max/std over one numeric column. The spread uses
/// Welford's update so a single pass suffices.
struct SummaryAccumulator {
    column: usize,
    count: usize,
    sum: f64,
    running_mean: f64,
    m2: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl SummaryAccumulator {
    const fn new(column: usize) -> Self {
        Self {
            column,
            count: 0,
            sum: 0.0,
            running_mean: 0.0,
            m2: 0.0,
            min: None,
            max: None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, value: &Value) {
        let Some(number) = value.as_f64() else {
            return;
        };
        self.count += 1;
        self.sum += number;
        let delta = number - self.running_mean;
        self.running_mean += delta / self.count as f64;
        self.m2 += delta * (number - self.running_mean);
        self.min = Some(self.min.map_or(number, |min| min.min(number)));
        self.max = Some(self.max.map_or(number, |max| max.max(number)));
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self, table: &Table) -> NumericSummary {
        NumericSummary {
            column: table.columns[self.column].name.clone(),
            count: self.count,
            mean: (self.count > 0).then(|| self.sum / self.count as f64),
            min: self.min,
            max: self.max,
            std: (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt()),
        }
    }
}
