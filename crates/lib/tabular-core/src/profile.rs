use std::collections::HashMap;

use tabular_store::models::{
    Column, ColumnDescriptor, ColumnType, Table, TableProfile, TopValue, Value,
};
use tabular_store::schema::TOP_VALUES;

/// Describes every column of a table.
#[must_use]
pub fn profile_table(table: &Table) -> TableProfile {
    TableProfile {
        table: table.name.clone(),
        row_count: table.row_count,
        column_count: table.columns.len(),
        columns: table.columns.iter().map(describe_column).collect(),
    }
}

/// Computes the descriptor for one column. Never fails, including for
/// all-null and mixed columns.
#[must_use]
pub fn describe_column(column: &Column) -> ColumnDescriptor {
    let count = column.values.len();
    let mut counts: HashMap<String, (usize, &Value)> = HashMap::new();
    let mut null_count = 0;
    for value in &column.values {
        if value.is_null() {
            null_count += 1;
            continue;
        }
        counts
            .entry(value.distinct_key())
            .or_insert((0, value))
            .0 += 1;
    }

    let mut descriptor = ColumnDescriptor {
        name: column.name.clone(),
        column_type: column.column_type,
        nullable: null_count > 0,
        count,
        null_count,
        non_null_count: count - null_count,
        distinct_count: counts.len(),
        min: None,
        max: None,
        mean: None,
        top_values: Vec::new(),
    };

    match column.column_type {
        ColumnType::Numeric => {
            let numbers = column.values.iter().filter(|value| value.is_numeric());
            descriptor.min = extreme(numbers.clone(), std::cmp::Ordering::Less);
            descriptor.max = extreme(numbers.clone(), std::cmp::Ordering::Greater);
            descriptor.mean = mean(numbers.filter_map(Value::as_f64));
        }
        ColumnType::Temporal => {
            let dates = column.values.iter().filter(|value| value.is_temporal());
            descriptor.min = extreme(dates.clone(), std::cmp::Ordering::Less);
            descriptor.max = extreme(dates, std::cmp::Ordering::Greater);
        }
        ColumnType::Text | ColumnType::Boolean | ColumnType::Mixed => {
            descriptor.top_values = top_values(counts);
        }
        ColumnType::Unknown => {}
    }
    descriptor
}

/// The value that sorts furthest in `direction`.
fn extreme<'a>(
    values: impl Iterator<Item = &'a Value>,
    direction: std::cmp::Ordering,
) -> Option<Value> {
    values
        .fold(None, |best: Option<&Value>, value| match best {
            Some(current) if current.compare(value) != Some(direction.reverse()) => Some(current),
            _ => Some(value),
        })
        .cloned()
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Most frequent values, by count descending then text ascending.
fn top_values(counts: HashMap<String, (usize, &Value)>) -> Vec<TopValue> {
    let mut ranked: Vec<(usize, &Value)> = counts.into_values().collect();
    ranked.sort_by(|(left_count, left), (right_count, right)| {
        right_count
            .cmp(left_count)
            .then_with(|| left.to_string().cmp(&right.to_string()))
            .then_with(|| left.type_name().cmp(right.type_name()))
    });
    ranked
        .into_iter()
        .take(TOP_VALUES)
        .map(|(count, value)| TopValue {
            value: value.clone(),
            count,
        })
        .collect()
}
