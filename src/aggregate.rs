use indexmap::IndexMap;
use std::cmp::Ordering;

use crate::columns::{is_numeric_type, AggMethod, SortMethod, XAxisColumn, YAxisColumn};
use crate::value::{cell, locale_compare, GroupKey, Row, Value};

/// One group of rows sharing an x value, with one reduced value per y column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedGroup {
    pub index: Value,
    pub values: IndexMap<String, Option<f64>>,
}

/// Rows partitioned by the value of one column, in first-occurrence order.
pub struct RowGroup<'a> {
    pub key: Value,
    pub rows: Vec<&'a Row>,
}

/// Main entry point: group rows by the x column and reduce every y column.
///
/// No rows, or no y columns, yields no groups. Records are reordered only
/// when the x column asks for a sort.
pub fn aggregate(rows: &[Row], x: &XAxisColumn, ys: &[YAxisColumn]) -> Vec<AggregatedGroup> {
    if ys.is_empty() {
        return Vec::new();
    }

    let mut groups = reduce_groups(rows, &x.name, ys);
    sort_by_key_string(&mut groups, x.sort_method, |g| &g.index);
    groups
}

/// Group by `column` and reduce every y column, in discovery order.
pub fn reduce_groups(rows: &[Row], column: &str, ys: &[YAxisColumn]) -> Vec<AggregatedGroup> {
    group_rows(rows, column)
        .into_iter()
        .map(|group| AggregatedGroup {
            values: ys
                .iter()
                .map(|y| (y.name.clone(), reduce_column(&group.rows, y)))
                .collect(),
            index: group.key,
        })
        .collect()
}

/// Group rows by exact value equality of `column`.
pub fn group_rows<'a>(rows: &'a [Row], column: &str) -> Vec<RowGroup<'a>> {
    let mut groups: IndexMap<GroupKey, RowGroup<'a>> = IndexMap::new();
    for row in rows {
        let value = cell(row, column);
        groups
            .entry(value.group_key())
            .or_insert_with(|| RowGroup {
                key: value.clone(),
                rows: Vec::new(),
            })
            .rows
            .push(row);
    }
    groups.into_values().collect()
}

pub fn reduce_column(rows: &[&Row], y: &YAxisColumn) -> Option<f64> {
    y.agg_method.reduce(rows, &y.name, &y.column_type)
}

impl AggMethod {
    /// Reduce one column over a group of rows.
    ///
    /// SUM is zero when nothing coerces to a number; AVG has no value then.
    /// COUNT counts numeric values for numeric columns and rows otherwise.
    pub fn reduce(self, rows: &[&Row], column: &str, column_type: &str) -> Option<f64> {
        let numbers = || rows.iter().filter_map(|row| cell(row, column).as_number());
        match self {
            AggMethod::Sum => Some(numbers().sum()),
            AggMethod::Avg => {
                let (sum, n) = numbers().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    None
                } else {
                    Some(sum / n as f64)
                }
            }
            AggMethod::Count => {
                if is_numeric_type(column_type) {
                    Some(numbers().count() as f64)
                } else {
                    Some(rows.len() as f64)
                }
            }
        }
    }
}

/// Stable sort by the string form of a key; `None` leaves discovery order.
pub fn sort_by_key_string<T, F>(items: &mut [T], method: SortMethod, key: F)
where
    F: Fn(&T) -> &Value,
{
    let compare = |a: &T, b: &T| -> Ordering { locale_compare(&key(a).to_key_string(), &key(b).to_key_string()) };
    match method {
        SortMethod::None => {}
        SortMethod::Asc => items.sort_by(compare),
        SortMethod::Desc => items.sort_by(|a, b| compare(b, a)),
    }
}
