//! Aggregation engine: group-by statistics, stable ranking and quantiles.
//!
//! Grouping is driven by the `GroupKey` trait so stored columns, bucket
//! schemes and segment rules all plug in the same way, without writing
//! derived columns back into the table.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{Field, Track, Value};

// ============================================================================
// Group Keys
// ============================================================================

/// A group label. Groups sort by variant (numbers, ordered buckets, text)
/// with `Null` last, then by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupValue {
    Int(i64),
    /// Ordered category such as a duration bucket; sorts by `rank`.
    Ordinal { rank: u32, label: &'static str },
    Text(String),
    Null,
}

impl GroupValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GroupValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            GroupValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Int(v) => write!(f, "{}", v),
            GroupValue::Ordinal { label, .. } => f.write_str(label),
            GroupValue::Text(s) => f.write_str(s),
            GroupValue::Null => f.write_str("null"),
        }
    }
}

impl Serialize for GroupValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupValue::Int(v) => serializer.serialize_i64(*v),
            GroupValue::Ordinal { label, .. } => serializer.serialize_str(label),
            GroupValue::Text(s) => serializer.serialize_str(s),
            GroupValue::Null => serializer.serialize_none(),
        }
    }
}

/// Assigns each track to a group.
pub trait GroupKey {
    fn key(&self, track: &Track) -> GroupValue;
}

impl GroupKey for Field {
    fn key(&self, track: &Track) -> GroupValue {
        match self.value(track) {
            Value::Null => GroupValue::Null,
            Value::Text(s) => GroupValue::Text(s.to_string()),
            Value::Date(d) => GroupValue::Text(d.to_string()),
            Value::Number(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                GroupValue::Int(v as i64)
            }
            Value::Number(v) => GroupValue::Text(v.to_string()),
        }
    }
}

impl<F> GroupKey for F
where
    F: Fn(&Track) -> GroupValue,
{
    fn key(&self, track: &Track) -> GroupValue {
        self(track)
    }
}

// ============================================================================
// Group Statistics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatOp {
    Mean,
    /// Non-null values of the measure.
    Count,
    Min,
    Max,
    Sum,
    /// Distinct non-null values; works on text columns too.
    NUnique,
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: GroupValue,
    /// Rows in the group, nulls included.
    pub size: usize,
    /// One entry per requested measure; `None` when the group has no usable values.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub measures: Vec<(Field, StatOp)>,
    pub rows: Vec<GroupRow>,
}

#[derive(PartialEq, Eq, Hash)]
enum DistinctKey<'a> {
    Number(u64),
    Text(&'a str),
    Date(NaiveDate),
}

fn compute(field: Field, op: StatOp, tracks: &[&Track]) -> Option<f64> {
    match op {
        StatOp::Count => Some(
            tracks
                .iter()
                .filter(|t| field.value(t) != Value::Null)
                .count() as f64,
        ),
        StatOp::NUnique => {
            let distinct: FxHashSet<DistinctKey<'_>> = tracks
                .iter()
                .filter_map(|t| match field.value(t) {
                    Value::Null => None,
                    Value::Number(v) => Some(DistinctKey::Number(v.to_bits())),
                    Value::Text(s) => Some(DistinctKey::Text(s)),
                    Value::Date(d) => Some(DistinctKey::Date(d)),
                })
                .collect();
            Some(distinct.len() as f64)
        }
        _ => {
            let values: Vec<f64> = tracks.iter().filter_map(|t| field.number(t)).collect();
            match op {
                StatOp::Mean => mean(&values),
                StatOp::Median => median(&values),
                StatOp::Sum => (!values.is_empty()).then(|| values.iter().sum()),
                StatOp::Min => values.iter().copied().reduce(f64::min),
                StatOp::Max => values.iter().copied().reduce(f64::max),
                StatOp::Count | StatOp::NUnique => unreachable!("handled above"),
            }
        }
    }
}

/// Group `rows` by `key` and compute each `(field, op)` measure per group.
///
/// Null keys form their own group, sorted last. Groups are never empty.
pub fn group_stat<'a, I, K>(rows: I, key: &K, measures: &[(Field, StatOp)]) -> GroupStats
where
    I: IntoIterator<Item = &'a Track>,
    K: GroupKey + ?Sized,
{
    let mut groups: BTreeMap<GroupValue, Vec<&Track>> = BTreeMap::new();
    for track in rows {
        groups.entry(key.key(track)).or_default().push(track);
    }

    let rows = groups
        .into_iter()
        .map(|(key, tracks)| GroupRow {
            values: measures
                .iter()
                .map(|&(field, op)| compute(field, op, &tracks))
                .collect(),
            size: tracks.len(),
            key,
        })
        .collect();

    GroupStats {
        measures: measures.to_vec(),
        rows,
    }
}

impl GroupStats {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, field: Field, op: StatOp) -> Option<usize> {
        self.measures.iter().position(|&m| m == (field, op))
    }

    /// Value of a measure for the group labelled `key`.
    pub fn get(&self, key: &GroupValue, field: Field, op: StatOp) -> Option<f64> {
        let col = self.column(field, op)?;
        self.rows
            .iter()
            .find(|r| &r.key == key)
            .and_then(|r| r.values[col])
    }

    /// Stable sort by one measure; groups without a value go last.
    pub fn sorted_by(mut self, field: Field, op: StatOp, order: Order) -> Self {
        if let Some(col) = self.column(field, op) {
            self.rows
                .sort_by(|a, b| compare_keys(a.values[col], b.values[col], order));
        }
        self
    }

    pub fn top_n(self, field: Field, op: StatOp, n: usize, order: Order) -> Self {
        let mut sorted = self.sorted_by(field, op, order);
        sorted.rows.truncate(n);
        sorted
    }

    /// Group with the largest value; the first in group order wins ties.
    pub fn argmax(&self, field: Field, op: StatOp) -> Option<&GroupValue> {
        self.extreme(field, op, Ordering::Greater)
    }

    /// Group with the smallest value; the first in group order wins ties.
    pub fn argmin(&self, field: Field, op: StatOp) -> Option<&GroupValue> {
        self.extreme(field, op, Ordering::Less)
    }

    fn extreme(&self, field: Field, op: StatOp, wanted: Ordering) -> Option<&GroupValue> {
        let col = self.column(field, op)?;
        let mut best: Option<(&GroupValue, f64)> = None;
        for row in &self.rows {
            let Some(v) = row.values[col] else { continue };
            match best {
                Some((_, b)) if v.total_cmp(&b) != wanted => {}
                _ => best = Some((&row.key, v)),
            }
        }
        best.map(|(k, _)| k)
    }
}

// ============================================================================
// Ranking
// ============================================================================

fn compare_keys(a: Option<f64>, b: Option<f64>, order: Order) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match order {
            Order::Ascending => x.total_cmp(&y),
            Order::Descending => y.total_cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by `sort_key`, then keep the first `n`.
///
/// Ties keep their input order; items without a key go last.
pub fn top_n<T, F>(items: &[T], sort_key: F, n: usize, order: Order) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<f64>,
{
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| compare_keys(sort_key(a), sort_key(b), order));
    sorted.truncate(n);
    sorted
}

/// `top_n` over tracks by a numeric column.
pub fn top_tracks<'a, I>(rows: I, field: Field, n: usize, order: Order) -> Vec<&'a Track>
where
    I: IntoIterator<Item = &'a Track>,
{
    let rows: Vec<&Track> = rows.into_iter().collect();
    top_n(&rows, |t| field.number(t), n, order)
}

/// Group sizes ordered by count descending, then key. Null keys are left out.
pub fn value_counts<'a, I, K>(rows: I, key: &K) -> Vec<(GroupValue, usize)>
where
    I: IntoIterator<Item = &'a Track>,
    K: GroupKey + ?Sized,
{
    let mut counts: BTreeMap<GroupValue, usize> = BTreeMap::new();
    for track in rows {
        let k = key.key(track);
        if !k.is_null() {
            *counts.entry(k).or_default() += 1;
        }
    }
    let mut out: Vec<(GroupValue, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

// ============================================================================
// Summary Statistics
// ============================================================================

/// Non-null numeric values of a column.
pub fn numbers<'a, I>(rows: I, field: Field) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Track>,
{
    rows.into_iter().filter_map(|t| field.number(t)).collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks.
/// Non-finite values are ignored; `q` is clamped to `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
