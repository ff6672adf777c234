//! Interquartile-range outlier detection.
//!
//! Two scopes exist and callers must pick one explicitly: fences over the
//! whole selection ("exceptional tracks") or fences recomputed inside each
//! group ("outliers per duration category").

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::aggregate::{quantile, GroupKey, GroupValue};
use crate::error::{InsightsError, Result};
use crate::models::{Field, Track};

/// Fence distance in IQRs.
pub const FENCE_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    pub fn is_above(&self, v: f64) -> bool {
        v > self.upper
    }

    pub fn is_below(&self, v: f64) -> bool {
        v < self.lower
    }
}

/// Indices of values strictly outside the fences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outliers {
    pub above: BTreeSet<usize>,
    pub below: BTreeSet<usize>,
}

impl Outliers {
    pub fn len(&self) -> usize {
        self.above.len() + self.below.len()
    }

    pub fn is_empty(&self) -> bool {
        self.above.is_empty() && self.below.is_empty()
    }

    fn merge(&mut self, other: Outliers) {
        self.above.extend(other.above);
        self.below.extend(other.below);
    }
}

/// `Q1 - 1.5*IQR` and `Q3 + 1.5*IQR`, quartiles by linear interpolation.
/// Non-finite values are ignored.
pub fn iqr_fences(values: &[f64]) -> Result<Fences> {
    let (Some(q1), Some(q3)) = (quantile(values, 0.25), quantile(values, 0.75)) else {
        return Err(InsightsError::InsufficientData {
            context: "IQR fences",
            needed: 1,
            found: 0,
        });
    };
    let iqr = q3 - q1;
    Ok(Fences {
        q1,
        q3,
        iqr,
        lower: q1 - FENCE_FACTOR * iqr,
        upper: q3 + FENCE_FACTOR * iqr,
    })
}

/// Flag values outside their own fences. Indices are positions in `values`;
/// an input without finite values flags nothing.
pub fn flag_outliers(values: &[f64]) -> Outliers {
    let Ok(fences) = iqr_fences(values) else {
        return Outliers::default();
    };
    let mut out = Outliers::default();
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        if fences.is_above(v) {
            out.above.insert(i);
        } else if fences.is_below(v) {
            out.below.insert(i);
        }
    }
    out
}

/// Where fences are computed.
#[derive(Clone, Copy)]
pub enum OutlierScope<'k> {
    /// One set of fences over every row.
    Whole,
    /// Fences recomputed per group; rows with a null key are skipped.
    PerGroup(&'k dyn GroupKey),
}

/// Flag rows by `measure`. Indices refer to positions in `rows`.
pub fn detect(rows: &[Track], measure: Field, scope: OutlierScope<'_>) -> Outliers {
    match scope {
        OutlierScope::Whole => flag_measure(rows.iter().enumerate(), measure),
        OutlierScope::PerGroup(key) => {
            let mut out = Outliers::default();
            for (_, members) in partition(rows, key) {
                out.merge(flag_measure(members.into_iter(), measure));
            }
            out
        }
    }
}

/// Outlier counts per group, in group order. Empty groups are not reported.
pub fn counts_per_group(rows: &[Track], measure: Field, key: &dyn GroupKey) -> Vec<(GroupValue, Outliers)> {
    partition(rows, key)
        .into_iter()
        .map(|(k, members)| (k, flag_measure(members.into_iter(), measure)))
        .collect()
}

fn partition<'a>(rows: &'a [Track], key: &dyn GroupKey) -> BTreeMap<GroupValue, Vec<(usize, &'a Track)>> {
    let mut groups: BTreeMap<GroupValue, Vec<(usize, &Track)>> = BTreeMap::new();
    for (i, t) in rows.iter().enumerate() {
        let k = key.key(t);
        if !k.is_null() {
            groups.entry(k).or_default().push((i, t));
        }
    }
    groups
}

/// Rows without the measure are neither fenced nor flagged.
fn flag_measure<'a, I>(rows: I, measure: Field) -> Outliers
where
    I: Iterator<Item = (usize, &'a Track)>,
{
    let (idx, values): (Vec<usize>, Vec<f64>) = rows
        .filter_map(|(i, t)| Some((i, measure.number(t)?)))
        .unzip();
    let local = flag_outliers(&values);
    Outliers {
        above: local.above.into_iter().map(|i| idx[i]).collect(),
        below: local.below.into_iter().map(|i| idx[i]).collect(),
    }
}
