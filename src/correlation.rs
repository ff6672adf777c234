//! Pearson correlation, strength classification and least-squares trends.

use serde::Serialize;

use crate::error::{InsightsError, Result};
use crate::models::{Field, Track};

pub const STRONG_THRESHOLD: f64 = 0.7;
pub const MODERATE_THRESHOLD: f64 = 0.4;

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub strength: Strength,
    pub sign: Sign,
}

/// `|r| >= 0.7` strong, `>= 0.4` moderate, else weak.
///
/// Zero counts as positive. NaN classifies as weak and negative.
pub fn classify(r: f64) -> Classification {
    let abs = r.abs();
    let strength = if abs >= STRONG_THRESHOLD {
        Strength::Strong
    } else if abs >= MODERATE_THRESHOLD {
        Strength::Moderate
    } else {
        Strength::Weak
    };
    let sign = if r >= 0.0 { Sign::Positive } else { Sign::Negative };
    Classification { strength, sign }
}

// ============================================================================
// Pearson
// ============================================================================

/// Pearson r over paired observations; non-finite pairs are skipped.
///
/// `None` with fewer than 2 usable pairs or when either side has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Pairwise-complete correlation matrix, symmetric, diagonal 1.0 where defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<Field>,
    pub values: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedPair {
    pub a: Field,
    pub b: Field,
    pub r: f64,
    pub classification: Classification,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Field, b: Field) -> Option<f64> {
        let i = self.fields.iter().position(|&f| f == a)?;
        let j = self.fields.iter().position(|&f| f == b)?;
        self.values[i][j]
    }

    /// Upper triangle, defined cells only, in field order.
    pub fn pairs(&self) -> Vec<CorrelatedPair> {
        let mut out = Vec::new();
        for i in 0..self.fields.len() {
            for j in (i + 1)..self.fields.len() {
                if let Some(r) = self.values[i][j] {
                    out.push(CorrelatedPair {
                        a: self.fields[i],
                        b: self.fields[j],
                        r,
                        classification: classify(r),
                    });
                }
            }
        }
        out
    }
}

/// Each cell uses only the rows where both of its two columns are present.
pub fn correlation_matrix<'a, I>(rows: I, fields: &[Field]) -> CorrelationMatrix
where
    I: IntoIterator<Item = &'a Track>,
{
    let columns: Vec<Vec<Option<f64>>> = {
        let rows: Vec<&Track> = rows.into_iter().collect();
        fields
            .iter()
            .map(|f| rows.iter().map(|t| f.number(t)).collect())
            .collect()
    };

    let n = fields.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let (xs, ys): (Vec<f64>, Vec<f64>) = columns[i]
                .iter()
                .zip(&columns[j])
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .unzip();
            let r = pearson(&xs, &ys);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        fields: fields.to_vec(),
        values,
    }
}

// ============================================================================
// Trend Fitting
// ============================================================================

/// First-degree least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
    /// Points used for the fit.
    pub points: usize,
}

impl Trend {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Fitted `(x, y)` at the smallest and largest finite x, for drawing.
    pub fn line(&self, xs: &[f64]) -> Option<[(f64, f64); 2]> {
        let finite = xs.iter().copied().filter(|x| x.is_finite());
        let lo = finite.clone().reduce(f64::min)?;
        let hi = finite.reduce(f64::max)?;
        Some([(lo, self.predict(lo)), (hi, self.predict(hi))])
    }
}

/// Ordinary least squares over the finite `(x, y)` pairs.
pub fn fit_trend(xs: &[f64], ys: &[f64]) -> Result<Trend> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if pairs.len() < 2 {
        return Err(InsightsError::InsufficientData {
            context: "trend fit",
            needed: 2,
            found: pairs.len(),
        });
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = pairs.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let sxy: f64 = pairs.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();

    if sxx == 0.0 {
        // Vertical point cloud: every x identical
        return Err(InsightsError::InsufficientData {
            context: "trend fit (distinct x values)",
            needed: 2,
            found: 1,
        });
    }

    let slope = sxy / sxx;
    Ok(Trend {
        slope,
        intercept: mean_y - slope * mean_x,
        points: pairs.len(),
    })
}

/// Trend of `y` against `x` over rows where both are present.
pub fn fit_fields<'a, I>(rows: I, x: Field, y: Field) -> Result<Trend>
where
    I: IntoIterator<Item = &'a Track>,
{
    let (xs, ys): (Vec<f64>, Vec<f64>) = rows
        .into_iter()
        .filter_map(|t| Some((x.number(t)?, y.number(t)?)))
        .unzip();
    fit_trend(&xs, &ys)
}
