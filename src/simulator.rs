//! "What-if" popularity estimator.
//!
//! A fixed linear formula, not a fitted model: weights are constants chosen
//! to echo the correlations seen on the popularity page.

use serde::Serialize;

use crate::error::{InsightsError, Result};
use crate::models::AlbumType;

pub const ARTIST_WEIGHT: f64 = 0.6;
pub const FOLLOWERS_WEIGHT: f64 = 0.25;
pub const DURATION_WEIGHT: f64 = 0.15;
pub const SINGLE_BONUS: f64 = 8.0;

/// Duration with the full duration score, in minutes.
pub const IDEAL_DURATION_MIN: f64 = 3.5;
const DURATION_BASE: f64 = 50.0;
const DURATION_PENALTY_PER_MIN: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulatorInput {
    /// 0-100.
    pub artist_popularity: f64,
    pub followers_millions: f64,
    pub duration_min: f64,
    pub album_type: AlbumType,
}

impl Default for SimulatorInput {
    fn default() -> Self {
        Self {
            artist_popularity: 70.0,
            followers_millions: 5.0,
            duration_min: IDEAL_DURATION_MIN,
            album_type: AlbumType::Single,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PotentialTier {
    High,
    Good,
    Moderate,
    Low,
}

impl PotentialTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            PotentialTier::High
        } else if score >= 60.0 {
            PotentialTier::Good
        } else if score >= 40.0 {
            PotentialTier::Moderate
        } else {
            PotentialTier::Low
        }
    }
}

/// Per-factor contributions and the clamped total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub artist_factor: f64,
    pub followers_factor: f64,
    pub duration_factor: f64,
    pub album_factor: f64,
    /// Sum of factors clamped to `[0, 100]`.
    pub score: f64,
    pub tier: PotentialTier,
}

fn check(name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(InsightsError::InvalidInput(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )));
    }
    Ok(value)
}

pub fn estimate(input: &SimulatorInput) -> Result<Estimate> {
    let popularity = check("artist popularity", input.artist_popularity)?;
    if popularity > 100.0 {
        return Err(InsightsError::InvalidInput(format!(
            "artist popularity must be at most 100, got {}",
            popularity
        )));
    }
    let followers = check("followers", input.followers_millions)?;
    let duration = check("duration", input.duration_min)?;

    let artist_factor = popularity * ARTIST_WEIGHT;
    let followers_factor = followers * FOLLOWERS_WEIGHT;
    let duration_factor = (DURATION_BASE
        - (duration - IDEAL_DURATION_MIN).abs() * DURATION_PENALTY_PER_MIN)
        .max(0.0)
        * DURATION_WEIGHT;
    let album_factor = if input.album_type == AlbumType::Single {
        SINGLE_BONUS
    } else {
        0.0
    };

    let score = (artist_factor + followers_factor + duration_factor + album_factor).clamp(0.0, 100.0);
    Ok(Estimate {
        artist_factor,
        followers_factor,
        duration_factor,
        album_factor,
        score,
        tier: PotentialTier::from_score(score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_default_input() {
        let est = estimate(&SimulatorInput::default()).unwrap();
        assert!(close(est.artist_factor, 42.0));
        assert!(close(est.followers_factor, 1.25));
        assert!(close(est.duration_factor, 7.5));
        assert!(close(est.album_factor, 8.0));
        assert!(close(est.score, 58.75));
        assert_eq!(est.tier, PotentialTier::Moderate);
    }

    #[test]
    fn test_duration_factor_floors_at_zero() {
        let est = estimate(&SimulatorInput {
            duration_min: 10.0,
            album_type: AlbumType::Album,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(est.duration_factor, 0.0);
        assert_eq!(est.album_factor, 0.0);
    }

    #[test]
    fn test_score_clamped() {
        let est = estimate(&SimulatorInput {
            artist_popularity: 100.0,
            followers_millions: 400.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(est.score, 100.0);
        assert_eq!(est.tier, PotentialTier::High);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        for input in [
            SimulatorInput {
                artist_popularity: -1.0,
                ..Default::default()
            },
            SimulatorInput {
                artist_popularity: 101.0,
                ..Default::default()
            },
            SimulatorInput {
                followers_millions: f64::NAN,
                ..Default::default()
            },
            SimulatorInput {
                duration_min: f64::INFINITY,
                ..Default::default()
            },
        ] {
            let err = estimate(&input).unwrap_err();
            assert!(matches!(err, InsightsError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_tiers() {
        assert_eq!(PotentialTier::from_score(80.0), PotentialTier::High);
        assert_eq!(PotentialTier::from_score(79.9), PotentialTier::Good);
        assert_eq!(PotentialTier::from_score(40.0), PotentialTier::Moderate);
        assert_eq!(PotentialTier::from_score(0.0), PotentialTier::Low);
    }
}
