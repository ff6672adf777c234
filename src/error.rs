//! Error taxonomy for the insights pipeline.
//!
//! Structural problems (missing columns, unreadable files) are fatal for a
//! session. Shape problems (too few points for a fit) are recoverable: the
//! caller suppresses that one view. Value-level noise never surfaces here;
//! the loader coerces it to null and counts it in `LoadStats`.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InsightsError>;

#[derive(Debug, Error)]
pub enum InsightsError {
    /// A required source column is absent from the dataset header.
    #[error("required column '{column}' is missing from the dataset header")]
    MissingColumn { column: &'static str },

    /// A derived view has too few usable rows to be meaningful.
    #[error("insufficient data for {context}: need at least {needed}, found {found}")]
    InsufficientData {
        context: &'static str,
        needed: usize,
        found: usize,
    },

    /// An `explicit` cell that is neither a boolean nor empty.
    #[error("unrecognized explicit value '{0}' (expected true, false or empty)")]
    UnrecognizedExplicit(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to open dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
}

impl InsightsError {
    /// True for errors a page should degrade on instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            InsightsError::InsufficientData { .. } | InsightsError::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message() {
        let err = InsightsError::MissingColumn {
            column: "artist_popularity",
        };
        assert!(err.to_string().contains("'artist_popularity'"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_insufficient_data_is_recoverable() {
        let err = InsightsError::InsufficientData {
            context: "trend fit",
            needed: 2,
            found: 1,
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("need at least 2, found 1"));
    }
}
