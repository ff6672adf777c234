//! Track insights library - data pipeline and page views for a music track dashboard.

pub mod aggregate;
pub mod buckets;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod genre;
pub mod load;
pub mod models;
pub mod normalize;
pub mod outliers;
pub mod progress;
pub mod report;
pub mod safety;
pub mod segment;
pub mod simulator;

#[cfg(test)]
mod fixtures;

pub use dataset::{Dataset, DatasetCache};
pub use error::{InsightsError, Result};
pub use models::{Field, Table, Track};
