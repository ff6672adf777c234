//! Safety checks for report output paths.
//!
//! The dataset is read-only. These checks stop a mistyped `--output` or
//! `--stats-out` from overwriting the source CSV.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Extensions that look like a dataset rather than a report.
const DATASET_EXTENSIONS: [&str; 3] = ["csv", "tsv", "parquet"];

fn resolved(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output must have the `required_extension` (e.g. "json")
/// - Output cannot be the same file as any of the source paths
/// - Output cannot carry a dataset extension
pub fn validate_output_path(
    output: &Path,
    required_extension: &str,
    source_paths: &[&Path],
) -> Result<()> {
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if DATASET_EXTENSIONS.contains(&extension.as_str()) {
        bail!(
            "Safety check failed: output '{}' looks like a dataset file",
            output.display()
        );
    }

    if extension != required_extension {
        bail!(
            "Safety check failed: output file '{}' must have a .{} extension",
            output.display(),
            required_extension
        );
    }

    let target = resolved(output);
    for source in source_paths {
        if output == *source || target == resolved(source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_json_output() {
        let output = PathBuf::from("/tmp/overview.json");
        let source = PathBuf::from("/data/spotify_tracks.csv");
        assert!(validate_output_path(&output, "json", &[&source]).is_ok());
        assert!(validate_output_path(Path::new("/tmp/STATS.JSON"), "json", &[&source]).is_ok());
    }

    #[test]
    fn test_wrong_extension() {
        let output = PathBuf::from("/tmp/report.txt");
        let source = PathBuf::from("/data/spotify_tracks.csv");
        let result = validate_output_path(&output, "json", &[&source]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must have a .json extension"));
    }

    #[test]
    fn test_dataset_extension_blocked() {
        let output = PathBuf::from("/tmp/other.csv");
        let source = PathBuf::from("/data/spotify_tracks.csv");
        let result = validate_output_path(&output, "json", &[&source]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("looks like a dataset"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/tracks.json");
        let result = validate_output_path(&path, "json", &[&path]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }

    #[test]
    fn test_output_equals_source_through_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("data.json");
        std::fs::write(&source, "{}").unwrap();
        let aliased = dir.path().join(".").join("data.json");
        assert!(validate_output_path(&aliased, "json", &[&source]).is_err());
    }
}
