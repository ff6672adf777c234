//! Progress reporting for the load phase.
//!
//! Interactive runs get an `indicatif` bar sized by the dataset's byte
//! length. In quiet mode the bar is hidden and periodic `[phase]` lines go
//! to stderr instead, which keeps output readable when piped to a log.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for quiet mode (set from args in main)
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(value: bool) {
    QUIET.store(value, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Records between quiet-mode progress lines.
pub const LOG_INTERVAL_RECORDS: u64 = 50_000;

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Byte-based bar for reading the dataset file.
/// Falls back to a spinner when the length is unknown (readers, pipes).
pub fn dataset_bar(total_bytes: Option<u64>, msg: &str) -> ProgressBar {
    let pb = match total_bytes {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    if is_quiet() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if total_bytes.is_some() {
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
    } else if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Quiet-mode heartbeat: one line every `LOG_INTERVAL_RECORDS` records.
pub fn log_records(phase: &str, records: u64) {
    if is_quiet() && records > 0 && records % LOG_INTERVAL_RECORDS == 0 {
        eprintln!("[{}] {} records", phase, records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(12)), "12.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }
}
