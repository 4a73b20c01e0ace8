//! Logging utilities
//!
//! Helpers for structured logging with tracing. Model output is untrusted and
//! can be long, so anything echoed into a log line goes through [`preview`]
//! and [`sanitize_for_logging`] first.

use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default number of characters kept by [`preview`]
pub const DEFAULT_PREVIEW_CHARS: usize = 120;

/// RAII guard for logging entry and exit of a pipeline stage
///
/// # Example
///
/// ```rust
/// use teams_ai::logging::LogGuard;
///
/// fn validate() {
///     let _guard = LogGuard::new("validate");
///     // Guard logs the elapsed time when dropped
/// }
/// ```
pub struct LogGuard {
    name: String,
    start: Instant,
}

impl LogGuard {
    /// Create a new log guard
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(stage = %name, "Entering");

        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Get elapsed time since guard creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        debug!(
            stage = %self.name,
            elapsed = %format_duration(self.start.elapsed()),
            "Exiting"
        );
    }
}

/// Format duration in human-readable form
///
/// ```rust
/// use teams_ai::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{}ms", micros / 1000)
    } else {
        format!("{:.2}s", micros as f64 / 1_000_000.0)
    }
}

/// Truncate text for a log line, appending an ellipsis when cut
///
/// Counts characters rather than bytes so multi-byte output never splits.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

fn secret_patterns() -> &'static [(regex::Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(regex::Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)(api[\s_-]?key|apikey)\s*[:=]\s*\S+", "$1: [REDACTED]"),
            (r"(?i)(password|passwd|pwd)\s*[:=]\s*\S+", "$1: [REDACTED]"),
            (r"(?i)(token)\s*[:=]\s*\S+", "$1: [REDACTED]"),
            (r"(?i)(secret)\s*[:=]\s*\S+", "$1: [REDACTED]"),
            (
                r"(?i)(authorization|auth)\s*:\s*bearer\s+\S+",
                "$1: Bearer [REDACTED]",
            ),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            regex::Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Redact secrets the model may have echoed back
///
/// ```rust
/// use teams_ai::logging::sanitize_for_logging;
///
/// let sanitized = sanitize_for_logging("api_key: sk-abc123");
/// assert!(sanitized.contains("[REDACTED]"));
/// ```
pub fn sanitize_for_logging(input: &str) -> String {
    let mut result = input.to_string();
    for (re, replacement) in secret_patterns() {
        result = re.replace_all(&result, *replacement).to_string();
    }
    result
}

/// Sanitize then truncate model output for a log field
pub fn log_text(text: &str) -> String {
    preview(&sanitize_for_logging(text), DEFAULT_PREVIEW_CHARS)
}
