use serde::{Deserialize, Serialize};

/// What the numerical values of a metric represent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueUnit {
    /// Memory in bytes.
    Bytes,
    /// Plain object / event count.
    Count,
    /// CPU sample count (perf, folded stacks).
    #[default]
    Samples,
    /// Wall-clock time in nanoseconds.
    Nanoseconds,
    /// Wall-clock time in microseconds.
    Microseconds,
    /// Wall-clock time in milliseconds.
    Milliseconds,
    /// Arbitrary weight (custom profilers).
    Weight,
}

impl ValueUnit {
    /// Format a value in this unit for display.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Self::Bytes => {
                if value >= 1_073_741_824.0 {
                    format!("{:.1} GiB", value / 1_073_741_824.0)
                } else if value >= 1_048_576.0 {
                    format!("{:.1} MiB", value / 1_048_576.0)
                } else if value >= 1_024.0 {
                    format!("{:.1} KiB", value / 1_024.0)
                } else {
                    format!("{} B", value as u64)
                }
            }
            Self::Count => format!("{}", value as u64),
            Self::Samples => format!("{} samples", value as u64),
            Self::Nanoseconds => {
                if value >= 1_000_000_000.0 {
                    format!("{:.2}s", value / 1_000_000_000.0)
                } else if value >= 1_000_000.0 {
                    format!("{:.1}ms", value / 1_000_000.0)
                } else if value >= 1_000.0 {
                    format!("{:.0}µs", value / 1_000.0)
                } else {
                    format!("{:.0}ns", value)
                }
            }
            Self::Microseconds => {
                if value >= 1_000_000.0 {
                    format!("{:.2}s", value / 1_000_000.0)
                } else if value >= 1_000.0 {
                    format!("{:.1}ms", value / 1_000.0)
                } else {
                    format!("{:.0}µs", value)
                }
            }
            Self::Milliseconds => {
                if value >= 1_000.0 {
                    format!("{:.2}s", value / 1_000.0)
                } else {
                    format!("{:.1}ms", value)
                }
            }
            Self::Weight => format!("{:.0}", value),
        }
    }
}

/// `value` as a percentage of `total`, two decimals. A zero total reads `0%`.
pub fn format_percentage(value: f64, total: f64) -> String {
    if total == 0.0 {
        return "0%".to_string();
    }
    format!("{:.2}%", value / total * 100.0)
}
