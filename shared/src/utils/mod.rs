//! Utility functions and helpers

pub mod units;

pub use units::normalize;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
///
/// Defined as 0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Format a value with a metric prefix (e.g. `4096` -> `"4.096 K"`).
///
/// `base_two` switches the divisor from 1000 to 1024; `base_unit` is
/// appended after the prefix.
pub fn format_units(value: f64, base_two: bool, base_unit: &str) -> String {
    const PREFIXES: [&str; 8] = ["", "K", "M", "G", "T", "P", "E", "Z"];
    let divisor = if base_two { 1024.0 } else { 1000.0 };

    let mut value = value;
    for prefix in PREFIXES {
        if value < divisor {
            return format!("{:.3} {}{}", value, prefix, base_unit);
        }
        value /= divisor;
    }
    format!("{:.3} Y{}", value, base_unit)
}

/// Format a duration in seconds with the largest sub-second unit that
/// keeps it at or above 1 (`1.5e-3` -> `"1.500 ms"`).
pub fn format_seconds(seconds: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1.0e-3, "ms"), (1.0e-6, "us"), (1.0e-9, "ns")];

    if seconds == 0.0 || seconds.abs() >= 1.0 || !seconds.is_finite() {
        return format!("{:.3} s", seconds);
    }
    for (scale, unit) in UNITS {
        if seconds.abs() >= scale {
            return format!("{:.3} {}", seconds / scale, unit);
        }
    }
    format!("{:.3} ns", seconds / 1.0e-9)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[5.0]), 0.0);
        // sample std dev of 2, 4, 4, 4, 5, 5, 7, 9 is sqrt(32 / 7)
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(4096.0, false, ""), "4.096 K");
        assert_eq!(format_units(4096.0, true, ""), "4.000 K");
        assert_eq!(format_units(4096.0, false, "B/s"), "4.096 KB/s");
        assert_eq!(format_units(12.5, false, "s"), "12.500 s");
        assert_eq!(format_units(3.0e9, false, "flops"), "3.000 Gflops");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(2.0e-6), "2.000 us");
        assert_eq!(format_seconds(1.5e-3), "1.500 ms");
        assert_eq!(format_seconds(12.5), "12.500 s");
        assert_eq!(format_seconds(0.0), "0.000 s");
        assert_eq!(format_seconds(2.5e-10), "0.250 ns");
    }

    #[test]
    fn test_format_units_overflow_prefix() {
        assert_eq!(format_units(2.0e24, false, ""), "2.000 Y");
    }
}
