//! Profiler unit normalization
//!
//! nvprof reports each column in a unit of its choosing (`GB/s`, `us`, ...).
//! Values are brought to bytes, bytes/second or seconds here.

use crate::types::table::Value;
use tracing::debug;

/// Multiplier that brings a value in `unit` to its base unit
pub fn unit_multiplier(unit: &str) -> Option<f64> {
    let factor = match unit {
        "GB/s" => 1_073_741_824.0,
        "MB/s" => 1_048_576.0,
        "KB/s" => 1024.0,
        "B/s" => 1.0,
        "ns" => 1e-9,
        "us" => 1e-6,
        "ms" => 1e-3,
        "s" => 1.0,
        _ => return None,
    };
    Some(factor)
}

/// Convert a raw profiler value with its unit label to a base-unit value.
///
/// Unknown units pass the number through unscaled. Values that do not parse
/// as numbers are returned as text, untouched.
pub fn normalize(raw: &str, unit: &str) -> Value {
    let factor = unit_multiplier(unit).unwrap_or_else(|| {
        debug!("Unknown unit {:?}, keeping value as is", unit);
        1.0
    });

    match raw.trim().parse::<f64>() {
        Ok(n) => Value::Number(n * factor),
        Err(_) => Value::Text(raw.to_string()),
    }
}
