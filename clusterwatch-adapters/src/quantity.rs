//! Kubernetes resource quantity parsing.
//!
//! Quantities are strings such as `"4"`, `"3500m"`, `"250000000n"`,
//! `"16Gi"` or `"1e3"`. Only the conversions needed for cluster summaries
//! are provided.

use crate::AdapterError;

const MIB: u64 = 1024 * 1024;

/// Suffix multipliers, longest first so `Mi` wins over `M`.
const SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parse a quantity into its value in base units (cores or bytes).
pub fn parse_quantity(input: &str) -> Result<f64, AdapterError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AdapterError::Quantity(input.to_string()));
    }

    let (number, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, mult)| s.strip_suffix(suffix).map(|n| (n, *mult)))
        .unwrap_or((s, 1.0));

    let value: f64 = number
        .parse()
        .map_err(|_| AdapterError::Quantity(input.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(AdapterError::Quantity(input.to_string()));
    }

    Ok(value * multiplier)
}

/// CPU quantity in millicores, rounded up.
pub fn cpu_millis(input: &str) -> Result<u64, AdapterError> {
    Ok(round_up(parse_quantity(input)? * 1000.0))
}

/// CPU quantity in whole cores, rounded up.
pub fn cpu_cores(input: &str) -> Result<u64, AdapterError> {
    Ok(round_up(parse_quantity(input)?))
}

/// Memory quantity in bytes, rounded up.
pub fn memory_bytes(input: &str) -> Result<u64, AdapterError> {
    Ok(round_up(parse_quantity(input)?))
}

pub fn format_cores(cores: u64) -> String {
    format!("{} cores", cores)
}

pub fn format_millis(millis: u64) -> String {
    format!("{}m", millis)
}

/// Whole mebibytes, rounded down.
pub fn format_mebibytes(bytes: u64) -> String {
    format!("{}Mi", bytes / MIB)
}

/// Round up, absorbing float noise such as 2.0000000000000004.
fn round_up(value: f64) -> u64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-6 {
        rounded as u64
    } else {
        value.ceil() as u64
    }
}
