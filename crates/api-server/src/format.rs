//! Presentation formatting. The engine returns raw fractions; only the
//! compatibility endpoint renders strings, and only through these helpers.

/// p-value with four decimals, e.g. `"0.0123"`.
pub fn format_p_value(p_value: f64) -> String {
    format!("{:.4}", p_value)
}

/// Percentage with two decimals and a trailing `%`, e.g. `"98.77%"`.
pub fn format_percent(percent: f64) -> String {
    format!("{:.2}%", percent)
}

/// A fraction in `[0, 1]` rendered as a percentage.
pub fn format_fraction_as_percent(fraction: f64) -> String {
    format_percent(fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p_value_four_decimals() {
        assert_eq!(format_p_value(0.012345), "0.0123");
        assert_eq!(format_p_value(1.0), "1.0000");
        assert_eq!(format_p_value(0.0), "0.0000");
    }

    #[test]
    fn test_percent_two_decimals_with_sign() {
        assert_eq!(format_percent(98.7654), "98.77%");
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_fraction_as_percent(0.25), "25.00%");
    }
}
