//! Utility functions for the ble-health-session crate.

/// Pounds per kilogram (international avoirdupois pound).
pub const POUNDS_PER_KILOGRAM: f64 = 2.204_622_621_8;

/// Convert kilograms to pounds.
///
/// # Example
///
/// ```
/// use ble_health_session::kilograms_to_pounds;
///
/// let pounds = kilograms_to_pounds(1.0);
/// assert!((pounds - 2.2046).abs() < 0.001);
/// ```
#[inline]
pub fn kilograms_to_pounds(kilograms: f64) -> f64 {
    kilograms * POUNDS_PER_KILOGRAM
}

/// Convert pounds to kilograms.
///
/// # Example
///
/// ```
/// use ble_health_session::pounds_to_kilograms;
///
/// let kilograms = pounds_to_kilograms(220.462_262_18);
/// assert!((kilograms - 100.0).abs() < 0.001);
/// ```
#[inline]
pub fn pounds_to_kilograms(pounds: f64) -> f64 {
    pounds / POUNDS_PER_KILOGRAM
}

/// Format bytes as an uppercase hex string for log output.
pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_roundtrip() {
        let original = 81.7;
        let converted = pounds_to_kilograms(kilograms_to_pounds(original));
        assert!((converted - original).abs() < 0.0001);
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(hex_string(&[0x51, 0x71, 0x0A]), "51 71 0A");
        assert_eq!(hex_string(&[]), "");
    }
}
