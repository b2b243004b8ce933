//! Imperial-to-metric unit conversions for weather station samples.

/// Hectopascals per inch of mercury.
pub const HPA_PER_INHG: f64 = 33.8639;

/// Kilometres per mile.
pub const KMH_PER_MPH: f64 = 1.60934;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Fahrenheit to Celsius.
pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Inches of mercury to hectopascals.
pub fn inhg_to_hpa(inhg: f64) -> f64 {
    inhg * HPA_PER_INHG
}

/// Miles per hour to kilometres per hour.
pub fn mph_to_kmh(mph: f64) -> f64 {
    mph * KMH_PER_MPH
}

/// Inches to millimetres.
pub fn inches_to_mm(inches: f64) -> f64 {
    inches * MM_PER_INCH
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-4;

    #[test]
    fn test_fahrenheit_to_celsius() {
        assert_eq!(fahrenheit_to_celsius(32.0), 0.0);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < EPSILON);
        assert!((fahrenheit_to_celsius(-40.0) + 40.0).abs() < EPSILON);
    }

    #[test]
    fn test_inhg_to_hpa() {
        assert!((inhg_to_hpa(1.0) - 33.8639).abs() < EPSILON);
    }

    #[test]
    fn test_mph_to_kmh() {
        assert!((mph_to_kmh(1.0) - 1.60934).abs() < EPSILON);
    }

    #[test]
    fn test_inches_to_mm() {
        assert_eq!(inches_to_mm(1.0), 25.4);
    }
}
