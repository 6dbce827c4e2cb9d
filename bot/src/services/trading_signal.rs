//! Threshold rule turning a price prediction into a position

use std::fmt;

/// Desired exposure: long (1), short (-1) or flat (0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSignal {
    Long,
    Short,
    Flat,
}

impl PositionSignal {
    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
            Self::Flat => 0,
        }
    }
}

impl fmt::Display for PositionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::Flat => "FLAT",
        };
        f.write_str(label)
    }
}

/// Long when the predicted relative change exceeds `threshold`, short when it
/// is below `-threshold`, flat otherwise.
pub fn get_position(current_price: f64, predicted_price: f64, threshold: f64) -> PositionSignal {
    if current_price <= 0.0 || !current_price.is_finite() || !predicted_price.is_finite() {
        return PositionSignal::Flat;
    }

    let price_change = (predicted_price - current_price) / current_price;
    if price_change > threshold {
        PositionSignal::Long
    } else if price_change < -threshold {
        PositionSignal::Short
    } else {
        PositionSignal::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_rule() {
        assert_eq!(get_position(100.0, 100.02, 0.0001), PositionSignal::Long);
        assert_eq!(get_position(100.0, 99.98, 0.0001), PositionSignal::Short);
        assert_eq!(get_position(100.0, 100.005, 0.0001), PositionSignal::Flat);
        assert_eq!(get_position(100.0, 99.995, 0.0001), PositionSignal::Flat);
    }

    #[test]
    fn test_boundary_is_flat() {
        // Exactly +/- threshold does not trigger
        assert_eq!(get_position(1.0, 1.5, 0.5), PositionSignal::Flat);
        assert_eq!(get_position(1.0, 0.5, 0.5), PositionSignal::Flat);
    }

    #[test]
    fn test_degenerate_prices_are_flat() {
        assert_eq!(get_position(0.0, 10.0, 0.0001), PositionSignal::Flat);
        assert_eq!(get_position(100.0, f64::NAN, 0.0001), PositionSignal::Flat);
    }

    #[test]
    fn test_signal_values() {
        assert_eq!(PositionSignal::Long.as_i8(), 1);
        assert_eq!(PositionSignal::Short.as_i8(), -1);
        assert_eq!(PositionSignal::Flat.as_i8(), 0);
        assert_eq!(PositionSignal::Short.to_string(), "SHORT");
    }
}
