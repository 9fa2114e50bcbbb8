//! Pure wind math.
//!
//! Wind is derived, never accumulated: callers recompute it from cumulative
//! usage, break reduction, and the daily limit after every change. The
//! value is unclamped internally (it can exceed 100 so "how far over limit"
//! stays recoverable); only presentation clamps via [`display_wind`].

/// Usage seconds that actually count toward wind, after break reduction.
pub fn effective_seconds(cumulative_seconds: u64, break_reduction_seconds: u64) -> u64 {
    cumulative_seconds.saturating_sub(break_reduction_seconds)
}

/// Wind points for the given effective usage against the daily limit.
///
/// A zero limit is a caller contract violation and degrades to 0.0 instead
/// of dividing by zero.
pub fn calculate_wind(effective_seconds: u64, limit_seconds: u32) -> f64 {
    if limit_seconds == 0 {
        return 0.0;
    }
    100.0 * effective_seconds as f64 / f64::from(limit_seconds)
}

/// Clamp for display. Engine consumers use the unclamped value.
pub fn display_wind(points: f64) -> f64 {
    points.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wind_is_linear_in_effective_seconds() {
        assert_eq!(calculate_wind(0, 1800), 0.0);
        assert_eq!(calculate_wind(180, 1800), 10.0);
        assert_eq!(calculate_wind(900, 1800), 50.0);
        assert_eq!(calculate_wind(1800, 1800), 100.0);
    }

    #[test]
    fn wind_is_unclamped_over_limit() {
        assert_eq!(calculate_wind(3600, 1800), 200.0);
        assert_eq!(display_wind(200.0), 100.0);
    }

    #[test]
    fn zero_limit_degrades_to_zero_wind() {
        assert_eq!(calculate_wind(900, 0), 0.0);
    }

    #[test]
    fn reduction_floors_at_zero() {
        assert_eq!(effective_seconds(100, 250), 0);
        assert_eq!(effective_seconds(250, 100), 150);
    }
}
