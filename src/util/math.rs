//! Small numeric helpers shared by prior generation and decoding.

/// Integer ceiling division, `ceil(value / divisor)`.
pub(crate) fn ceil_div(value: usize, divisor: usize) -> usize {
    value.div_ceil(divisor)
}

/// Returns true when `value` lies in the half-open interval `(0, 1]`.
pub(crate) fn in_unit_open_closed(value: f32) -> bool {
    value > 0.0 && value <= 1.0
}

/// Returns true when `value` lies in the closed interval `[0, 1]`.
pub(crate) fn in_unit_closed(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::{ceil_div, in_unit_closed, in_unit_open_closed};

    #[test]
    fn ceil_div_rounds_up_partial_cells() {
        assert_eq!(ceil_div(320, 8), 40);
        assert_eq!(ceil_div(240, 32), 8);
        assert_eq!(ceil_div(240, 64), 4);
        assert_eq!(ceil_div(1, 64), 1);
    }

    #[test]
    fn unit_interval_checks_reject_nan() {
        assert!(!in_unit_open_closed(f32::NAN));
        assert!(!in_unit_closed(f32::NAN));
        assert!(!in_unit_open_closed(0.0));
        assert!(in_unit_open_closed(1.0));
        assert!(in_unit_closed(0.0));
        assert!(!in_unit_closed(1.0001));
    }
}
