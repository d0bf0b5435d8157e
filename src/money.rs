use bigdecimal::{BigDecimal, One, ToPrimitive, Zero};

/// Scale used for quantities, labor hours and unitless ratios.
pub const QUANTITY_SCALE: i64 = 4;

/// Smallest representable step at `scale` (0.01 for scale 2).
pub fn unit(scale: i64) -> BigDecimal {
    (0..scale).fold(BigDecimal::one(), |acc, _| acc / BigDecimal::from(10))
}

/// Cost-breakdown tolerance: one cent.
pub fn cent() -> BigDecimal {
    unit(2)
}

/// Round half-up on magnitude: 2.345 -> 2.35, -2.345 -> -2.35.
pub fn round_half_up(value: &BigDecimal, scale: i64) -> BigDecimal {
    let truncated = value.with_scale(scale);
    let remainder = (value - &truncated).abs();
    let step = unit(scale);
    let half = &step / BigDecimal::from(2);

    if remainder >= half {
        if *value < BigDecimal::zero() {
            truncated - step
        } else {
            truncated + step
        }
    } else {
        truncated
    }
}

/// `part / whole * 100`, rounded. `None` when `whole` is zero.
pub fn percent_of(part: &BigDecimal, whole: &BigDecimal, scale: i64) -> Option<BigDecimal> {
    if whole.is_zero() {
        return None;
    }
    let raw = part * BigDecimal::from(100) / whole;
    Some(round_half_up(&raw, scale))
}

pub fn within_tolerance(a: &BigDecimal, b: &BigDecimal, tolerance: &BigDecimal) -> bool {
    (a - b).abs() <= *tolerance
}

/// Ratio as `f64` for unitless scoring. Money never flows back through this.
pub fn to_ratio(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Round a unitless score to 4 places so equal inputs always compare equal.
pub fn round_score(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn sum<'a>(values: impl IntoIterator<Item = &'a BigDecimal>) -> BigDecimal {
    values
        .into_iter()
        .fold(BigDecimal::zero(), |acc, v| acc + v)
}
