//! Cubic Hermite basis functions.
//!
//! Tangents passed here are already scaled by the segment duration, so the
//! segment is evaluated on the unit interval.

#[inline]
pub fn h00(t: f64) -> f64 {
    2.0 * t.powi(3) - 3.0 * t.powi(2) + 1.0
}

#[inline]
pub fn h10(t: f64) -> f64 {
    t.powi(3) - 2.0 * t.powi(2) + t
}

#[inline]
pub fn h01(t: f64) -> f64 {
    -2.0 * t.powi(3) + 3.0 * t.powi(2)
}

#[inline]
pub fn h11(t: f64) -> f64 {
    t.powi(3) - t.powi(2)
}

/// Point on a cubic Hermite segment at `t` in [0, 1].
///
/// H(t) = h00(t) * p0 + h10(t) * m0 + h01(t) * p1 + h11(t) * m1
#[inline]
pub fn hermite(p0: f64, m0: f64, p1: f64, m1: f64, t: f64) -> f64 {
    h00(t) * p0 + h10(t) * m0 + h01(t) * p1 + h11(t) * m1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_partitions_endpoints() {
        assert_eq!(hermite(3.0, 10.0, 7.0, -10.0, 0.0), 3.0);
        assert_eq!(hermite(3.0, 10.0, 7.0, -10.0, 1.0), 7.0);
        assert_eq!(h01(0.5), 0.5);
        assert_eq!(h00(0.5) + h01(0.5), 1.0);
    }
}
