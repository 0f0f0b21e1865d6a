//! Complex accumulator used by the block analyser.
//!
//! Replaces the original's `COMPLEX8_MAC`/`COMPLEX8_SCALE`/`COMPLEX8_SET`
//! macro family with a small value struct and methods; components are kept
//! at the 12-bit scale of [`crate::tone`] so the accumulation matches the
//! analyser's `>> 24` descale exactly.

use crate::tone::{cos12, sin12};

/// A widened complex accumulator at 12-bit component scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct Complex12 {
    pub re: i64,
    pub im: i64,
}

impl Complex12 {
    pub const fn zero() -> Self {
        Complex12 { re: 0, im: 0 }
    }

    /// A unit vector at the given 12-bit phase (replaces `COMPLEX8_SET` +
    /// a fresh `complex8_unitvect` call, except scaled for the 4096-entry
    /// table instead of the 256-entry one).
    pub fn from_angle(angle: i32) -> Self {
        Complex12 {
            re: cos12(angle) as i64,
            im: sin12(angle) as i64,
        }
    }

    /// Accumulates `sample * unit_vector(angle)` into `self` (replaces
    /// `COMPLEX8_MAC`).
    #[inline]
    pub fn mac(&mut self, sample: i64, angle: i32) {
        self.re += sample * cos12(angle) as i64;
        self.im += sample * sin12(angle) as i64;
    }

    /// `re*re + im*im` (replaces `COMPLEX8_POW2`). Widened to `i128`: for a
    /// large block (`k` close to word width) the squared magnitude can
    /// exceed `i64`, and the core must never panic (no overflow checks
    /// tripping in debug builds).
    #[inline]
    pub fn magnitude_sq(&self) -> i128 {
        let re = self.re as i128;
        let im = self.im as i128;
        re * re + im * im
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_accumulates_linearly() {
        let mut a = Complex12::zero();
        a.mac(10, 0);
        a.mac(10, 0);
        let mut b = Complex12::zero();
        b.mac(20, 0);
        assert_eq!(a.re, b.re);
        assert_eq!(a.im, b.im);
    }

    #[test]
    fn zero_sample_contributes_nothing() {
        let mut a = Complex12::zero();
        a.mac(0, 123);
        assert_eq!(a.magnitude_sq(), 0);
    }
}
