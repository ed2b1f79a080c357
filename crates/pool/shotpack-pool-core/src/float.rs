//! Float pool. Values are compared by bit pattern, so `-0.0`, `0.0` and
//! distinct NaN payloads stay distinct and the emitted table is exact.

use crate::pool::ContentPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FloatPool {
    bits: ContentPool<u32>,
    mantissa_bits: u32,
    scratch: Vec<u32>,
}

impl Default for FloatPool {
    fn default() -> Self {
        Self::new()
    }
}

impl FloatPool {
    /// Full precision pool.
    pub fn new() -> Self {
        Self::with_precision(32)
    }

    /// Pool that rounds every finite value to `bits` significant bits of its
    /// IEEE-754 pattern before storing. 32 disables rounding.
    pub fn with_precision(bits: u32) -> Self {
        Self {
            bits: ContentPool::new(),
            mantissa_bits: bits.clamp(1, 32),
            scratch: Vec::new(),
        }
    }

    #[inline]
    pub fn precision(&self) -> u32 {
        self.mantissa_bits
    }

    pub fn ensure_exists(&mut self, values: &[f32]) -> usize {
        self.scratch.clear();
        let bits = self.mantissa_bits;
        self.scratch
            .extend(values.iter().map(|&v| round_mantissa(v, bits).to_bits()));
        self.bits.ensure_exists(&self.scratch)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f32> {
        self.bits.as_slice().get(index).map(|&b| f32::from_bits(b))
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.bits.as_slice().iter().map(|&b| f32::from_bits(b))
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.bits.into_inner().into_iter().map(f32::from_bits).collect()
    }
}

/// Round `value` to its top `bits` bits (sign and exponent included).
/// Non-finite values and `bits >= 32` pass through unchanged.
pub fn round_mantissa(value: f32, bits: u32) -> f32 {
    if bits >= 32 || !value.is_finite() {
        return value;
    }
    let drop = 32 - bits.max(1);
    let half = 1u32 << (drop - 1);
    let mask = !0u32 << drop;
    f32::from_bits(value.to_bits().wrapping_add(half) & mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_zero_is_distinct() {
        let mut pool = FloatPool::new();
        assert_eq!(pool.ensure_exists(&[0.0, 1.0]), 0);
        assert_eq!(pool.ensure_exists(&[-0.0]), 2);
        assert_eq!(pool.ensure_exists(&[1.0]), 1);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn rounding_hook() {
        assert_eq!(round_mantissa(1.234_567_8, 32), 1.234_567_8);
        assert_eq!(round_mantissa(f32::INFINITY, 12), f32::INFINITY);
        let r = round_mantissa(1.234_567_8, 16);
        assert_eq!(r.to_bits() & 0xffff, 0);
        assert!((r - 1.234_567_8).abs() < 1e-2);

        let mut coarse = FloatPool::with_precision(16);
        let a = coarse.ensure_exists(&[1.000_001]);
        let b = coarse.ensure_exists(&[1.0]);
        assert_eq!(a, b);
    }
}
