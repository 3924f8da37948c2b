//! Software oracle for the multiply-accumulate

use crate::variant::Variant;

/// Operand vectors the self-test feeds the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestVectors {
    /// First operand of the first pair
    pub x1: u32,
    /// Second operand of the first pair
    pub y1: u32,
    /// First operand of the second pair
    pub x2: u32,
    /// Second operand of the second pair
    pub y2: u32,
}

impl TestVectors {
    /// Build from the four operands
    pub const fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl Default for TestVectors {
    /// The fixed vectors the firmware self-test embeds: `2, 3, 2, 5`.
    fn default() -> Self {
        Self::new(2, 3, 2, 5)
    }
}

/// Expected accumulator value for `variant`.
///
/// - `V2`: `x1*y1 + x2*y2`
/// - `V3`: `x1*y1`; `x2` and `y2` are ignored
///
/// Arithmetic wraps modulo 2^32, as the 32-bit register does.
pub const fn reference_mac(variant: Variant, x1: u32, y1: u32, x2: u32, y2: u32) -> u32 {
    let first = x1.wrapping_mul(y1);
    match variant {
        Variant::V2 => first.wrapping_add(x2.wrapping_mul(y2)),
        Variant::V3 => first,
    }
}

impl Variant {
    /// [`reference_mac`] over a set of test vectors
    pub const fn reference(self, v: TestVectors) -> u32 {
        reference_mac(self, v.x1, v.y1, v.x2, v.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_vectors() {
        let v = TestVectors::default();
        assert_eq!(Variant::V2.reference(v), 16);
        assert_eq!(Variant::V3.reference(v), 6);
    }

    #[test]
    fn v3_ignores_second_pair() {
        for (x2, y2) in [(0, 0), (7, 9), (u32::MAX, u32::MAX)] {
            assert_eq!(reference_mac(Variant::V3, 11, 13, x2, y2), 143);
        }
    }

    #[test]
    fn wraps_on_overflow() {
        assert_eq!(reference_mac(Variant::V2, u32::MAX, 2, 1, 3), 1);
        assert_eq!(reference_mac(Variant::V3, 0x1_0000, 0x1_0000, 0, 0), 0);
    }

    #[test]
    fn repeated_calls_agree() {
        let a = reference_mac(Variant::V2, 123_456, 789, 42, 1_000_001);
        let b = reference_mac(Variant::V2, 123_456, 789, 42, 1_000_001);
        assert_eq!(a, b);
    }
}
