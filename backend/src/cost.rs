//! The instruction-count cost model shared by constant synthesis (§4.4) and
//! the register allocator's spill penalty (§4.5), both phrased in terms of
//! `bitlen`/`popcount` of a non-negative address or literal value.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

/// Number of bits needed to represent `v` (0 for `v == 0`), the same way
/// `bitlen` is used throughout §4.4/§4.5.
pub fn bitlen(v: &BigInt) -> u64 {
    if v.is_zero() {
        return 0;
    }
    v.bits()
}

/// Count of one-bits in `v`'s binary representation.
pub fn popcount(v: &BigInt) -> u64 {
    let (_, digits) = v.to_radix_le(2);
    digits.iter().filter(|&&d| d == 1).count() as u64
}

/// Cost of synthesizing `v` into a register from zero (§4.4): the cheaper of
/// repeated `INC` (cost `v`) and the binary buildup (`5*bitlen(v) +
/// popcount(v)`).
pub fn constant_cost(v: &BigInt) -> BigInt {
    let v = v.abs();
    let binary = BigInt::from(5u32) * BigInt::from(bitlen(&v)) + BigInt::from(popcount(&v));
    if v <= binary {
        v
    } else {
        binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitlen_of_zero_is_zero() {
        assert_eq!(bitlen(&BigInt::zero()), 0);
    }

    #[test]
    fn bitlen_and_popcount_of_five() {
        // 5 = 0b101
        assert_eq!(bitlen(&BigInt::from(5)), 3);
        assert_eq!(popcount(&BigInt::from(5)), 2);
    }

    #[test]
    fn small_constants_are_cheaper_by_increment() {
        // v=3: INC cost 3; binary cost 5*2+2=12. INC wins.
        assert_eq!(constant_cost(&BigInt::from(3)), BigInt::from(3));
    }

    #[test]
    fn large_constants_are_cheaper_by_binary_buildup() {
        // v=1000: bitlen=10, popcount=6 -> binary cost 56, cheaper than 1000.
        assert_eq!(constant_cost(&BigInt::from(1000)), BigInt::from(56));
    }
}
