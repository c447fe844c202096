//! Saturating arithmetic shared by the interpreter and the constant folder,
//! so folded and unfolded programs agree (§4.2, §6).

use num_bigint::BigInt;
use num_traits::Zero;

pub fn sub(a: &BigInt, b: &BigInt) -> BigInt {
    if a < b {
        BigInt::zero()
    } else {
        a - b
    }
}

pub fn div(a: &BigInt, b: &BigInt) -> BigInt {
    if b.is_zero() {
        BigInt::zero()
    } else {
        a / b
    }
}

pub fn rem(a: &BigInt, b: &BigInt) -> BigInt {
    if b.is_zero() {
        BigInt::zero()
    } else {
        a % b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_clamps_at_zero() {
        assert_eq!(sub(&BigInt::from(3), &BigInt::from(5)), BigInt::zero());
    }

    #[test]
    fn div_by_zero_is_zero() {
        assert_eq!(div(&BigInt::from(10), &BigInt::zero()), BigInt::zero());
    }

    #[test]
    fn rem_by_zero_is_zero() {
        assert_eq!(rem(&BigInt::from(10), &BigInt::zero()), BigInt::zero());
    }
}
