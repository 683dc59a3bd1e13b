//! 整数ドメイン。
//!
//! `PathEngine` は固定幅の符号付き整数（高速・有限範囲）と多倍長整数
//! （低速・実質無制限）のどちらでも同じコードで動く。
//! 除算・剰余は `Integer::div_rem`（0 方向への切り捨て）を使う。

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{CheckedAdd, CheckedMul, CheckedSub, Signed};

/// 経路計算に使える整数型
pub trait PathInt:
    Clone
    + Debug
    + Display
    + FromStr
    + Ord
    + Hash
    + Integer
    + Signed
    + CheckedAdd
    + CheckedSub
    + CheckedMul
    + From<i64>
{
    /// ドメイン名（ログ・エラー表示用）
    const DOMAIN: &'static str;

    /// |self|。表現できなければ None（固定幅の最小値）
    fn checked_abs(&self) -> Option<Self>;

    /// 0 方向への切り捨て除算
    #[inline]
    fn trunc_div(&self, other: &Self) -> Self {
        self.div_rem(other).0
    }

    /// 切り捨て除算に対応する剰余（符号は被除数に従う）
    #[inline]
    fn trunc_rem(&self, other: &Self) -> Self {
        self.div_rem(other).1
    }

    /// 10進桁数（符号を除く）
    fn decimal_digits(&self) -> usize {
        let s = self.to_string();
        s.trim_start_matches('-').len()
    }
}

impl PathInt for i64 {
    const DOMAIN: &'static str = "i64";

    #[inline]
    fn checked_abs(&self) -> Option<Self> {
        i64::checked_abs(*self)
    }
}

impl PathInt for i128 {
    const DOMAIN: &'static str = "i128";

    #[inline]
    fn checked_abs(&self) -> Option<Self> {
        i128::checked_abs(*self)
    }
}

impl PathInt for BigInt {
    const DOMAIN: &'static str = "bigint";

    #[inline]
    fn checked_abs(&self) -> Option<Self> {
        Some(Signed::abs(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncating_semantics_i64() {
        assert_eq!((-7i64).trunc_div(&2), -3);
        assert_eq!((-7i64).trunc_rem(&2), -1);
        assert_eq!(7i64.trunc_div(&-2), -3);
        assert_eq!(7i64.trunc_rem(&6), 1);
    }

    #[test]
    fn test_truncating_semantics_bigint() {
        let n = BigInt::from(-7);
        assert_eq!(n.trunc_div(&BigInt::from(2)), BigInt::from(-3));
        assert_eq!(n.trunc_rem(&BigInt::from(2)), BigInt::from(-1));
        assert_eq!(n.trunc_rem(&BigInt::from(6)), BigInt::from(-1));
    }

    #[test]
    fn test_checked_abs() {
        assert_eq!(PathInt::checked_abs(&-5i64), Some(5));
        assert_eq!(PathInt::checked_abs(&i64::MIN), None);
        assert_eq!(
            PathInt::checked_abs(&BigInt::from(i64::MIN)),
            Some(BigInt::from(i64::MIN).abs())
        );
    }

    #[test]
    fn test_decimal_digits() {
        assert_eq!(0i64.decimal_digits(), 1);
        assert_eq!((-9232i64).decimal_digits(), 4);
        assert_eq!(BigInt::from(10).pow(30).decimal_digits(), 31);
    }
}
