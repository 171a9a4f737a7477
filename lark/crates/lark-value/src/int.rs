//! Lark integers.
//!
//! A machine-word fast path with transparent promotion to
//! arbitrary-precision `BigInt`. Demotion happens after every
//! operation: any result that fits in an `i64` is stored small, so
//! the big representation is only ever observed for values outside
//! the machine-word range. Hashes are computed from the low 64 bits
//! of the two's-complement value, so a small int and a big int of
//! equal value hash identically by construction.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use lark_util::{EvalError, Result};

/// Shift counts beyond this are refused rather than materialising
/// astronomically wide integers.
const MAX_SHIFT: u32 = 512;

/// An integer value: machine word or arbitrary precision.
///
/// # Examples
///
/// ```
/// use lark_value::LarkInt;
///
/// let a = LarkInt::from(i64::MAX);
/// let b = a.add(&LarkInt::from(1)); // promotes
/// assert!(b.to_i64().is_none());
/// let c = b.sub(&LarkInt::from(1)); // demotes back
/// assert_eq!(c.to_i64(), Some(i64::MAX));
/// ```
#[derive(Clone, Debug)]
pub enum LarkInt {
    Small(i64),
    Big(Rc<BigInt>),
}

impl From<i64> for LarkInt {
    fn from(v: i64) -> LarkInt {
        LarkInt::Small(v)
    }
}

impl From<i32> for LarkInt {
    fn from(v: i32) -> LarkInt {
        LarkInt::Small(v as i64)
    }
}

impl From<usize> for LarkInt {
    fn from(v: usize) -> LarkInt {
        match i64::try_from(v) {
            Ok(small) => LarkInt::Small(small),
            Err(_) => LarkInt::from_big(BigInt::from(v)),
        }
    }
}

impl LarkInt {
    /// Wraps a `BigInt`, demoting to the small representation when it
    /// fits. This is the only constructor for the big path, so the
    /// demotion invariant holds everywhere.
    pub fn from_big(big: BigInt) -> LarkInt {
        match big.to_i64() {
            Some(small) => LarkInt::Small(small),
            None => LarkInt::Big(Rc::new(big)),
        }
    }

    pub fn zero() -> LarkInt {
        LarkInt::Small(0)
    }

    pub fn to_i64(&self) -> Option<i64> {
        match self {
            LarkInt::Small(v) => Some(*v),
            // By the demotion invariant a Big never fits.
            LarkInt::Big(_) => None,
        }
    }

    pub fn to_big(&self) -> BigInt {
        match self {
            LarkInt::Small(v) => BigInt::from(*v),
            LarkInt::Big(b) => (**b).clone(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            LarkInt::Small(v) => *v == 0,
            LarkInt::Big(b) => b.is_zero(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            LarkInt::Small(v) => *v < 0,
            LarkInt::Big(b) => b.is_negative(),
        }
    }

    /// Magnitude bit width. Zero has width zero.
    pub fn bits(&self) -> u64 {
        match self {
            LarkInt::Small(v) => 64 - v.unsigned_abs().leading_zeros() as u64,
            LarkInt::Big(b) => b.bits(),
        }
    }

    /// 64-bit machine words needed to store the magnitude; the unit
    /// of the arithmetic cost model.
    pub fn words(&self) -> u64 {
        self.bits() / 64 + 1
    }

    /// Low 64 bits of the two's-complement value. Small and big ints
    /// of equal value agree; big ints that differ only above bit 63
    /// collide deliberately.
    pub fn hash_low64(&self) -> u64 {
        match self {
            LarkInt::Small(v) => *v as u64,
            LarkInt::Big(b) => {
                let low = b.iter_u64_digits().next().unwrap_or(0);
                if b.is_negative() {
                    low.wrapping_neg()
                } else {
                    low
                }
            }
        }
    }

    pub fn add(&self, other: &LarkInt) -> LarkInt {
        if let (LarkInt::Small(a), LarkInt::Small(b)) = (self, other) {
            if let Some(v) = a.checked_add(*b) {
                return LarkInt::Small(v);
            }
        }
        LarkInt::from_big(self.to_big() + other.to_big())
    }

    pub fn sub(&self, other: &LarkInt) -> LarkInt {
        if let (LarkInt::Small(a), LarkInt::Small(b)) = (self, other) {
            if let Some(v) = a.checked_sub(*b) {
                return LarkInt::Small(v);
            }
        }
        LarkInt::from_big(self.to_big() - other.to_big())
    }

    pub fn mul(&self, other: &LarkInt) -> LarkInt {
        if let (LarkInt::Small(a), LarkInt::Small(b)) = (self, other) {
            if let Some(v) = a.checked_mul(*b) {
                return LarkInt::Small(v);
            }
        }
        LarkInt::from_big(self.to_big() * other.to_big())
    }

    pub fn neg(&self) -> LarkInt {
        match self {
            LarkInt::Small(v) => match v.checked_neg() {
                Some(n) => LarkInt::Small(n),
                None => LarkInt::from_big(-BigInt::from(*v)),
            },
            LarkInt::Big(b) => LarkInt::from_big(-(**b).clone()),
        }
    }

    pub fn abs(&self) -> LarkInt {
        if self.is_negative() {
            self.neg()
        } else {
            self.clone()
        }
    }

    /// Floor division: the quotient rounds toward negative infinity,
    /// so `-7 // 2 == -4`.
    pub fn floor_div(&self, other: &LarkInt) -> Result<LarkInt> {
        if other.is_zero() {
            return Err(EvalError::value_out_of_range("integer division by zero"));
        }
        if let (LarkInt::Small(a), LarkInt::Small(b)) = (self, other) {
            if let Some(q) = a.checked_div_euclid(*b) {
                // div_euclid rounds toward -inf only for positive
                // divisors; adjust for negative ones.
                let r = a - q * b;
                let (mut q, r) = (q, r);
                if r != 0 && (r < 0) != (*b < 0) {
                    q -= 1;
                }
                return Ok(LarkInt::Small(q));
            }
        }
        let (a, b) = (self.to_big(), other.to_big());
        let mut q = &a / &b;
        let r = &a - &q * &b;
        if !r.is_zero() && (r.is_negative() != b.is_negative()) {
            q -= 1;
        }
        Ok(LarkInt::from_big(q))
    }

    /// Floor modulo: the result takes the divisor's sign, matching
    /// `floor_div` so that `a == b * (a // b) + (a % b)`.
    pub fn floor_mod(&self, other: &LarkInt) -> Result<LarkInt> {
        if other.is_zero() {
            return Err(EvalError::value_out_of_range("integer modulo by zero"));
        }
        if let (LarkInt::Small(a), LarkInt::Small(b)) = (self, other) {
            if let Some(mut r) = a.checked_rem(*b) {
                if r != 0 && (r < 0) != (*b < 0) {
                    r += b;
                }
                return Ok(LarkInt::Small(r));
            }
        }
        let (a, b) = (self.to_big(), other.to_big());
        let mut r = &a % &b;
        if !r.is_zero() && (r.is_negative() != b.is_negative()) {
            r += &b;
        }
        Ok(LarkInt::from_big(r))
    }

    pub fn bitand(&self, other: &LarkInt) -> LarkInt {
        if let (LarkInt::Small(a), LarkInt::Small(b)) = (self, other) {
            return LarkInt::Small(a & b);
        }
        LarkInt::from_big(self.to_big() & other.to_big())
    }

    pub fn bitor(&self, other: &LarkInt) -> LarkInt {
        if let (LarkInt::Small(a), LarkInt::Small(b)) = (self, other) {
            return LarkInt::Small(a | b);
        }
        LarkInt::from_big(self.to_big() | other.to_big())
    }

    pub fn bitxor(&self, other: &LarkInt) -> LarkInt {
        if let (LarkInt::Small(a), LarkInt::Small(b)) = (self, other) {
            return LarkInt::Small(a ^ b);
        }
        LarkInt::from_big(self.to_big() ^ other.to_big())
    }

    /// Bitwise complement `~x == -x - 1`.
    pub fn bitnot(&self) -> LarkInt {
        self.neg().sub(&LarkInt::Small(1))
    }

    pub fn shl(&self, count: &LarkInt) -> Result<LarkInt> {
        let n = Self::shift_count(count)?;
        match self {
            LarkInt::Small(v) => {
                if let Some(shifted) = v.checked_shl(n).filter(|s| s >> n == *v) {
                    return Ok(LarkInt::Small(shifted));
                }
                Ok(LarkInt::from_big(BigInt::from(*v) << n as usize))
            }
            LarkInt::Big(b) => Ok(LarkInt::from_big((**b).clone() << n as usize)),
        }
    }

    /// Arithmetic right shift (sign-propagating).
    pub fn shr(&self, count: &LarkInt) -> Result<LarkInt> {
        let n = Self::shift_count(count)?;
        match self {
            LarkInt::Small(v) => Ok(LarkInt::Small(if n >= 64 {
                if *v < 0 {
                    -1
                } else {
                    0
                }
            } else {
                v >> n
            })),
            LarkInt::Big(b) => Ok(LarkInt::from_big((**b).clone() >> n as usize)),
        }
    }

    fn shift_count(count: &LarkInt) -> Result<u32> {
        match count.to_i64() {
            Some(n) if n < 0 => Err(EvalError::value_out_of_range("negative shift count")),
            Some(n) if n <= MAX_SHIFT as i64 => Ok(n as u32),
            _ => Err(EvalError::value_out_of_range(format!(
                "shift count exceeds {}",
                MAX_SHIFT
            ))),
        }
    }

    pub fn cmp_int(&self, other: &LarkInt) -> Ordering {
        match (self, other) {
            (LarkInt::Small(a), LarkInt::Small(b)) => a.cmp(b),
            // By the demotion invariant, a Big is always outside the
            // small range, so sign alone decides the mixed cases.
            (LarkInt::Small(_), LarkInt::Big(b)) => {
                if b.is_negative() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (LarkInt::Big(a), LarkInt::Small(_)) => {
                if a.is_negative() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (LarkInt::Big(a), LarkInt::Big(b)) => a.as_ref().cmp(b.as_ref()),
        }
    }

    /// Parses an integer literal in the given base.
    ///
    /// Base 0 auto-detects from a `0x`/`0o`/`0b` prefix and otherwise
    /// reads decimal; a leading zero followed by digits is rejected
    /// as ambiguous. Explicit bases 2, 8, and 16 accept their
    /// matching prefix.
    pub fn parse(text: &str, base: u32) -> Result<LarkInt> {
        if !(base == 0 || (2..=36).contains(&base)) {
            return Err(EvalError::value_out_of_range(format!(
                "int() base must be 0 or 2..36, got {}",
                base
            )));
        }
        let bad = || EvalError::parse(format!("invalid int literal {:?}", text));

        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (digits, radix) = Self::split_prefix(rest, base).ok_or_else(bad)?;
        if digits.is_empty() || digits.starts_with('+') || digits.starts_with('-') {
            return Err(bad());
        }

        let magnitude = match i64::from_str_radix(digits, radix) {
            Ok(v) => LarkInt::Small(v),
            Err(_) => {
                // Overflow or stray character; let BigInt decide which.
                let big = BigInt::parse_bytes(digits.as_bytes(), radix).ok_or_else(bad)?;
                LarkInt::from_big(big)
            }
        };
        Ok(if negative { magnitude.neg() } else { magnitude })
    }

    fn split_prefix(text: &str, base: u32) -> Option<(&str, u32)> {
        let lower2 = text.get(..2).map(str::to_ascii_lowercase);
        let prefix_radix = match lower2.as_deref() {
            Some("0x") => Some(16),
            Some("0o") => Some(8),
            Some("0b") => Some(2),
            _ => None,
        };
        match (base, prefix_radix) {
            (0, Some(r)) => Some((&text[2..], r)),
            (0, None) => {
                // Plain zero is fine; 0123-style octal is ambiguous.
                if text.len() > 1 && text.starts_with('0') {
                    None
                } else {
                    Some((text, 10))
                }
            }
            (b, Some(r)) if b == r => Some((&text[2..], r)),
            (b, Some(_)) => {
                // A prefix that contradicts the explicit base: the
                // characters may still be digits (e.g. "0b1" in base
                // 16), so let digit parsing decide.
                Some((text, b))
            }
            (b, None) => Some((text, b)),
        }
    }

    /// Truncates a finite float toward zero.
    pub fn from_finite_float(f: f64) -> Result<LarkInt> {
        if !f.is_finite() {
            return Err(EvalError::value_out_of_range(
                "cannot convert non-finite float to int",
            ));
        }
        let t = f.trunc();
        let big = BigInt::from_f64(t)
            .ok_or_else(|| EvalError::value_out_of_range("cannot convert float to int"))?;
        Ok(LarkInt::from_big(big))
    }

    /// Converts to `f64` only when the value is exactly representable.
    pub fn to_finite_float(&self) -> Result<f64> {
        let fail = || {
            EvalError::value_out_of_range("int has no exact float representation")
        };
        match self {
            LarkInt::Small(v) => {
                let f = *v as f64;
                if f as i128 == *v as i128 {
                    Ok(f)
                } else {
                    Err(fail())
                }
            }
            LarkInt::Big(b) => {
                let f = b.to_f64().ok_or_else(fail)?;
                if !f.is_finite() {
                    return Err(fail());
                }
                match BigInt::from_f64(f) {
                    Some(back) if back == **b => Ok(f),
                    _ => Err(fail()),
                }
            }
        }
    }

    /// Renders in the given radix (for `%o`/`%x`/`%X` conversions),
    /// sign-magnitude like the decimal form.
    pub fn to_str_radix(&self, radix: u32, upper: bool) -> String {
        let s = self.to_big().to_str_radix(radix);
        if upper {
            s.to_uppercase()
        } else {
            s
        }
    }
}

impl PartialEq for LarkInt {
    fn eq(&self, other: &LarkInt) -> bool {
        self.cmp_int(other) == Ordering::Equal
    }
}

impl Eq for LarkInt {}

impl fmt::Display for LarkInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LarkInt::Small(v) => write!(f, "{}", v),
            LarkInt::Big(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lark_util::ErrorKind;

    fn big(text: &str) -> LarkInt {
        LarkInt::parse(text, 10).unwrap()
    }

    #[test]
    fn test_promotion_and_demotion() {
        let max = LarkInt::from(i64::MAX);
        let up = max.add(&LarkInt::from(1));
        assert!(matches!(up, LarkInt::Big(_)));
        let down = up.sub(&LarkInt::from(1));
        assert!(matches!(down, LarkInt::Small(_)));
        assert_eq!(down.to_i64(), Some(i64::MAX));
    }

    #[test]
    fn test_mul_promotes() {
        let v = LarkInt::from(1_i64 << 40).mul(&LarkInt::from(1_i64 << 40));
        assert!(matches!(v, LarkInt::Big(_)));
        assert_eq!(v, big("1208925819614629174706176"));
    }

    #[test]
    fn test_floor_division_rounds_down() {
        let cases: &[(i64, i64, i64)] = &[(7, 2, 3), (-7, 2, -4), (7, -2, -4), (-7, -2, 3)];
        for &(a, b, want) in cases {
            let got = LarkInt::from(a).floor_div(&LarkInt::from(b)).unwrap();
            assert_eq!(got.to_i64(), Some(want), "{} // {}", a, b);
        }
    }

    #[test]
    fn test_floor_mod_takes_divisor_sign() {
        let cases: &[(i64, i64, i64)] = &[(7, 2, 1), (-7, 2, 1), (7, -2, -1), (-7, -2, -1)];
        for &(a, b, want) in cases {
            let got = LarkInt::from(a).floor_mod(&LarkInt::from(b)).unwrap();
            assert_eq!(got.to_i64(), Some(want), "{} % {}", a, b);
        }
    }

    #[test]
    fn test_division_by_zero() {
        let err = LarkInt::from(1).floor_div(&LarkInt::zero()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueOutOfRange);
    }

    #[test]
    fn test_floor_identity_holds_for_big() {
        let a = big("123456789012345678901234567890");
        let b = big("-97");
        let q = a.floor_div(&b).unwrap();
        let r = a.floor_mod(&b).unwrap();
        assert_eq!(b.mul(&q).add(&r), a);
        assert!(r.is_negative() || r.is_zero());
    }

    #[test]
    fn test_hash_low64_small_big_collide() {
        // 2^64 + 5 and 5 share their low 64 bits.
        let small = LarkInt::from(5);
        let collided = big("18446744073709551621");
        assert!(matches!(collided, LarkInt::Big(_)));
        assert_eq!(small.hash_low64(), collided.hash_low64());
    }

    #[test]
    fn test_hash_low64_negative_matches_twos_complement() {
        assert_eq!(LarkInt::from(-1).hash_low64(), u64::MAX);
        let neg_big = big("-18446744073709551617"); // -(2^64 + 1)
        assert_eq!(neg_big.hash_low64(), LarkInt::from(-1).hash_low64());
    }

    #[test]
    fn test_shift_left_promotes() {
        let v = LarkInt::from(1).shl(&LarkInt::from(100)).unwrap();
        assert_eq!(v, big("1267650600228229401496703205376"));
    }

    #[test]
    fn test_shift_right_sign_propagates() {
        let v = LarkInt::from(-16).shr(&LarkInt::from(2)).unwrap();
        assert_eq!(v.to_i64(), Some(-4));
        let far = LarkInt::from(-16).shr(&LarkInt::from(100)).unwrap();
        assert_eq!(far.to_i64(), Some(-1));
    }

    #[test]
    fn test_shift_count_limits() {
        assert_eq!(
            LarkInt::from(1)
                .shl(&LarkInt::from(-1))
                .unwrap_err()
                .kind(),
            ErrorKind::ValueOutOfRange
        );
        assert_eq!(
            LarkInt::from(1)
                .shl(&LarkInt::from(100_000))
                .unwrap_err()
                .kind(),
            ErrorKind::ValueOutOfRange
        );
    }

    #[test]
    fn test_bitnot() {
        assert_eq!(LarkInt::from(0).bitnot().to_i64(), Some(-1));
        assert_eq!(LarkInt::from(5).bitnot().to_i64(), Some(-6));
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(LarkInt::parse("42", 10).unwrap().to_i64(), Some(42));
        assert_eq!(LarkInt::parse("-42", 0).unwrap().to_i64(), Some(-42));
        assert_eq!(LarkInt::parse("+7", 0).unwrap().to_i64(), Some(7));
        assert_eq!(LarkInt::parse("0", 0).unwrap().to_i64(), Some(0));
    }

    #[test]
    fn test_parse_base_zero_prefixes() {
        assert_eq!(LarkInt::parse("0xFF", 0).unwrap().to_i64(), Some(255));
        assert_eq!(LarkInt::parse("0o17", 0).unwrap().to_i64(), Some(15));
        assert_eq!(LarkInt::parse("0b1010", 0).unwrap().to_i64(), Some(10));
    }

    #[test]
    fn test_parse_ambiguous_octal_rejected() {
        assert_eq!(
            LarkInt::parse("0123", 0).unwrap_err().kind(),
            ErrorKind::Parse
        );
    }

    #[test]
    fn test_parse_explicit_base_with_prefix() {
        assert_eq!(LarkInt::parse("0x10", 16).unwrap().to_i64(), Some(16));
        assert_eq!(LarkInt::parse("10", 16).unwrap().to_i64(), Some(16));
        assert_eq!(LarkInt::parse("z", 36).unwrap().to_i64(), Some(35));
    }

    #[test]
    fn test_parse_garbage_rejected() {
        for text in ["", "-", "0x", "12ab", "1_000", " 1"] {
            assert_eq!(
                LarkInt::parse(text, 0).unwrap_err().kind(),
                ErrorKind::Parse,
                "{:?} should not parse",
                text
            );
        }
    }

    #[test]
    fn test_parse_huge_roundtrips_via_display() {
        let text = "123456789012345678901234567890";
        let v = LarkInt::parse(text, 10).unwrap();
        assert_eq!(v.to_string(), text);
    }

    #[test]
    fn test_float_conversion_exact_only() {
        assert_eq!(LarkInt::from(3).to_finite_float().unwrap(), 3.0);
        let exact = LarkInt::from(1_i64 << 60);
        assert_eq!(exact.to_finite_float().unwrap(), (1_i64 << 60) as f64);
        let inexact = LarkInt::from((1_i64 << 60) + 1);
        assert_eq!(
            inexact.to_finite_float().unwrap_err().kind(),
            ErrorKind::ValueOutOfRange
        );
    }

    #[test]
    fn test_from_finite_float_truncates() {
        assert_eq!(LarkInt::from_finite_float(3.9).unwrap().to_i64(), Some(3));
        assert_eq!(LarkInt::from_finite_float(-3.9).unwrap().to_i64(), Some(-3));
        assert_eq!(
            LarkInt::from_finite_float(f64::NAN).unwrap_err().kind(),
            ErrorKind::ValueOutOfRange
        );
        assert_eq!(
            LarkInt::from_finite_float(f64::INFINITY).unwrap_err().kind(),
            ErrorKind::ValueOutOfRange
        );
    }

    #[test]
    fn test_radix_rendering() {
        assert_eq!(LarkInt::from(255).to_str_radix(16, false), "ff");
        assert_eq!(LarkInt::from(255).to_str_radix(16, true), "FF");
        assert_eq!(LarkInt::from(-8).to_str_radix(8, false), "-10");
    }

    #[test]
    fn test_cmp_across_representations() {
        let small = LarkInt::from(10);
        let pos_big = big("99999999999999999999");
        let neg_big = big("-99999999999999999999");
        assert_eq!(small.cmp_int(&pos_big), Ordering::Less);
        assert_eq!(small.cmp_int(&neg_big), Ordering::Greater);
        assert_eq!(pos_big.cmp_int(&pos_big), Ordering::Equal);
    }
}
