//! Float helpers.
//!
//! Cross-type comparison with int is exact: the float is decomposed
//! into mantissa and exponent and compared with integer arithmetic,
//! never by converting the int through a lossy `as f64`.

use std::cmp::Ordering;

use num_bigint::BigInt;

use lark_util::{EvalError, Result};

use crate::int::LarkInt;

/// Decomposes a finite float into `sign * mantissa * 2^exp` with an
/// integer mantissa. Zero decomposes to `(0, 0, 0)`.
fn decompose(f: f64) -> (i8, u64, i32) {
    debug_assert!(f.is_finite());
    if f == 0.0 {
        return (0, 0, 0);
    }
    let bits = f.to_bits();
    let sign = if bits >> 63 == 1 { -1 } else { 1 };
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & ((1 << 52) - 1);
    let (mantissa, exp) = if biased == 0 {
        // Subnormal: no implicit leading bit.
        (frac, -1074)
    } else {
        (frac | (1 << 52), biased - 1075)
    };
    (sign, mantissa, exp)
}

/// Low 64 bits of the two's-complement integer value of `f`, when `f`
/// is finite and integral. `None` otherwise. Matches
/// [`LarkInt::hash_low64`] for every exactly-representable integer,
/// which is what keeps `hash(n) == hash(float(n))`.
pub fn integral_low64(f: f64) -> Option<u64> {
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    if f.abs() < 9.223372036854776e18 {
        return Some((f as i64) as u64);
    }
    let (sign, m, e) = decompose(f);
    debug_assert!(e > 0);
    let low = if e >= 64 { 0 } else { m.wrapping_shl(e as u32) };
    Some(if sign < 0 { low.wrapping_neg() } else { low })
}

/// Exact comparison of an int against a float. `None` when the float
/// is NaN (unordered).
pub fn cmp_int_float(i: &LarkInt, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f == f64::INFINITY {
        return Some(Ordering::Less);
    }
    if f == f64::NEG_INFINITY {
        return Some(Ordering::Greater);
    }
    if let Some(v) = i.to_i64() {
        if v.unsigned_abs() <= 1 << 53 {
            // v as f64 is exact here, so the IEEE comparison is the
            // mathematical one.
            return (v as f64).partial_cmp(&f);
        }
    }
    let (sign, m, e) = decompose(f);
    let mf = BigInt::from(sign) * BigInt::from(m);
    let iv = i.to_big();
    Some(if e >= 0 {
        iv.cmp(&(mf << e as usize))
    } else {
        (iv << (-e) as usize).cmp(&mf)
    })
}

/// Parses a float literal: optional sign, `nan`, `inf`, `infinity`
/// (case-insensitive), or ordinary decimal/exponent notation.
pub fn parse_float(text: &str) -> Result<f64> {
    if text.is_empty() || text.chars().any(|c| c.is_whitespace()) {
        return Err(EvalError::parse(format!("invalid float literal {:?}", text)));
    }
    // Rust's parser already accepts nan/inf/infinity with optional
    // signs, case-insensitively; it rejects hex and underscores.
    text.parse::<f64>()
        .map_err(|_| EvalError::parse(format!("invalid float literal {:?}", text)))
}

/// Text form shared by `str`, `repr`, and the `%g`-flavoured default:
/// integral values keep a trailing `.0`, very large and very small
/// magnitudes switch to exponent notation.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f == f64::INFINITY {
        return "+inf".to_owned();
    }
    if f == f64::NEG_INFINITY {
        return "-inf".to_owned();
    }
    let mag = f.abs();
    let needs_exponent = mag != 0.0 && !(1e-4..1e17).contains(&mag);
    if needs_exponent {
        with_exponent_sign(format!("{:e}", f))
    } else if f == f.trunc() {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// Rust's `{:e}` writes `1e30`; the engine's text form is `1e+30`.
fn with_exponent_sign(s: String) -> String {
    match s.find('e') {
        Some(i) if !s[i + 1..].starts_with('-') => {
            let mut out = String::with_capacity(s.len() + 1);
            out.push_str(&s[..=i]);
            out.push('+');
            out.push_str(&s[i + 1..]);
            out
        }
        _ => s,
    }
}
