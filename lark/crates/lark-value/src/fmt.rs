//! Value stringification and formatting.
//!
//! One recursive writer serves `str`, `repr`, `print`, `fail`, and
//! both formatting operators. It carries the thread (all output goes
//! through a [`SafeStringBuilder`], and every built-in byte written
//! charges one step) and a set of the containers currently being
//! printed: re-encountering one emits an ellipsis token instead of
//! recursing, so cyclic values print in finite space.
//!
//! `%` formatting charges `len(format) + written` steps; `{}`
//! formatting charges only emitted bytes, so a field that expands to
//! nothing costs nothing beyond what its value's writer charges.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use lark_safety::{SafeStringBuilder, Thread};
use lark_util::{EvalError, Result};

use crate::float::format_float;
use crate::int::LarkInt;
use crate::value::Value;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Quoted strings, escaped bytes.
    Repr,
    /// Raw strings, lossily decoded bytes.
    Str,
}

/// Writes `text` as produced output: one step per byte, then the
/// builder's own memory charge.
fn emit(thread: &Thread, out: &mut SafeStringBuilder<'_>, text: &str) -> Result<()> {
    thread.add_steps(text.len() as u64)?;
    out.write_str(text)
}

/// `repr(value)` as a fresh string.
pub fn safe_repr(thread: &Thread, value: &Value) -> Result<String> {
    let mut out = SafeStringBuilder::new(thread);
    let mut printing = FxHashSet::default();
    write_value(thread, &mut out, value, Mode::Repr, &mut printing)?;
    Ok(out.finish())
}

/// `str(value)` as a fresh string.
pub fn safe_str(thread: &Thread, value: &Value) -> Result<String> {
    let mut out = SafeStringBuilder::new(thread);
    let mut printing = FxHashSet::default();
    write_value(thread, &mut out, value, Mode::Str, &mut printing)?;
    Ok(out.finish())
}

/// Appends `value`'s repr to an existing builder.
pub fn write_repr_into(
    thread: &Thread,
    out: &mut SafeStringBuilder<'_>,
    value: &Value,
) -> Result<()> {
    let mut printing = FxHashSet::default();
    write_value(thread, out, value, Mode::Repr, &mut printing)
}

/// Appends `value`'s str form to an existing builder.
pub fn write_str_into(
    thread: &Thread,
    out: &mut SafeStringBuilder<'_>,
    value: &Value,
) -> Result<()> {
    let mut printing = FxHashSet::default();
    write_value(thread, out, value, Mode::Str, &mut printing)
}

fn write_value(
    thread: &Thread,
    out: &mut SafeStringBuilder<'_>,
    value: &Value,
    mode: Mode,
    printing: &mut FxHashSet<usize>,
) -> Result<()> {
    match value {
        Value::None => emit(thread, out, "None"),
        Value::Bool(true) => emit(thread, out, "True"),
        Value::Bool(false) => emit(thread, out, "False"),
        Value::Int(i) => emit(thread, out, &i.to_string()),
        Value::Float(f) => emit(thread, out, &format_float(*f)),
        Value::Str(s) => match mode {
            Mode::Str => emit(thread, out, s),
            Mode::Repr => write_quoted_str(thread, out, s),
        },
        Value::Bytes(b) => match mode {
            Mode::Str => write_decoded_bytes(thread, out, b),
            Mode::Repr => write_quoted_bytes(thread, out, b),
        },
        Value::List(list) => {
            let ptr = Rc::as_ptr(list) as usize;
            if !printing.insert(ptr) {
                return emit(thread, out, "[...]");
            }
            let items = list.to_vec();
            emit(thread, out, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    emit(thread, out, ", ")?;
                }
                write_value(thread, out, item, Mode::Repr, printing)?;
            }
            let result = emit(thread, out, "]");
            printing.remove(&ptr);
            result
        }
        Value::Tuple(t) => {
            let ptr = t.as_ptr() as usize;
            if !printing.insert(ptr) {
                return emit(thread, out, "(...)");
            }
            emit(thread, out, "(")?;
            for (i, item) in t.iter().enumerate() {
                if i > 0 {
                    emit(thread, out, ", ")?;
                }
                write_value(thread, out, item, Mode::Repr, printing)?;
            }
            if t.len() == 1 {
                emit(thread, out, ",")?;
            }
            let result = emit(thread, out, ")");
            printing.remove(&ptr);
            result
        }
        Value::Dict(dict) => {
            let ptr = Rc::as_ptr(dict) as usize;
            if !printing.insert(ptr) {
                return emit(thread, out, "{...}");
            }
            emit(thread, out, "{")?;
            for (i, (key, val)) in dict.items_vec().iter().enumerate() {
                if i > 0 {
                    emit(thread, out, ", ")?;
                }
                write_value(thread, out, key, Mode::Repr, printing)?;
                emit(thread, out, ": ")?;
                write_value(thread, out, val, Mode::Repr, printing)?;
            }
            let result = emit(thread, out, "}");
            printing.remove(&ptr);
            result
        }
        Value::Set(set) => {
            let ptr = Rc::as_ptr(set) as usize;
            if !printing.insert(ptr) {
                return emit(thread, out, "set(...)");
            }
            emit(thread, out, "set([")?;
            for (i, member) in set.members_vec().iter().enumerate() {
                if i > 0 {
                    emit(thread, out, ", ")?;
                }
                write_value(thread, out, member, Mode::Repr, printing)?;
            }
            let result = emit(thread, out, "])");
            printing.remove(&ptr);
            result
        }
        Value::Range(r) => {
            let text = if r.step() == 1 {
                format!("range({}, {})", r.start(), r.stop())
            } else {
                format!("range({}, {}, {})", r.start(), r.stop(), r.step())
            };
            emit(thread, out, &text)
        }
        Value::View(v) => emit(thread, out, &format!("<{}>", v.type_name())),
        Value::Builtin(b) => emit(
            thread,
            out,
            &format!("<built-in function {}>", b.name()),
        ),
        Value::Foreign(f) => f.safe_string(thread, out),
    }
}

fn write_quoted_str(thread: &Thread, out: &mut SafeStringBuilder<'_>, s: &str) -> Result<()> {
    emit(thread, out, "\"")?;
    for c in s.chars() {
        match c {
            '"' => emit(thread, out, "\\\"")?,
            '\\' => emit(thread, out, "\\\\")?,
            '\n' => emit(thread, out, "\\n")?,
            '\r' => emit(thread, out, "\\r")?,
            '\t' => emit(thread, out, "\\t")?,
            _ => {
                thread.add_steps(c.len_utf8() as u64)?;
                out.write_char(c)?;
            }
        }
    }
    emit(thread, out, "\"")
}

fn write_quoted_bytes(thread: &Thread, out: &mut SafeStringBuilder<'_>, b: &[u8]) -> Result<()> {
    emit(thread, out, "b\"")?;
    for &byte in b {
        match byte {
            b'"' => emit(thread, out, "\\\"")?,
            b'\\' => emit(thread, out, "\\\\")?,
            b'\n' => emit(thread, out, "\\n")?,
            b'\r' => emit(thread, out, "\\r")?,
            b'\t' => emit(thread, out, "\\t")?,
            0x20..=0x7e => {
                thread.add_steps(1)?;
                out.write_byte(byte)?;
            }
            _ => emit(thread, out, &format!("\\x{:02x}", byte))?,
        }
    }
    emit(thread, out, "\"")
}

/// `str(bytes)`: UTF-8 decode, substituting U+FFFD for invalid
/// sequences. Each substitution is three output bytes, charged like
/// any other output.
fn write_decoded_bytes(thread: &Thread, out: &mut SafeStringBuilder<'_>, b: &[u8]) -> Result<()> {
    let mut rest = b;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => return emit(thread, out, valid),
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                emit(thread, out, std::str::from_utf8(valid).expect("validated"))?;
                emit(thread, out, "\u{FFFD}")?;
                let skip = err.error_len().unwrap_or(after.len()).max(1);
                rest = &after[skip.min(after.len())..];
                if rest.is_empty() {
                    return Ok(());
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// % formatting
// ---------------------------------------------------------------------------

/// `format % args`. Charges `len(format)` steps up front plus one
/// step per substituted output byte.
pub fn percent_format(thread: &Thread, fmt: &str, args: &Value) -> Result<String> {
    thread.add_steps(fmt.len() as u64)?;
    let single;
    let args: &[Value] = match args {
        Value::Tuple(t) => &t[..],
        other => {
            single = [other.clone()];
            &single
        }
    };

    fn take<'a>(args: &'a [Value], next: &mut usize) -> Result<&'a Value> {
        let v = args
            .get(*next)
            .ok_or_else(|| EvalError::arity("not enough arguments for format string"))?;
        *next += 1;
        Ok(v)
    }

    let mut out = SafeStringBuilder::new(thread);
    let mut printing = FxHashSet::default();
    let mut next_arg = 0;

    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.write_char(c)?;
            continue;
        }
        let conv = chars.next().ok_or_else(|| {
            EvalError::value_out_of_range("incomplete format specifier at end of string")
        })?;
        match conv {
            '%' => out.write_char('%')?,
            's' => {
                let v = take(args, &mut next_arg)?;
                write_value(thread, &mut out, v, Mode::Str, &mut printing)?;
            }
            'r' => {
                let v = take(args, &mut next_arg)?;
                write_value(thread, &mut out, v, Mode::Repr, &mut printing)?;
            }
            'd' | 'i' => {
                let v = take(args, &mut next_arg)?;
                let i = want_int(v, conv)?;
                emit(thread, &mut out, &i.to_string())?;
            }
            'o' => {
                let i = want_int(take(args, &mut next_arg)?, conv)?;
                emit(thread, &mut out, &i.to_str_radix(8, false))?;
            }
            'x' => {
                let i = want_int(take(args, &mut next_arg)?, conv)?;
                emit(thread, &mut out, &i.to_str_radix(16, false))?;
            }
            'X' => {
                let i = want_int(take(args, &mut next_arg)?, conv)?;
                emit(thread, &mut out, &i.to_str_radix(16, true))?;
            }
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' => {
                let f = want_float(take(args, &mut next_arg)?, conv)?;
                emit(thread, &mut out, &float_conversion(f, conv))?;
            }
            'c' => {
                let v = take(args, &mut next_arg)?;
                let c = want_codepoint(v)?;
                thread.add_steps(c.len_utf8() as u64)?;
                out.write_char(c)?;
            }
            other => {
                return Err(EvalError::value_out_of_range(format!(
                    "unknown conversion %{} in format string",
                    other
                )))
            }
        }
    }
    if next_arg < args.len() {
        return Err(EvalError::arity(format!(
            "too many arguments for format string: {} unused",
            args.len() - next_arg
        )));
    }
    Ok(out.finish())
}

fn want_int(v: &Value, conv: char) -> Result<LarkInt> {
    match v {
        Value::Int(i) => Ok(i.clone()),
        _ => Err(EvalError::type_mismatch(format!(
            "%{} format requires int, not {}",
            conv,
            v.type_name()
        ))),
    }
}

fn want_float(v: &Value, conv: char) -> Result<f64> {
    match v {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(match i {
            LarkInt::Small(v) => *v as f64,
            LarkInt::Big(_) => i.to_finite_float().unwrap_or(f64::INFINITY),
        }),
        _ => Err(EvalError::type_mismatch(format!(
            "%{} format requires float or int, not {}",
            conv,
            v.type_name()
        ))),
    }
}

fn want_codepoint(v: &Value) -> Result<char> {
    match v {
        Value::Int(i) => i
            .to_i64()
            .and_then(|v| u32::try_from(v).ok())
            .and_then(char::from_u32)
            .ok_or_else(|| EvalError::value_out_of_range("%c: not a valid code point")),
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(EvalError::value_out_of_range(
                    "%c requires a single-character string",
                )),
            }
        }
        _ => Err(EvalError::type_mismatch(format!(
            "%c format requires int or string, not {}",
            v.type_name()
        ))),
    }
}

/// Python-flavoured float conversions with the default precision of 6.
fn float_conversion(f: f64, conv: char) -> String {
    let upper = conv.is_ascii_uppercase();
    let text = match conv.to_ascii_lowercase() {
        'f' => {
            if f.is_finite() {
                format!("{:.6}", f)
            } else {
                format_float(f)
            }
        }
        'e' => exponent_form(f, 6),
        'g' => {
            if f.is_finite() {
                let mag = f.abs();
                if mag != 0.0 && !(1e-4..1e6).contains(&mag) {
                    trim_g(&exponent_form(f, 5))
                } else {
                    trim_g(&format!("{:.6}", f))
                }
            } else {
                format_float(f)
            }
        }
        _ => unreachable!(),
    };
    if upper {
        text.to_uppercase()
    } else {
        text
    }
}

/// `1.5` at precision 6 becomes `1.500000e+00`.
fn exponent_form(f: f64, precision: usize) -> String {
    if !f.is_finite() {
        return format_float(f);
    }
    let s = format!("{:.*e}", precision, f);
    // Rust writes `1.500000e0`; normalise the exponent to a signed,
    // at-least-two-digit form.
    match s.find('e') {
        Some(i) => {
            let (mantissa, exp) = s.split_at(i);
            let exp: i32 = exp[1..].parse().unwrap_or(0);
            format!("{}e{}{:02}", mantissa, if exp < 0 { '-' } else { '+' }, exp.abs())
        }
        None => s,
    }
}

/// %g drops trailing zeros and a trailing point.
fn trim_g(s: &str) -> String {
    if !s.contains('.') {
        return s.to_owned();
    }
    let (body, exp) = match s.find(['e', 'E']) {
        Some(i) => s.split_at(i),
        None => (s, ""),
    };
    let trimmed = body.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exp)
}

// ---------------------------------------------------------------------------
// {} formatting (string.format)
// ---------------------------------------------------------------------------

/// `format.format(*args, **kwargs)`: `{}`/`{0}`/`{name}` fields with
/// optional `!s`/`!r` conversions, `{{`/`}}` escapes. Charges one
/// step per emitted byte; the field machinery itself is free.
pub fn brace_format(
    thread: &Thread,
    fmt: &str,
    pos: &[Value],
    named: &[(String, Value)],
) -> Result<String> {
    let mut out = SafeStringBuilder::new(thread);
    let mut printing = FxHashSet::default();
    let mut auto_index = 0usize;
    let mut manual_seen = false;
    let mut auto_seen = false;

    let mut chars = fmt.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                emit(thread, &mut out, "{")?;
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                emit(thread, &mut out, "}")?;
            }
            '}' => {
                return Err(EvalError::parse("single '}' in format string"));
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for (_, fc) in chars.by_ref() {
                    if fc == '}' {
                        closed = true;
                        break;
                    }
                    field.push(fc);
                }
                if !closed {
                    return Err(EvalError::parse("unmatched '{' in format string"));
                }
                let (name, conv) = match field.split_once('!') {
                    Some((name, "s")) => (name, Mode::Str),
                    Some((name, "r")) => (name, Mode::Repr),
                    Some((_, other)) => {
                        return Err(EvalError::parse(format!(
                            "unknown conversion {:?} in format field",
                            other
                        )))
                    }
                    None => (field.as_str(), Mode::Str),
                };
                if name.contains(':') {
                    return Err(EvalError::parse("format specs are not supported"));
                }
                let value = if name.is_empty() {
                    auto_seen = true;
                    if manual_seen {
                        return Err(EvalError::arity(
                            "cannot mix automatic and manual field numbering",
                        ));
                    }
                    let v = pos.get(auto_index).ok_or_else(|| {
                        EvalError::arity("not enough positional arguments for format string")
                    })?;
                    auto_index += 1;
                    v
                } else if let Ok(index) = name.parse::<usize>() {
                    manual_seen = true;
                    if auto_seen {
                        return Err(EvalError::arity(
                            "cannot mix automatic and manual field numbering",
                        ));
                    }
                    pos.get(index).ok_or_else(|| {
                        EvalError::name_lookup(format!("format index {} out of range", index))
                    })?
                } else {
                    named
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, v)| v)
                        .ok_or_else(|| {
                            EvalError::name_lookup(format!(
                                "format field {:?} not found",
                                name
                            ))
                        })?
                };
                write_value(thread, &mut out, value, conv, &mut printing)?;
            }
            _ => emit(thread, &mut out, c.to_string().as_str())?,
        }
    }
    Ok(out.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::Dict;
    use crate::range::RangeValue;

    fn repr(v: &Value) -> String {
        safe_repr(&Thread::new(), v).unwrap()
    }

    fn strv(v: &Value) -> String {
        safe_str(&Thread::new(), v).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(repr(&Value::None), "None");
        assert_eq!(repr(&Value::Bool(true)), "True");
        assert_eq!(repr(&Value::int(-3)), "-3");
        assert_eq!(repr(&Value::Float(1.0)), "1.0");
    }

    #[test]
    fn test_str_of_string_is_identity() {
        for s in ["", "plain", "with \"quotes\"", "héllo\nworld"] {
            assert_eq!(strv(&Value::str(s)), s);
        }
    }

    #[test]
    fn test_repr_quotes_and_escapes() {
        assert_eq!(repr(&Value::str("a\"b")), r#""a\"b""#);
        assert_eq!(repr(&Value::str("a\nb")), r#""a\nb""#);
        assert_eq!(repr(&Value::str("héllo")), "\"héllo\"");
    }

    #[test]
    fn test_bytes_repr() {
        assert_eq!(repr(&Value::bytes(b"ab\xff")), "b\"ab\\xff\"");
    }

    #[test]
    fn test_str_of_bytes_replaces_invalid_utf8() {
        assert_eq!(strv(&Value::bytes(b"ok")), "ok");
        assert_eq!(strv(&Value::bytes(b"a\xffb")), "a\u{FFFD}b");
        // Each substitution charges its three output bytes.
        let thread = Thread::new();
        safe_str(&thread, &Value::bytes(b"\xff")).unwrap();
        assert_eq!(thread.accountant().steps(), 3);
    }

    #[test]
    fn test_containers() {
        let thread = Thread::new();
        let list = Value::list(vec![Value::int(1), Value::str("a")]);
        assert_eq!(repr(&list), "[1, \"a\"]");
        let tuple = Value::tuple(vec![Value::int(1)]);
        assert_eq!(repr(&tuple), "(1,)");
        let dict = Dict::new();
        dict.insert(&thread, Value::str("k"), Value::int(2)).unwrap();
        assert_eq!(repr(&Value::Dict(Rc::new(dict))), "{\"k\": 2}");
        let range = Value::Range(Rc::new(RangeValue::new(0, 10, 1).unwrap()));
        assert_eq!(repr(&range), "range(0, 10)");
    }

    #[test]
    fn test_str_of_list_uses_repr_inside() {
        let list = Value::list(vec![Value::str("a")]);
        assert_eq!(strv(&list), "[\"a\"]");
    }

    #[test]
    fn test_cyclic_list_terminates() {
        let list = match Value::list(vec![Value::int(1)]) {
            Value::List(l) => l,
            _ => unreachable!(),
        };
        list.items_mut()
            .unwrap()
            .push(Value::List(Rc::clone(&list)));
        assert_eq!(repr(&Value::List(list)), "[1, [...]]");
    }

    #[test]
    fn test_shared_but_acyclic_prints_fully() {
        let inner = Value::list(vec![Value::int(1)]);
        let outer = Value::list(vec![inner.clone(), inner]);
        assert_eq!(repr(&outer), "[[1], [1]]");
    }

    #[test]
    fn test_percent_basics() {
        let t = Thread::new();
        let out = percent_format(&t, "x=%d y=%s", &Value::tuple(vec![
            Value::int(3),
            Value::str("ok"),
        ]))
        .unwrap();
        assert_eq!(out, "x=3 y=ok");
    }

    #[test]
    fn test_percent_single_arg() {
        let t = Thread::new();
        assert_eq!(
            percent_format(&t, "%r", &Value::str("q")).unwrap(),
            "\"q\""
        );
        assert_eq!(percent_format(&t, "100%%", &Value::tuple(vec![])).unwrap(), "100%");
    }

    #[test]
    fn test_percent_radix_and_float() {
        let t = Thread::new();
        let args = Value::tuple(vec![Value::int(255)]);
        assert_eq!(percent_format(&t, "%x", &args).unwrap(), "ff");
        assert_eq!(percent_format(&t, "%X", &args).unwrap(), "FF");
        assert_eq!(percent_format(&t, "%o", &args).unwrap(), "377");
        assert_eq!(
            percent_format(&t, "%f", &Value::Float(1.5)).unwrap(),
            "1.500000"
        );
        assert_eq!(
            percent_format(&t, "%e", &Value::Float(1.5)).unwrap(),
            "1.500000e+00"
        );
        assert_eq!(percent_format(&t, "%g", &Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(
            percent_format(&t, "%g", &Value::Float(1e300)).unwrap(),
            "1e+300"
        );
    }

    #[test]
    fn test_percent_c() {
        let t = Thread::new();
        assert_eq!(
            percent_format(&t, "%c", &Value::int(0x61)).unwrap(),
            "a"
        );
        assert_eq!(
            percent_format(&t, "%c", &Value::str("é")).unwrap(),
            "é"
        );
        assert!(percent_format(&t, "%c", &Value::str("ab")).is_err());
    }

    #[test]
    fn test_percent_argument_mismatches() {
        use lark_util::ErrorKind;
        let t = Thread::new();
        assert_eq!(
            percent_format(&t, "%d %d", &Value::int(1)).unwrap_err().kind(),
            ErrorKind::Arity
        );
        assert_eq!(
            percent_format(&t, "%d", &Value::tuple(vec![Value::int(1), Value::int(2)]))
                .unwrap_err()
                .kind(),
            ErrorKind::Arity
        );
        assert_eq!(
            percent_format(&t, "%d", &Value::str("x")).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_percent_charges_fmt_plus_written() {
        let t = Thread::new();
        percent_format(&t, "ab%s", &Value::str("xyz")).unwrap();
        // len("ab%s") = 4 upfront + 3 written by the substitution.
        assert_eq!(t.accountant().steps(), 7);
    }

    #[test]
    fn test_brace_auto_and_manual() {
        let t = Thread::new();
        let pos = [Value::int(1), Value::str("b")];
        assert_eq!(brace_format(&t, "{} {}", &pos, &[]).unwrap(), "1 b");
        assert_eq!(brace_format(&t, "{1} {0}", &pos, &[]).unwrap(), "b 1");
        assert!(brace_format(&t, "{} {0}", &pos, &[]).is_err());
    }

    #[test]
    fn test_brace_named_and_conversions() {
        let t = Thread::new();
        let named = [("who".to_owned(), Value::str("lark"))];
        assert_eq!(
            brace_format(&t, "hi {who}", &[], &named).unwrap(),
            "hi lark"
        );
        assert_eq!(
            brace_format(&t, "hi {who!r}", &[], &named).unwrap(),
            "hi \"lark\""
        );
    }

    #[test]
    fn test_brace_escapes() {
        let t = Thread::new();
        assert_eq!(brace_format(&t, "{{}}", &[], &[]).unwrap(), "{}");
    }

    #[test]
    fn test_brace_unknown_field() {
        use lark_util::ErrorKind;
        let t = Thread::new();
        assert_eq!(
            brace_format(&t, "{nope}", &[], &[]).unwrap_err().kind(),
            ErrorKind::NameLookup
        );
        assert_eq!(
            brace_format(&t, "{9}", &[Value::int(1)], &[]).unwrap_err().kind(),
            ErrorKind::NameLookup
        );
    }

    #[test]
    fn test_brace_charges_only_emitted_bytes() {
        let t = Thread::new();
        brace_format(&t, "[{0!s}]", &[Value::str("")], &[]).unwrap();
        // Two literal bytes emitted; the empty string adds nothing.
        assert_eq!(t.accountant().steps(), 2);
    }
}
