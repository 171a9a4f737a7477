//! String methods.
//!
//! Operations are byte-indexed. The scanners (count, find, index and
//! friends) charge one step per byte examined, the case-mappers one
//! step per output byte, and the splitters one step per piece plus
//! the storage the pieces occupy.

use std::rc::Rc;

use lark_util::{EvalError, Result};
use lark_value::string::{SeqView, ViewMode};
use lark_value::{brace_format, Arguments, SafetyFlags, Thread, Value};

use crate::support::{
    build_list, build_str, build_tuple, clamp_span, collect_iter, promote_built_string, recv_str,
    want_i64, want_str,
};

use super::MethodSpec;

pub static SPECS: &[MethodSpec] = &[
    MethodSpec::new("capitalize", SafetyFlags::SAFE, capitalize),
    MethodSpec::new("codepoint_ords", SafetyFlags::SAFE, codepoint_ords),
    MethodSpec::new("codepoints", SafetyFlags::SAFE, codepoints),
    MethodSpec::new("count", SafetyFlags::SAFE, count),
    MethodSpec::new("elem_ords", SafetyFlags::SAFE, elem_ords),
    MethodSpec::new("elems", SafetyFlags::SAFE, elems),
    MethodSpec::new("endswith", SafetyFlags::SAFE, endswith),
    MethodSpec::new("find", SafetyFlags::SAFE, find),
    MethodSpec::new("format", SafetyFlags::SAFE, format),
    MethodSpec::new("index", SafetyFlags::SAFE, index),
    MethodSpec::new("isalnum", SafetyFlags::SAFE, isalnum),
    MethodSpec::new("isalpha", SafetyFlags::SAFE, isalpha),
    MethodSpec::new("isdigit", SafetyFlags::SAFE, isdigit),
    MethodSpec::new("islower", SafetyFlags::SAFE, islower),
    MethodSpec::new("isspace", SafetyFlags::SAFE, isspace),
    MethodSpec::new("istitle", SafetyFlags::SAFE, istitle),
    MethodSpec::new("isupper", SafetyFlags::SAFE, isupper),
    MethodSpec::new("join", SafetyFlags::SAFE, join),
    MethodSpec::new("lower", SafetyFlags::SAFE, lower),
    MethodSpec::new("lstrip", SafetyFlags::SAFE, lstrip),
    MethodSpec::new("partition", SafetyFlags::SAFE, partition),
    MethodSpec::new("removeprefix", SafetyFlags::SAFE, removeprefix),
    MethodSpec::new("removesuffix", SafetyFlags::SAFE, removesuffix),
    MethodSpec::new("replace", SafetyFlags::SAFE, replace),
    MethodSpec::new("rfind", SafetyFlags::SAFE, rfind),
    MethodSpec::new("rindex", SafetyFlags::SAFE, rindex),
    MethodSpec::new("rpartition", SafetyFlags::SAFE, rpartition),
    MethodSpec::new("rsplit", SafetyFlags::SAFE, rsplit),
    MethodSpec::new("rstrip", SafetyFlags::SAFE, rstrip),
    MethodSpec::new("split", SafetyFlags::SAFE, split),
    MethodSpec::new("splitlines", SafetyFlags::SAFE, splitlines),
    MethodSpec::new("startswith", SafetyFlags::SAFE, startswith),
    MethodSpec::new("strip", SafetyFlags::SAFE, strip),
    MethodSpec::new("title", SafetyFlags::SAFE, title),
    MethodSpec::new("upper", SafetyFlags::SAFE, upper),
];

/// Charged cost of a lazy view handle.
const VIEW_CELL_BYTES: i64 = 64;

fn no_args(fname: &str, args: &Arguments) -> Result<()> {
    args.check_no_named(fname)?;
    args.check_arity(fname, 0, Some(0))
}

fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(haystack.len());
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

fn make_view(thread: &Thread, recv: Option<&Value>, fname: &str, mode: ViewMode) -> Result<Value> {
    let s = recv_str(fname, recv)?;
    thread.add_allocs(VIEW_CELL_BYTES)?;
    Ok(Value::View(Rc::new(SeqView::over_str(Rc::clone(s), mode))))
}

fn elems(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    no_args("elems", args)?;
    make_view(thread, recv, "elems", ViewMode::Elems)
}

fn elem_ords(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    no_args("elem_ords", args)?;
    make_view(thread, recv, "elem_ords", ViewMode::ElemOrds)
}

fn codepoints(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    no_args("codepoints", args)?;
    make_view(thread, recv, "codepoints", ViewMode::Codepoints)
}

fn codepoint_ords(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    no_args("codepoint_ords", args)?;
    make_view(thread, recv, "codepoint_ords", ViewMode::CodepointOrds)
}

// ---------------------------------------------------------------------------
// Case mapping
// ---------------------------------------------------------------------------

fn case_mapped(thread: &Thread, out: String) -> Result<Value> {
    // The exact output length is known before anything is kept.
    thread.add_steps(out.len() as u64)?;
    promote_built_string(thread, out)
}

fn lower(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    no_args("lower", args)?;
    let s = recv_str("lower", recv)?;
    case_mapped(thread, s.to_lowercase())
}

fn upper(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    no_args("upper", args)?;
    let s = recv_str("upper", recv)?;
    case_mapped(thread, s.to_uppercase())
}

fn capitalize(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    no_args("capitalize", args)?;
    let s = recv_str("capitalize", recv)?;
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        for c in chars {
            out.extend(c.to_lowercase());
        }
    }
    case_mapped(thread, out)
}

fn title(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    no_args("title", args)?;
    let s = recv_str("title", recv)?;
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    case_mapped(thread, out)
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn predicate(
    thread: &Thread,
    recv: Option<&Value>,
    fname: &str,
    args: &Arguments,
    check: fn(&str) -> bool,
) -> Result<Value> {
    no_args(fname, args)?;
    let s = recv_str(fname, recv)?;
    thread.add_steps(s.len() as u64 + 1)?;
    Ok(Value::Bool(check(s)))
}

fn isalnum(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    predicate(thread, recv, "isalnum", args, |s| {
        !s.is_empty() && s.chars().all(|c| c.is_alphanumeric())
    })
}

fn isalpha(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    predicate(thread, recv, "isalpha", args, |s| {
        !s.is_empty() && s.chars().all(|c| c.is_alphabetic())
    })
}

fn isdigit(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    predicate(thread, recv, "isdigit", args, |s| {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
    })
}

fn islower(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    predicate(thread, recv, "islower", args, |s| {
        let mut cased = false;
        for c in s.chars() {
            if c.is_uppercase() {
                return false;
            }
            cased |= c.is_lowercase();
        }
        cased
    })
}

fn isupper(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    predicate(thread, recv, "isupper", args, |s| {
        let mut cased = false;
        for c in s.chars() {
            if c.is_lowercase() {
                return false;
            }
            cased |= c.is_uppercase();
        }
        cased
    })
}

fn isspace(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    predicate(thread, recv, "isspace", args, |s| {
        !s.is_empty() && s.chars().all(|c| c.is_whitespace())
    })
}

fn istitle(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    predicate(thread, recv, "istitle", args, |s| {
        let mut cased = false;
        let mut in_word = false;
        for c in s.chars() {
            if c.is_uppercase() {
                if in_word {
                    return false;
                }
                cased = true;
                in_word = true;
            } else if c.is_lowercase() {
                if !in_word {
                    return false;
                }
                cased = true;
            } else {
                in_word = false;
            }
        }
        cased
    })
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

fn scan_args<'a>(
    fname: &str,
    recv: Option<&'a Value>,
    args: &'a Arguments,
) -> Result<(&'a str, &'a str, usize, usize)> {
    args.check_no_named(fname)?;
    args.check_arity(fname, 1, Some(3))?;
    let s: &str = recv_str(fname, recv)?;
    let sub = want_str(fname, "substring", args.arg(0).expect("arity checked"))?;
    let (start, end) = clamp_span(fname, s.len(), args.arg(1), args.arg(2))?;
    Ok((s, sub, start, end))
}

fn count(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let (s, sub, start, end) = scan_args("count", recv, args)?;
    thread.add_steps((end - start) as u64 + 1)?;
    let window = &s.as_bytes()[start..end];
    if sub.is_empty() {
        return Ok(Value::int(window.len() as i64 + 1));
    }
    let mut found = 0_i64;
    let mut offset = 0;
    while let Some(at) = find_sub(&window[offset..], sub.as_bytes()) {
        found += 1;
        offset += at + sub.len();
    }
    Ok(Value::int(found))
}

fn find(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let (s, sub, start, end) = scan_args("find", recv, args)?;
    thread.add_steps((end - start) as u64 + 1)?;
    Ok(Value::int(
        find_sub(&s.as_bytes()[start..end], sub.as_bytes())
            .map_or(-1, |at| (start + at) as i64),
    ))
}

fn rfind(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let (s, sub, start, end) = scan_args("rfind", recv, args)?;
    thread.add_steps((end - start) as u64 + 1)?;
    Ok(Value::int(
        rfind_sub(&s.as_bytes()[start..end], sub.as_bytes())
            .map_or(-1, |at| (start + at) as i64),
    ))
}

fn index(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let (s, sub, start, end) = scan_args("index", recv, args)?;
    thread.add_steps((end - start) as u64 + 1)?;
    match find_sub(&s.as_bytes()[start..end], sub.as_bytes()) {
        Some(at) => Ok(Value::int((start + at) as i64)),
        None => Err(EvalError::value_out_of_range("index: substring not found")),
    }
}

fn rindex(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let (s, sub, start, end) = scan_args("rindex", recv, args)?;
    thread.add_steps((end - start) as u64 + 1)?;
    match rfind_sub(&s.as_bytes()[start..end], sub.as_bytes()) {
        Some(at) => Ok(Value::int((start + at) as i64)),
        None => Err(EvalError::value_out_of_range("rindex: substring not found")),
    }
}

/// Each affix probed is charged for its own length before the
/// comparison runs, so the cost tracks the work actually done however
/// long the tuple is.
fn affix_matches(
    thread: &Thread,
    fname: &str,
    s: &str,
    affix: &Value,
    suffix: bool,
) -> Result<bool> {
    let matches_one = |thread: &Thread, needle: &str| -> Result<bool> {
        thread.add_steps(needle.len() as u64 + 1)?;
        Ok(if suffix {
            s.ends_with(needle)
        } else {
            s.starts_with(needle)
        })
    };
    match affix {
        Value::Str(needle) => matches_one(thread, needle),
        Value::Tuple(options) => {
            for option in options.iter() {
                let needle = want_str(fname, "affix", option)?;
                if matches_one(thread, needle)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(EvalError::type_mismatch(format!(
            "{}: got {}, want string or tuple of strings",
            fname,
            affix.type_name()
        ))),
    }
}

fn startswith(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("startswith")?;
    args.check_arity("startswith", 1, Some(1))?;
    let s = recv_str("startswith", recv)?;
    Ok(Value::Bool(affix_matches(
        thread,
        "startswith",
        s,
        args.arg(0).expect("arity checked"),
        false,
    )?))
}

fn endswith(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("endswith")?;
    args.check_arity("endswith", 1, Some(1))?;
    let s = recv_str("endswith", recv)?;
    Ok(Value::Bool(affix_matches(
        thread,
        "endswith",
        s,
        args.arg(0).expect("arity checked"),
        true,
    )?))
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

fn format(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_duplicates("format")?;
    let s = recv_str("format", recv)?;
    let out = brace_format(thread, s, args.pos(), args.named())?;
    promote_built_string(thread, out)
}

fn join(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("join")?;
    args.check_arity("join", 1, Some(1))?;
    let sep = recv_str("join", recv)?;
    let items = collect_iter(thread, "join", args.arg(0).expect("arity checked"))?;
    let mut total = sep.len() * items.len().saturating_sub(1);
    for item in &items {
        total += want_str("join", "element", item)?.len();
    }
    thread.add_steps(total as u64 + 1)?;
    thread.add_allocs(lark_value::estimate_make_size(
        lark_value::MakeSizeKind::Str,
        total,
    ) as i64)?;
    let mut out = String::with_capacity(total);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(want_str("join", "element", item)?);
    }
    Ok(Value::from_string(out))
}

fn replace(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("replace")?;
    args.check_arity("replace", 2, Some(3))?;
    let s = recv_str("replace", recv)?;
    let old = want_str("replace", "old", args.arg(0).expect("arity checked"))?;
    let new = want_str("replace", "new", args.arg(1).expect("arity checked"))?;
    let max = match args.arg(2) {
        None => i64::MAX,
        Some(v) => {
            let n = want_i64("replace", "count", v)?;
            if n < 0 {
                i64::MAX
            } else {
                n
            }
        }
    };

    // Count occurrences first so the output can be charged before it
    // is built.
    thread.add_steps(s.len() as u64 + 1)?;
    let occurrences = if old.is_empty() {
        (s.chars().count() as i64 + 1).min(max)
    } else {
        let mut n = 0_i64;
        let mut offset = 0;
        while n < max {
            match find_sub(&s.as_bytes()[offset..], old.as_bytes()) {
                Some(at) => {
                    n += 1;
                    offset += at + old.len();
                }
                None => break,
            }
        }
        n
    };
    let out_len = (s.len() as i64 + occurrences * (new.len() as i64 - old.len() as i64)) as usize;
    thread.add_steps(out_len as u64)?;
    thread.add_allocs(
        lark_value::estimate_make_size(lark_value::MakeSizeKind::Str, out_len) as i64,
    )?;

    let out = if old.is_empty() {
        let mut out = String::with_capacity(out_len);
        let mut inserted = 0;
        for c in s.chars() {
            if inserted < occurrences {
                out.push_str(new);
                inserted += 1;
            }
            out.push(c);
        }
        if inserted < occurrences {
            out.push_str(new);
        }
        out
    } else {
        s.replacen(old, new, occurrences as usize)
    };
    Ok(Value::from_string(out))
}

fn removeprefix(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("removeprefix")?;
    args.check_arity("removeprefix", 1, Some(1))?;
    let s = recv_str("removeprefix", recv)?;
    let prefix = want_str("removeprefix", "prefix", args.arg(0).expect("arity checked"))?;
    thread.add_steps(prefix.len() as u64 + 1)?;
    match s.strip_prefix(prefix) {
        Some(rest) => build_str(thread, rest),
        None => Ok(recv.expect("receiver").clone()),
    }
}

fn removesuffix(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("removesuffix")?;
    args.check_arity("removesuffix", 1, Some(1))?;
    let s = recv_str("removesuffix", recv)?;
    let suffix = want_str("removesuffix", "suffix", args.arg(0).expect("arity checked"))?;
    thread.add_steps(suffix.len() as u64 + 1)?;
    match s.strip_suffix(suffix) {
        Some(rest) => build_str(thread, rest),
        None => Ok(recv.expect("receiver").clone()),
    }
}

// ---------------------------------------------------------------------------
// Stripping
// ---------------------------------------------------------------------------

fn strip_impl(
    thread: &Thread,
    recv: Option<&Value>,
    fname: &str,
    args: &Arguments,
    left: bool,
    right: bool,
) -> Result<Value> {
    args.check_no_named(fname)?;
    args.check_arity(fname, 0, Some(1))?;
    let s = recv_str(fname, recv)?;
    let cutset = match args.arg(0) {
        None | Some(Value::None) => None,
        Some(v) => Some(want_str(fname, "cutset", v)?),
    };
    let in_cutset = |c: char| match cutset {
        None => c.is_whitespace(),
        Some(set) => set.contains(c),
    };
    thread.add_steps(s.len() as u64 + 1)?;
    let out = match (left, right) {
        (true, true) => s.trim_matches(in_cutset),
        (true, false) => s.trim_start_matches(in_cutset),
        (false, true) => s.trim_end_matches(in_cutset),
        (false, false) => unreachable!(),
    };
    build_str(thread, out)
}

fn strip(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    strip_impl(thread, recv, "strip", args, true, true)
}

fn lstrip(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    strip_impl(thread, recv, "lstrip", args, true, false)
}

fn rstrip(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    strip_impl(thread, recv, "rstrip", args, false, true)
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

fn partition_impl(
    thread: &Thread,
    recv: Option<&Value>,
    fname: &str,
    args: &Arguments,
    from_right: bool,
) -> Result<Value> {
    args.check_no_named(fname)?;
    args.check_arity(fname, 1, Some(1))?;
    let s = recv_str(fname, recv)?;
    let sep = want_str(fname, "separator", args.arg(0).expect("arity checked"))?;
    if sep.is_empty() {
        return Err(EvalError::value_out_of_range(format!(
            "{}: empty separator",
            fname
        )));
    }
    thread.add_steps(s.len() as u64 + 1)?;
    let found = if from_right {
        rfind_sub(s.as_bytes(), sep.as_bytes())
    } else {
        find_sub(s.as_bytes(), sep.as_bytes())
    };
    let (before, mid, after) = match found {
        Some(at) => (&s[..at], sep, &s[at + sep.len()..]),
        None if from_right => ("", "", &s[..]),
        None => (&s[..], "", ""),
    };
    let parts = vec![
        build_str(thread, before)?,
        build_str(thread, mid)?,
        build_str(thread, after)?,
    ];
    build_tuple(thread, parts)
}

fn partition(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    partition_impl(thread, recv, "partition", args, false)
}

fn rpartition(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    partition_impl(thread, recv, "rpartition", args, true)
}

fn split_impl(
    thread: &Thread,
    recv: Option<&Value>,
    fname: &str,
    args: &Arguments,
    from_right: bool,
) -> Result<Value> {
    args.check_no_named(fname)?;
    args.check_arity(fname, 0, Some(2))?;
    let s = recv_str(fname, recv)?;
    let sep = match args.arg(0) {
        None | Some(Value::None) => None,
        Some(v) => {
            let sep = want_str(fname, "separator", v)?;
            if sep.is_empty() {
                return Err(EvalError::value_out_of_range(format!(
                    "{}: empty separator",
                    fname
                )));
            }
            Some(sep)
        }
    };
    let max = match args.arg(1) {
        None | Some(Value::None) => usize::MAX,
        Some(v) => {
            let n = want_i64(fname, "maxsplit", v)?;
            if n < 0 {
                usize::MAX
            } else {
                n as usize
            }
        }
    };

    let pieces: Vec<&str> = match sep {
        None => {
            // Runs of whitespace separate; leading and trailing runs
            // produce no empty pieces.
            let mut pieces: Vec<&str> = Vec::new();
            let mut rest = s.trim_matches(char::is_whitespace);
            while !rest.is_empty() {
                if pieces.len() == max {
                    pieces.push(rest);
                    rest = "";
                    continue;
                }
                match rest.find(char::is_whitespace) {
                    Some(at) => {
                        pieces.push(&rest[..at]);
                        rest = rest[at..].trim_start_matches(char::is_whitespace);
                    }
                    None => {
                        pieces.push(rest);
                        rest = "";
                    }
                }
            }
            pieces
        }
        Some(sep) => {
            let mut pieces = Vec::new();
            if from_right {
                let mut rest = &s[..];
                while pieces.len() < max {
                    match rfind_sub(rest.as_bytes(), sep.as_bytes()) {
                        Some(at) => {
                            pieces.push(&rest[at + sep.len()..]);
                            rest = &rest[..at];
                        }
                        None => break,
                    }
                }
                pieces.push(rest);
                pieces.reverse();
            } else {
                let mut rest = &s[..];
                while pieces.len() < max {
                    match find_sub(rest.as_bytes(), sep.as_bytes()) {
                        Some(at) => {
                            pieces.push(&rest[..at]);
                            rest = &rest[at + sep.len()..];
                        }
                        None => break,
                    }
                }
                pieces.push(rest);
            }
            pieces
        }
    };
    // One step per piece. A split keeps the source's memory alive
    // through its pieces, so the source length is charged in full on
    // top of the per-piece storage.
    thread.add_steps(pieces.len() as u64 + 1)?;
    thread.add_allocs(s.len() as i64)?;
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        out.push(build_str(thread, piece)?);
    }
    build_list(thread, out)
}

fn split(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    split_impl(thread, recv, "split", args, false)
}

fn rsplit(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    split_impl(thread, recv, "rsplit", args, true)
}

fn splitlines(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("splitlines")?;
    args.check_arity("splitlines", 0, Some(1))?;
    let s = recv_str("splitlines", recv)?;
    let keepends = match args.arg(0) {
        None => false,
        Some(v) => crate::support::want_bool("splitlines", "keepends", v)?,
    };
    thread.add_steps(s.len() as u64 + 1)?;
    // The lines keep the source's memory alive; charge it in full.
    thread.add_allocs(s.len() as i64)?;

    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' || bytes[i] == b'\r' {
            let terminator_len = if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
                2
            } else {
                1
            };
            let end = if keepends { i + terminator_len } else { i };
            out.push(build_str(thread, &s[start..end])?);
            i += terminator_len;
            start = i;
        } else {
            i += 1;
        }
    }
    if start < bytes.len() {
        out.push(build_str(thread, &s[start..])?);
    }
    build_list(thread, out)
}
