//! Rendering of parsed expressions and results according to `PrintOptions`.

use itertools::Itertools;

use super::expression::{BinOp, Node};
use crate::options::{BaseDisplay, DigitGrouping, ExpDisplay, IntervalDisplay, PrintOptions};

/// Significant digits shown for inexact decimal results.
const SIGNIFICANT_DIGITS: i32 = 12;

/// Largest denominator tried when recognising a repeating fraction.
const MAX_DENOMINATOR: u32 = 1000;

/// Echo of the parsed input in canonical syntax.
pub fn echo(node: &Node, opts: &PrintOptions) -> String {
    match node {
        Node::Number(v) => v.to_string(),
        Node::Ident(name) => name.clone(),
        Node::Neg(inner) => {
            let minus = if opts.use_unicode_signs { "−" } else { "-" };
            match inner.as_ref() {
                Node::Binary(op, ..) if op.precedence() < BinOp::Pow.precedence() => {
                    format!("{minus}({})", echo(inner, opts))
                }
                _ => format!("{minus}{}", echo(inner, opts)),
            }
        }
        Node::Binary(op, left, right) => {
            let l = operand(left, op.precedence(), *op == BinOp::Pow, opts);
            let r = operand(right, op.precedence(), *op != BinOp::Pow && !op.is_commutative(), opts);
            format!("{l}{}{r}", op.symbol(opts.use_unicode_signs))
        }
        Node::Call { name, args } => {
            format!("{name}({})", args.iter().map(|a| echo(a, opts)).join(", "))
        }
        Node::Convert(inner, unit) => format!("{} to {unit}", echo(inner, opts)),
    }
}

fn operand(node: &Node, parent: u8, strict: bool, opts: &PrintOptions) -> String {
    let text = echo(node, opts);
    let needs_parens = match node {
        Node::Binary(op, ..) => op.precedence() < parent || (strict && op.precedence() == parent),
        Node::Convert(..) => true,
        Node::Neg(_) => parent == BinOp::Pow.precedence(),
        _ => false,
    };
    if needs_parens {
        format!("({text})")
    } else {
        text
    }
}

/// Formats a plain number. `decimals` fixes the number of fraction digits.
pub fn number(value: f64, decimals: Option<u32>, opts: &PrintOptions) -> String {
    let text = if value.is_nan() {
        return "undefined".to_string();
    } else if value.is_infinite() {
        let inf = if opts.use_unicode_signs { "∞" } else { "infinity" };
        if value < 0.0 {
            format!("-{inf}")
        } else {
            inf.to_string()
        }
    } else if opts.base != 10 && value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        integer_in_base(value, opts)
    } else if let Some(decimals) = decimals {
        group_digits(&format!("{:.*}", decimals as usize, value), opts)
    } else {
        let magnitude = value.abs();
        if magnitude != 0.0 && !(1e-9..1e15).contains(&magnitude) {
            exponential(value, opts)
        } else {
            group_digits(&significant(value), opts)
        }
    };
    unicode_minus(text, opts)
}

/// Formats an exact result, marking a repeating decimal expansion when
/// `indicate_infinite_series` is set.
pub fn exact(value: f64, opts: &PrintOptions) -> String {
    let text = number(value, None, opts);
    if opts.indicate_infinite_series && opts.base == 10 && repeats(value) {
        let ellipsis = if opts.use_unicode_signs { "…" } else { "..." };
        format!("{text}{ellipsis}")
    } else {
        text
    }
}

/// True for a fraction with a small denominator that has a prime factor
/// other than 2 or 5.
fn repeats(value: f64) -> bool {
    if value.fract() == 0.0 || !(1e-9..1e15).contains(&value.abs()) {
        return false;
    }
    let denominator = (2..=MAX_DENOMINATOR).find(|&q| {
        let scaled = value * f64::from(q);
        (scaled - scaled.round()).abs() <= 1e-9 * scaled.abs().max(1.0)
    });
    let Some(mut q) = denominator else {
        return false;
    };
    for p in [2, 5] {
        while q % p == 0 {
            q /= p;
        }
    }
    q > 1
}

/// Half-width of the uncertainty implied by a precision exponent.
pub fn approximate(value: f64, precision: Option<i32>, opts: &PrintOptions) -> String {
    let decimals = precision.map(|p| u32::try_from(-p).unwrap_or(0));
    let half_width = precision.map(|p| 0.5 * 10f64.powi(p));
    match (opts.interval_display, half_width) {
        (IntervalDisplay::PlusMinus, Some(h)) => {
            let pm = if opts.use_unicode_signs { "±" } else { "+/-" };
            format!("{} {pm} {}", number(value, decimals, opts), number(h, decimals.map(|d| d + 1), opts))
        }
        (IntervalDisplay::Interval, Some(h)) => format!(
            "interval({}, {})",
            number(value - h, decimals.map(|d| d + 1), opts),
            number(value + h, decimals.map(|d| d + 1), opts)
        ),
        _ => {
            let prefix = if opts.use_unicode_signs { "≈ " } else { "approx. " };
            format!("{prefix}{}", number(value, decimals, opts))
        }
    }
}

fn significant(value: f64) -> String {
    let magnitude = value.abs();
    let exponent = if magnitude == 0.0 { 0 } else { magnitude.log10().floor() as i32 };
    let decimals = (SIGNIFICANT_DIGITS - 1 - exponent).clamp(0, 15) as usize;
    let text = format!("{:.*}", decimals, value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}

fn exponential(value: f64, opts: &PrintOptions) -> String {
    let text = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    match opts.exp_display {
        ExpDisplay::LowercaseE => format!("{mantissa}e{exponent}"),
        ExpDisplay::UppercaseE => format!("{mantissa}E{exponent}"),
        ExpDisplay::PowerOf10 => {
            let times = if opts.use_unicode_signs { "×" } else { "*" };
            format!("{mantissa}{times}10^{exponent}")
        }
    }
}

fn integer_in_base(value: f64, opts: &PrintOptions) -> String {
    let n = value.abs() as u64;
    let digits = match opts.base {
        2 => format!("{n:b}"),
        8 => format!("{n:o}"),
        16 => format!("{n:X}"),
        _ => n.to_string(),
    };
    let prefix = match (opts.base_display, opts.base) {
        (BaseDisplay::Normal, 2) => "0b",
        (BaseDisplay::Normal, 8) => "0o",
        (BaseDisplay::Normal, 16) => "0x",
        _ => "",
    };
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{prefix}{digits}")
}

fn group_digits(text: &str, opts: &PrintOptions) -> String {
    if opts.digit_grouping == DigitGrouping::None {
        return text.to_string();
    }
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int, frac) = match rest.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (rest, None),
    };
    let sep = if opts.use_unicode_signs { "\u{2009}" } else { " " };
    let grouped = int
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk))
        .join(sep);
    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn unicode_minus(text: String, opts: &PrintOptions) -> String {
    match text.strip_prefix('-') {
        Some(rest) if opts.use_unicode_signs => format!("−{rest}"),
        _ => text,
    }
}
