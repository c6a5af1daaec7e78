//! Text functions
//!
//! Positions and lengths count characters, not bytes.

use super::criteria::wildcard_match;
use super::format::{format_fixed, NumberFormat};
use super::{opt_bool, opt_integer, text_arg, FunctionResult};
use crate::value::{parse_number, FormulaValue};
use paintcalc_core::{CellError, Decimal};

/// Longest text a function may produce
const MAX_TEXT_LEN: usize = 32_767;

fn take_left(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn take_right(s: &str, n: usize) -> String {
    let len = s.chars().count();
    s.chars().skip(len.saturating_sub(n)).collect()
}

fn take_mid(s: &str, start: usize, n: usize) -> String {
    s.chars().skip(start).take(n).collect()
}

/// Non-negative count argument; negative counts are `#VALUE!`
fn count_arg(args: &[FormulaValue], index: usize, default: i64) -> Result<usize, CellError> {
    let n = opt_integer(args, index, default)?;
    usize::try_from(n).map_err(|_| CellError::Value)
}

fn text_result(s: String) -> FunctionResult {
    if s.chars().count() > MAX_TEXT_LEN {
        return Err(CellError::Value);
    }
    Ok(FormulaValue::text(s))
}

/// CONCAT / CONCATENATE: ranges contribute every cell, row by row
pub fn fn_concat(args: &[FormulaValue]) -> FunctionResult {
    let mut out = String::new();
    for value in args.iter().flat_map(FormulaValue::flat) {
        out.push_str(&text_arg(value)?);
    }
    text_result(out)
}

pub fn fn_upper(args: &[FormulaValue]) -> FunctionResult {
    Ok(FormulaValue::text(text_arg(&args[0])?.to_uppercase()))
}

pub fn fn_lower(args: &[FormulaValue]) -> FunctionResult {
    Ok(FormulaValue::text(text_arg(&args[0])?.to_lowercase()))
}

/// PROPER(text): capitalize the first letter of each word
pub fn fn_proper(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(&args[0])?;
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    Ok(FormulaValue::text(out))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(&args[0])?;
    let n = count_arg(args, 1, 1)?;
    Ok(FormulaValue::text(take_left(&text, n)))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(&args[0])?;
    let n = count_arg(args, 1, 1)?;
    Ok(FormulaValue::text(take_right(&text, n)))
}

/// MID(text, start_num, num_chars)
pub fn fn_mid(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(&args[0])?;
    let start = args[1].to_integer()?;
    let n = count_arg(args, 2, 0)?;
    if start < 1 {
        return Err(CellError::Value);
    }
    let start = usize::try_from(start - 1).map_err(|_| CellError::Value)?;
    Ok(FormulaValue::text(take_mid(&text, start, n)))
}

pub fn fn_len(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(&args[0])?;
    Ok(FormulaValue::Number(Decimal::from(text.chars().count())))
}

/// TRIM(text): drop leading and trailing spaces, collapse inner runs to one
pub fn fn_trim(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(&args[0])?;
    let trimmed = text
        .split(' ')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(FormulaValue::text(trimmed))
}

/// Resolve the 1-based `start_num` of FIND/SEARCH to a 0-based char index
fn search_start(args: &[FormulaValue], haystack_len: usize) -> Result<usize, CellError> {
    let start = opt_integer(args, 2, 1)?;
    if start < 1 {
        return Err(CellError::Value);
    }
    let start = usize::try_from(start - 1).map_err(|_| CellError::Value)?;
    if start > haystack_len {
        return Err(CellError::Value);
    }
    Ok(start)
}

fn position_of(needle: &[char], haystack: &[char], start: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(start);
    }
    (start..=haystack.len().saturating_sub(needle.len()))
        .find(|&i| haystack.get(i..i + needle.len()) == Some(needle))
}

fn position_result(index: usize) -> FunctionResult {
    Ok(FormulaValue::Number(Decimal::from(index + 1)))
}

/// FIND(find_text, within_text, [start_num]): case-sensitive, no wildcards
pub fn fn_find(args: &[FormulaValue]) -> FunctionResult {
    let needle: Vec<char> = text_arg(&args[0])?.chars().collect();
    let haystack: Vec<char> = text_arg(&args[1])?.chars().collect();
    let start = search_start(args, haystack.len())?;
    position_of(&needle, &haystack, start).map_or(Err(CellError::Value), position_result)
}

/// SEARCH(find_text, within_text, [start_num]): case-insensitive, with wildcards
pub fn fn_search(args: &[FormulaValue]) -> FunctionResult {
    let pattern = text_arg(&args[0])?.to_lowercase();
    let haystack: Vec<char> = text_arg(&args[1])?.to_lowercase().chars().collect();
    let start = search_start(args, haystack.len())?;

    if !pattern.contains(['*', '?', '~']) {
        let needle: Vec<char> = pattern.chars().collect();
        return position_of(&needle, &haystack, start).map_or(Err(CellError::Value), position_result);
    }

    // A trailing run lets the pattern match any prefix of the rest
    let prefix_pattern = format!("{}*", pattern);
    (start..=haystack.len())
        .find(|&i| {
            let rest: String = haystack[i..].iter().collect();
            wildcard_match(&prefix_pattern, &rest)
        })
        .map_or(Err(CellError::Value), position_result)
}

/// SUBSTITUTE(text, old_text, new_text, [instance_num])
pub fn fn_substitute(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(&args[0])?;
    let old = text_arg(&args[1])?;
    let new = text_arg(&args[2])?;

    if old.is_empty() {
        return Ok(FormulaValue::text(text));
    }

    let result = match args.get(3) {
        None => text.replace(&old, &new),
        Some(instance) => {
            let instance = instance.to_integer()?;
            if instance < 1 {
                return Err(CellError::Value);
            }
            match text.match_indices(&old).nth((instance - 1) as usize) {
                Some((at, _)) => {
                    let mut out = String::with_capacity(text.len() + new.len());
                    out.push_str(&text[..at]);
                    out.push_str(&new);
                    out.push_str(&text[at + old.len()..]);
                    out
                }
                None => text,
            }
        }
    };
    text_result(result)
}

/// REPT(text, number_times)
pub fn fn_rept(args: &[FormulaValue]) -> FunctionResult {
    let text = text_arg(&args[0])?;
    let times = count_arg(args, 1, 0)?;
    if text.chars().count().saturating_mul(times) > MAX_TEXT_LEN {
        return Err(CellError::Value);
    }
    Ok(FormulaValue::text(text.repeat(times)))
}

/// EXACT(text1, text2): case-sensitive comparison
pub fn fn_exact(args: &[FormulaValue]) -> FunctionResult {
    let a = text_arg(&args[0])?;
    let b = text_arg(&args[1])?;
    Ok(FormulaValue::Boolean(a == b))
}

/// VALUE(text): accepts currency symbols, thousands separators, percents
/// and accounting-style parentheses
pub fn fn_value(args: &[FormulaValue]) -> FunctionResult {
    let text = match &args[0] {
        FormulaValue::Number(n) => return Ok(FormulaValue::Number(*n)),
        FormulaValue::Empty => return Ok(FormulaValue::Number(Decimal::ZERO)),
        FormulaValue::Boolean(_) => return Err(CellError::Value),
        other => text_arg(other)?,
    };

    let mut s = text.trim();
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }
    let (s, percent) = match s.strip_suffix('%') {
        Some(rest) => (rest, true),
        None => (s, false),
    };
    let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',')).collect();

    let mut n = parse_number(&cleaned).ok_or(CellError::Value)?;
    if percent {
        n = n.checked_div(Decimal::ONE_HUNDRED).ok_or(CellError::Num)?;
    }
    if negative {
        n = -n;
    }
    Ok(FormulaValue::Number(n))
}

/// TEXT(value, format_text)
pub fn fn_text(args: &[FormulaValue]) -> FunctionResult {
    let code = text_arg(&args[1])?;
    let n = match &args[0] {
        FormulaValue::Text(s) => match parse_number(s.as_str()) {
            Some(n) => n,
            // Non-numeric text passes through unformatted
            None => return Ok(args[0].clone()),
        },
        other => other.to_number()?,
    };
    let format = NumberFormat::parse(&code)?;
    Ok(FormulaValue::text(format.format(n)?))
}

/// FIXED(number, [decimals], [no_commas])
pub fn fn_fixed(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let decimals = opt_integer(args, 1, 2)?;
    let no_commas = opt_bool(args, 2, false)?;
    Ok(FormulaValue::text(format_fixed(n, decimals, !no_commas)?))
}

/// DOLLAR(number, [decimals]): negatives are shown in parentheses
pub fn fn_dollar(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let decimals = opt_integer(args, 1, 2)?;
    let body = format_fixed(n.abs(), decimals, true)?;
    let negative = n.is_sign_negative() && body.chars().any(|c| matches!(c, '1'..='9'));
    if negative {
        Ok(FormulaValue::text(format!("(${})", body)))
    } else {
        Ok(FormulaValue::text(format!("${}", body)))
    }
}
