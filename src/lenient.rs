//! Permissive date and date-time recognition. Ambiguous numeric dates
//! resolve month-first unless the first number cannot be a month.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::value::Value;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number { value: u32, width: usize },
    NumericDate { parts: [u32; 3], widths: [usize; 3] },
    Clock { hour: u32, minute: u32, second: u32, nano: u32 },
    Word(String),
    Offset(i32),
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct Parsed {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub offset: Option<FixedOffset>,
}

/// Recognizes a calendar date with no time-of-day component.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let parsed = parse(text)?;
    match parsed {
        Parsed {
            date: Some(date),
            time: None,
            offset: None,
        } => Some(date),
        _ => None,
    }
}

/// Recognizes a date plus time-of-day, offset-aware when the text carries a
/// UTC offset.
pub(crate) fn parse_datetime(text: &str) -> Option<Value> {
    let parsed = parse(text)?;
    let naive = NaiveDateTime::new(parsed.date?, parsed.time?);
    match parsed.offset {
        Some(offset) => naive
            .and_local_timezone(offset)
            .single()
            .map(Value::DateTimeTz),
        None => Some(Value::DateTime(naive)),
    }
}

pub(crate) fn parse(text: &str) -> Option<Parsed> {
    let tokens = tokenize(text.trim())?;
    if tokens.is_empty() {
        return None;
    }

    let mut month_name: Option<u32> = None;
    let mut numeric_date: Option<([u32; 3], [usize; 3])> = None;
    let mut loose: Vec<(u32, usize)> = Vec::new();
    let mut clock: Option<(u32, u32, u32, u32)> = None;
    let mut meridiem: Option<bool> = None;
    let mut offset_seconds: Option<i32> = None;

    for token in tokens {
        match token {
            Token::Number { value, width } => loose.push((value, width)),
            Token::NumericDate { parts, widths } => {
                if numeric_date.replace((parts, widths)).is_some() {
                    return None;
                }
            }
            Token::Clock {
                hour,
                minute,
                second,
                nano,
            } => {
                if clock.replace((hour, minute, second, nano)).is_some() {
                    return None;
                }
            }
            Token::Offset(seconds) => {
                if offset_seconds.replace(seconds).is_some() {
                    return None;
                }
            }
            Token::Word(word) => match word.as_str() {
                "am" | "a" => {
                    if meridiem.replace(false).is_some() {
                        return None;
                    }
                }
                "pm" | "p" => {
                    if meridiem.replace(true).is_some() {
                        return None;
                    }
                }
                "z" | "utc" | "gmt" => {
                    if offset_seconds.replace(0).is_some() {
                        return None;
                    }
                }
                "t" | "at" | "of" => {}
                other if is_weekday(other) => {}
                other => {
                    let month = month_from_name(other)?;
                    if month_name.replace(month).is_some() {
                        return None;
                    }
                }
            },
        }
    }

    let (year, month, day) = match (numeric_date, month_name) {
        (Some((parts, widths)), None) if loose.is_empty() => resolve_numeric(parts, widths),
        (None, Some(month)) => {
            let (day, year) = resolve_day_year(&loose)?;
            (year, month, day)
        }
        _ => return None,
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let time = match clock {
        Some((hour, minute, second, nano)) => {
            let hour = apply_meridiem(hour, meridiem)?;
            Some(NaiveTime::from_hms_nano_opt(hour, minute, second, nano)?)
        }
        None if meridiem.is_some() || offset_seconds.is_some() => return None,
        None => None,
    };
    let offset = match offset_seconds {
        Some(seconds) => Some(FixedOffset::east_opt(seconds)?),
        None => None,
    };

    Some(Parsed {
        date: Some(date),
        time,
        offset,
    })
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        let byte = bytes[idx];
        if byte.is_ascii_whitespace() || byte == b',' {
            idx += 1;
            continue;
        }
        if byte.is_ascii_digit() {
            let (token, next) = scan_numeric(bytes, idx)?;
            tokens.push(token);
            idx = next;
            continue;
        }
        if byte == b'+' || byte == b'-' {
            if !offset_allowed(&tokens) {
                return None;
            }
            let (seconds, next) = scan_offset(bytes, idx)?;
            tokens.push(Token::Offset(seconds));
            idx = next;
            continue;
        }
        if byte.is_ascii_alphabetic() {
            let end = run_end(bytes, idx, |b| b.is_ascii_alphabetic());
            let mut word = text[idx..end].to_ascii_lowercase();
            idx = end;
            // `a.m.` / `p.m.` and abbreviations such as `Sept.`
            if bytes.get(idx) == Some(&b'.') {
                idx += 1;
                if matches!(word.as_str(), "a" | "p") && bytes.get(idx) == Some(&b'm') {
                    idx += 1;
                    if bytes.get(idx) == Some(&b'.') {
                        idx += 1;
                    }
                    word.push('m');
                }
            }
            tokens.push(Token::Word(word));
            continue;
        }
        return None;
    }

    Some(tokens)
}

fn scan_numeric(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let end = run_end(bytes, start, |b| b.is_ascii_digit());
    let first = digits_value(&bytes[start..end])?;

    match bytes.get(end) {
        Some(b':') => scan_clock(bytes, start, end, first),
        Some(&sep)
            if matches!(sep, b'-' | b'/' | b'.')
                && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) =>
        {
            let mut parts = [first, 0, 0];
            let mut widths = [end - start, 0, 0];
            let mut cursor = end;
            for slot in 1..3 {
                if bytes.get(cursor) != Some(&sep) {
                    return None;
                }
                let part_start = cursor + 1;
                let part_end = run_end(bytes, part_start, |b| b.is_ascii_digit());
                if part_end == part_start {
                    return None;
                }
                parts[slot] = digits_value(&bytes[part_start..part_end])?;
                widths[slot] = part_end - part_start;
                cursor = part_end;
            }
            if bytes.get(cursor).is_some_and(|b| *b == sep || b.is_ascii_digit()) {
                return None;
            }
            Some((Token::NumericDate { parts, widths }, cursor))
        }
        _ => Some((
            Token::Number {
                value: first,
                width: end - start,
            },
            end,
        )),
    }
}

fn scan_clock(bytes: &[u8], start: usize, end: usize, hour: u32) -> Option<(Token, usize)> {
    if end - start > 2 {
        return None;
    }
    let (minute, mut cursor) = two_digit_field(bytes, end + 1)?;
    let mut second = 0;
    let mut nano = 0;
    if bytes.get(cursor) == Some(&b':') {
        let (value, next) = two_digit_field(bytes, cursor + 1)?;
        second = value;
        cursor = next;
        if matches!(bytes.get(cursor), Some(b'.') | Some(b',')) {
            let frac_start = cursor + 1;
            let frac_end = run_end(bytes, frac_start, |b| b.is_ascii_digit());
            if frac_end == frac_start {
                return None;
            }
            nano = fraction_nanos(&bytes[frac_start..frac_end])?;
            cursor = frac_end;
        }
    }
    Some((
        Token::Clock {
            hour,
            minute,
            second,
            nano,
        },
        cursor,
    ))
}

fn scan_offset(bytes: &[u8], start: usize) -> Option<(i32, usize)> {
    let sign = if bytes[start] == b'-' { -1 } else { 1 };
    let (hours, mut cursor) = two_digit_field(bytes, start + 1)?;
    let mut minutes = 0;
    if bytes.get(cursor) == Some(&b':') {
        let (value, next) = two_digit_field(bytes, cursor + 1)?;
        minutes = value;
        cursor = next;
    } else if bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
        let (value, next) = two_digit_field(bytes, cursor)?;
        minutes = value;
        cursor = next;
    }
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = (hours * 3600 + minutes * 60) as i32;
    Some((sign * seconds, cursor))
}

fn offset_allowed(tokens: &[Token]) -> bool {
    match tokens.last() {
        Some(Token::Clock { .. }) => true,
        Some(Token::Word(word)) => matches!(word.as_str(), "am" | "pm" | "utc" | "gmt"),
        _ => false,
    }
}

fn two_digit_field(bytes: &[u8], start: usize) -> Option<(u32, usize)> {
    let end = run_end(bytes, start, |b| b.is_ascii_digit());
    if end - start != 2 {
        return None;
    }
    Some((digits_value(&bytes[start..end])?, end))
}

fn run_end(bytes: &[u8], start: usize, accept: impl Fn(u8) -> bool) -> usize {
    bytes[start..]
        .iter()
        .position(|b| !accept(*b))
        .map_or(bytes.len(), |offset| start + offset)
}

fn digits_value(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || digits.len() > 9 {
        return None;
    }
    Some(
        digits
            .iter()
            .fold(0u32, |acc, digit| acc * 10 + u32::from(digit - b'0')),
    )
}

fn fraction_nanos(digits: &[u8]) -> Option<u32> {
    let significant = &digits[..digits.len().min(9)];
    let value = digits_value(significant)?;
    Some(value * 10u32.pow(9 - significant.len() as u32))
}

/// Full names and three-letter abbreviations only.
fn name_matches(name: &str, word: &str) -> bool {
    name == word || name[..3] == *word
}

fn month_from_name(word: &str) -> Option<u32> {
    let word = if word == "sept" { "sep" } else { word };
    MONTHS
        .iter()
        .position(|month| name_matches(month, word))
        .map(|idx| idx as u32 + 1)
}

fn is_weekday(word: &str) -> bool {
    WEEKDAYS.iter().any(|day| name_matches(day, word))
}

fn resolve_numeric(parts: [u32; 3], widths: [usize; 3]) -> (i32, u32, u32) {
    if widths[0] >= 3 || parts[0] > 31 {
        return (expand_year(parts[0], widths[0]), parts[1], parts[2]);
    }
    let year = expand_year(parts[2], widths[2]);
    if parts[0] > 12 {
        (year, parts[1], parts[0])
    } else {
        (year, parts[0], parts[1])
    }
}

fn resolve_day_year(loose: &[(u32, usize)]) -> Option<(u32, i32)> {
    match loose {
        [(first, first_width), (second, second_width)] => {
            let first_is_year = *first_width >= 3 || *first > 31;
            if first_is_year {
                Some((*second, expand_year(*first, *first_width)))
            } else {
                Some((*first, expand_year(*second, *second_width)))
            }
        }
        _ => None,
    }
}

/// Two-digit years pivot the same way `%y` does: 69-99 map to the 1900s,
/// 00-68 to the 2000s.
fn expand_year(value: u32, width: usize) -> i32 {
    let value = value as i32;
    if width <= 2 {
        if value >= 69 { 1900 + value } else { 2000 + value }
    } else {
        value
    }
}

fn apply_meridiem(hour: u32, meridiem: Option<bool>) -> Option<u32> {
    match meridiem {
        None => Some(hour),
        Some(_) if hour == 0 || hour > 12 => None,
        Some(true) if hour < 12 => Some(hour + 12),
        Some(false) if hour == 12 => Some(0),
        Some(_) => Some(hour),
    }
}
