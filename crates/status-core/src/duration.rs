//! Duration strings like "10m", "1h30m", "1.5s" or "500ms".
//!
//! A duration is a sequence of decimal numbers, each with a unit suffix.
//! Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`.

use std::time::Duration;

use crate::error::DurationError;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fractional digits beyond this are ignored (sub-nanosecond for every unit).
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a duration string into a [`Duration`].
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let mut rest = s;
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !is_number_char(c))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() {
            return Err(DurationError::Invalid(input.to_string()));
        }

        let unit_len = tail.find(is_number_char).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            input: input.to_string(),
            unit: unit.to_string(),
        })?;

        let nanos = scaled(number, scale).ok_or_else(|| invalid_or_overflow(input, number))?;
        total = total
            .checked_add(nanos)
            .ok_or_else(|| DurationError::Overflow(input.to_string()))?;
        rest = tail;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| DurationError::Overflow(input.to_string()))
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Multiply a decimal number by `scale` nanoseconds without going through floats.
fn scaled(number: &str, scale: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(scale)?;

    if !fraction.is_empty() {
        let digits = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        let value: u128 = digits.parse().ok()?;
        let divisor = 10u128.pow(digits.len() as u32);
        nanos = nanos.checked_add(value.checked_mul(scale)? / divisor)?;
    }
    Some(nanos)
}

fn invalid_or_overflow(input: &str, number: &str) -> DurationError {
    let well_formed = number.matches('.').count() <= 1 && number != ".";
    if well_formed {
        DurationError::Overflow(input.to_string())
    } else {
        DurationError::Invalid(input.to_string())
    }
}
