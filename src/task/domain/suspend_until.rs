//! Resolution of `SUSPEND_UNTIL` values into absolute wake instants.
//!
//! Two textual forms are accepted: an ISO-8601 duration relative to the
//! current instant (`PT5S`, `P1DT2H`, `PT-1H`) and an RFC 3339 timestamp
//! (`2026-10-19T12:00:00Z`). Calendar units (years, months) are rejected
//! because their length depends on the anchor date.

use super::RejectionReason;
use chrono::{DateTime, TimeDelta, Utc};

/// Parsed, not yet resolved, suspend-until value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendUntil {
    /// Wake after the given offset from "now".
    After(TimeDelta),
    /// Wake at the given instant.
    At(DateTime<Utc>),
}

impl SuspendUntil {
    /// Parses either an ISO-8601 duration or an RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::InvalidSuspendUntil`] when the text matches
    /// neither form.
    pub fn parse(raw: &str) -> Result<Self, RejectionReason> {
        let text = raw.trim();
        if let Some(offset) = parse_duration(text) {
            return Ok(Self::After(offset));
        }
        DateTime::parse_from_rfc3339(text)
            .map(|instant| Self::At(instant.with_timezone(&Utc)))
            .map_err(|_| RejectionReason::InvalidSuspendUntil(raw.to_owned()))
    }

    /// Resolves the value against `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RejectionReason::SuspendUntilNotInFuture`] when the resolved
    /// instant is not strictly after `now`, and
    /// [`RejectionReason::InvalidSuspendUntil`] when the offset overflows.
    pub fn resolve(self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RejectionReason> {
        let instant = match self {
            Self::After(offset) => now.checked_add_signed(offset).ok_or_else(|| {
                RejectionReason::InvalidSuspendUntil(format!("offset {offset} overflows"))
            })?,
            Self::At(instant) => instant,
        };
        if instant <= now {
            return Err(RejectionReason::SuspendUntilNotInFuture(instant));
        }
        Ok(instant)
    }
}

const DATE_UNITS: [char; 2] = ['W', 'D'];
const TIME_UNITS: [char; 3] = ['H', 'M', 'S'];
const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Signed numeric component of a duration designator.
struct Amount {
    negative: bool,
    whole: i64,
    nanos: u32,
}

fn parse_duration(text: &str) -> Option<TimeDelta> {
    let (negated, unsigned) = split_sign(text);
    let body = unsigned.strip_prefix(['P', 'p'])?;
    let (date_part, time_part) = match body.split_once(['T', 't']) {
        Some((_, "")) => return None,
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };
    if date_part.is_empty() && time_part.is_none() {
        return None;
    }

    let mut total = TimeDelta::zero();
    for (amount, unit) in components(date_part, &DATE_UNITS)? {
        total = total.checked_add(&unit_delta(&amount, unit)?)?;
    }
    if let Some(time) = time_part {
        for (amount, unit) in components(time, &TIME_UNITS)? {
            total = total.checked_add(&unit_delta(&amount, unit)?)?;
        }
    }

    if negated {
        return TimeDelta::zero().checked_sub(&total);
    }
    Some(total)
}

fn split_sign(text: &str) -> (bool, &str) {
    text.strip_prefix('-').map_or_else(
        || (false, text.strip_prefix('+').unwrap_or(text)),
        |rest| (true, rest),
    )
}

/// Splits `part` into `(amount, unit)` pairs, requiring units to appear at
/// most once and in the order given by `allowed`.
fn components(part: &str, allowed: &[char]) -> Option<Vec<(Amount, char)>> {
    let mut parsed = Vec::new();
    let mut next_unit = 0_usize;
    let mut number = String::new();

    for ch in part.chars() {
        if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | ',') {
            number.push(ch);
            continue;
        }
        let unit = ch.to_ascii_uppercase();
        let position = allowed.iter().position(|candidate| *candidate == unit)?;
        if position < next_unit || number.is_empty() {
            return None;
        }
        let amount = parse_amount(&number, unit == 'S')?;
        parsed.push((amount, unit));
        next_unit = position + 1;
        number.clear();
    }

    number.is_empty().then_some(parsed)
}

fn parse_amount(raw: &str, allow_fraction: bool) -> Option<Amount> {
    let (negative, digits) = split_sign(raw);
    let (whole_digits, fraction_digits) = match digits.split_once(['.', ',']) {
        Some(_) if !allow_fraction => return None,
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };
    if whole_digits.is_empty() || !whole_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if fraction_digits.len() > 9 || !fraction_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole = whole_digits.parse::<i64>().ok()?;
    let nanos = if fraction_digits.is_empty() {
        0
    } else {
        let padded = format!("{fraction_digits:0<9}");
        padded.parse::<u32>().ok()?
    };
    debug_assert!(nanos < NANOS_PER_SECOND);
    Some(Amount {
        negative,
        whole,
        nanos,
    })
}

fn unit_delta(amount: &Amount, unit: char) -> Option<TimeDelta> {
    let magnitude = match unit {
        'W' => TimeDelta::try_weeks(amount.whole)?,
        'D' => TimeDelta::try_days(amount.whole)?,
        'H' => TimeDelta::try_hours(amount.whole)?,
        'M' => TimeDelta::try_minutes(amount.whole)?,
        'S' => TimeDelta::try_seconds(amount.whole)?
            .checked_add(&TimeDelta::nanoseconds(i64::from(amount.nanos)))?,
        _ => return None,
    };
    if amount.negative {
        return TimeDelta::zero().checked_sub(&magnitude);
    }
    Some(magnitude)
}
