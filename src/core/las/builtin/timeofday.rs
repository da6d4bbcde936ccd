//! `timeofday` evaluator
//!
//! Pattern: `HHMM`, or `HHMM-HHMM` with `eq`/`ne` (inclusive, may wrap
//! past midnight). Results are never decision-cacheable; the cookie holds
//! the parsed pattern and the verdict for the minute it was computed in,
//! and is replaced once that minute has passed.

use crate::error::Result;
use crate::las::{Capabilities, Cookie, CookieUpdate, EvalCall, EvalOutcome, Evaluator, Verdict};
use crate::policy::Comparator;
use chrono::{NaiveDateTime, Timelike};

#[derive(Debug, Default, Clone, Copy)]
pub struct TimeOfDayEvaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeSpec {
    At(u16),
    Range(u16, u16),
}

#[derive(Debug)]
struct TimeCookie {
    spec: TimeSpec,
    minute: NaiveDateTime,
    verdict: Verdict,
}

fn parse_hhmm(text: &str) -> std::result::Result<u16, String> {
    let text = text.trim();
    if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not HHMM", text));
    }
    let value: u16 = text.parse().map_err(|_| format!("'{}' is not HHMM", text))?;
    if value / 100 > 23 || value % 100 > 59 {
        return Err(format!("'{}' is not a valid time", text));
    }
    Ok(value)
}

fn parse(comparator: Comparator, pattern: &str) -> std::result::Result<TimeSpec, String> {
    match pattern.split_once('-') {
        Some((start, end)) => match comparator {
            Comparator::Eq | Comparator::Ne => {
                Ok(TimeSpec::Range(parse_hhmm(start)?, parse_hhmm(end)?))
            }
            other => Err(format!("comparator '{}' not supported with a range", other)),
        },
        None if comparator == Comparator::In => {
            Err("comparator 'in' not supported".to_string())
        }
        None => Ok(TimeSpec::At(parse_hhmm(pattern)?)),
    }
}

fn decide(comparator: Comparator, spec: TimeSpec, now: u16) -> bool {
    match spec {
        TimeSpec::Range(start, end) => {
            let inside = if start <= end {
                start <= now && now <= end
            } else {
                now >= start || now <= end
            };
            match comparator {
                Comparator::Ne => !inside,
                _ => inside,
            }
        }
        TimeSpec::At(at) => match comparator {
            Comparator::Eq | Comparator::In => now == at,
            Comparator::Ne => now != at,
            Comparator::Lt => now < at,
            Comparator::Le => now <= at,
            Comparator::Gt => now > at,
            Comparator::Ge => now >= at,
        },
    }
}

fn truncate_to_minute(now: NaiveDateTime) -> NaiveDateTime {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

impl Evaluator for TimeOfDayEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, caps: &Capabilities) -> Result<EvalOutcome> {
        let minute = truncate_to_minute(caps.clock.now());

        let previous = call.cookie_as::<TimeCookie>();
        if let Some(cookie) = &previous {
            if cookie.minute == minute {
                return Ok(EvalOutcome::new(cookie.verdict).not_cacheable());
            }
        }

        let spec = match &previous {
            Some(cookie) => cookie.spec,
            None => parse(call.comparator, call.pattern).map_err(|e| call.failure(e))?,
        };
        let now = (minute.hour() * 100 + minute.minute()) as u16;
        let verdict = Verdict::from(decide(call.comparator, spec, now));

        let cookie: Cookie = std::sync::Arc::new(TimeCookie {
            spec,
            minute,
            verdict,
        });
        Ok(EvalOutcome::new(verdict)
            .not_cacheable()
            .with_cookie(CookieUpdate::Replace(cookie)))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        parse(comparator, pattern).map(|_| ())
    }
}
