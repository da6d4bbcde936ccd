//! `dayofweek` evaluator
//!
//! Pattern: comma-separated day names (`sun`..`sat`, full names accepted).
//! Never cacheable.

use crate::error::Result;
use crate::las::{require_membership, split_list, Capabilities, EvalCall, EvalOutcome, Evaluator};
use crate::policy::Comparator;
use chrono::{Datelike, Weekday};

#[derive(Debug, Default, Clone, Copy)]
pub struct DayOfWeekEvaluator;

fn parse_day(name: &str) -> std::result::Result<Weekday, String> {
    match name.to_ascii_lowercase().as_str() {
        "sun" | "sunday" => Ok(Weekday::Sun),
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        other => Err(format!("unknown day '{}'", other)),
    }
}

fn parse(pattern: &str) -> std::result::Result<Vec<Weekday>, String> {
    let days = split_list(pattern, ",")
        .map(parse_day)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if days.is_empty() {
        return Err("empty day list".to_string());
    }
    Ok(days)
}

impl Evaluator for DayOfWeekEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, caps: &Capabilities) -> Result<EvalOutcome> {
        let days = parse(call.pattern).map_err(|e| call.failure(e))?;
        let today = caps.clock.now().weekday();
        let verdict = call.membership(days.contains(&today))?;
        Ok(EvalOutcome::new(verdict).not_cacheable())
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        require_membership(comparator)?;
        parse(pattern).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::las::builtin::testing::call;
    use crate::las::{Cacheability, FixedClock, Verdict};
    use crate::request::{AuthContext, Subject};
    use chrono::NaiveDate;
    use std::sync::Arc;

    #[test]
    fn test_weekdays() {
        // 2024-06-01 is a Saturday
        let saturday = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let caps = Capabilities::new().with_clock(Arc::new(FixedClock::new(saturday)));
        let run = |cmp, pattern| {
            call(
                &DayOfWeekEvaluator,
                "dayofweek",
                cmp,
                pattern,
                &Subject::anonymous(),
                &AuthContext::new(),
                &caps,
            )
            .unwrap()
        };

        let weekend = run(Comparator::In, "sat, Sunday");
        assert_eq!(weekend.verdict, Verdict::True);
        assert_eq!(weekend.cacheability, Cacheability::NotCacheable);
        assert_eq!(run(Comparator::Eq, "mon,tue,wed,thu,fri").verdict, Verdict::False);
        assert_eq!(run(Comparator::Ne, "mon,tue,wed,thu,fri").verdict, Verdict::True);
    }

    #[test]
    fn test_validate() {
        assert!(DayOfWeekEvaluator.validate(Comparator::Eq, "mon,fri").is_ok());
        assert!(DayOfWeekEvaluator.validate(Comparator::Eq, "funday").is_err());
        assert!(DayOfWeekEvaluator.validate(Comparator::Lt, "mon").is_err());
    }
}
