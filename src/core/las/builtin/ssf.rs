//! `ssf` evaluator
//!
//! Compares the connection's security strength factor with an unsigned
//! integer. `in` takes a comma-separated list.

use crate::error::Result;
use crate::las::{split_list, Capabilities, EvalCall, EvalOutcome, Evaluator, Verdict};
use crate::policy::Comparator;

#[derive(Debug, Default, Clone, Copy)]
pub struct SsfEvaluator;

fn parse(comparator: Comparator, pattern: &str) -> std::result::Result<Vec<u32>, String> {
    let values = split_list(pattern, ",")
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| format!("'{}' is not an unsigned integer", v))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    match (comparator, values.len()) {
        (_, 0) => Err("missing strength factor".to_string()),
        (Comparator::In, _) | (_, 1) => Ok(values),
        _ => Err(format!("comparator '{}' takes a single value", comparator)),
    }
}

fn decide(comparator: Comparator, values: &[u32], ssf: u32) -> bool {
    let first = values.first().copied().unwrap_or_default();
    match comparator {
        Comparator::In => values.contains(&ssf),
        Comparator::Eq => ssf == first,
        Comparator::Ne => ssf != first,
        Comparator::Lt => ssf < first,
        Comparator::Le => ssf <= first,
        Comparator::Gt => ssf > first,
        Comparator::Ge => ssf >= first,
    }
}

impl Evaluator for SsfEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, _caps: &Capabilities) -> Result<EvalOutcome> {
        let values = parse(call.comparator, call.pattern).map_err(|e| call.failure(e))?;
        let matched = decide(call.comparator, &values, call.auth.ssf);
        Ok(EvalOutcome::new(Verdict::from(matched)))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        parse(comparator, pattern).map(|_| ())
    }
}
