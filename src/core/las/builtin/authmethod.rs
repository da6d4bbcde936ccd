//! `authmethod` evaluator: comma-separated `none`, `simple`, `ssl`, `sasl`

use crate::error::Result;
use crate::las::{require_membership, split_list, Capabilities, EvalCall, EvalOutcome, Evaluator};
use crate::policy::Comparator;
use crate::request::AuthMethod;

#[derive(Debug, Default, Clone, Copy)]
pub struct AuthMethodEvaluator;

fn parse(pattern: &str) -> std::result::Result<Vec<AuthMethod>, String> {
    let methods = split_list(pattern, ",")
        .map(str::parse::<AuthMethod>)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if methods.is_empty() {
        return Err("empty method list".to_string());
    }
    Ok(methods)
}

impl Evaluator for AuthMethodEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, _caps: &Capabilities) -> Result<EvalOutcome> {
        let methods = parse(call.pattern).map_err(|e| call.failure(e))?;
        let matched = methods.contains(&call.auth.method);
        Ok(EvalOutcome::new(call.membership(matched)?))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        require_membership(comparator)?;
        parse(pattern).map(|_| ())
    }
}
