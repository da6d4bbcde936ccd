//! `dns` evaluator
//!
//! Pattern: comma-separated host names with `*` wildcards. The host name
//! comes from the auth context, or from the resolver when the front end
//! did not supply one; with neither the evaluation fails.

use crate::error::Result;
use crate::las::{
    require_membership, split_list, Capabilities, EvalCall, EvalOutcome, Evaluator, Wildcard,
};
use crate::policy::Comparator;

#[derive(Debug, Default, Clone, Copy)]
pub struct DnsEvaluator;

fn parse(pattern: &str) -> std::result::Result<Vec<Wildcard>, String> {
    let hosts = split_list(pattern, ",")
        .map(|host| Wildcard::new(host.trim_end_matches('.')).map_err(|e| e.to_string()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if hosts.is_empty() {
        return Err("empty host list".to_string());
    }
    Ok(hosts)
}

fn client_host(call: &EvalCall<'_>, caps: &Capabilities) -> Result<String> {
    if let Some(host) = &call.auth.client_dns {
        return Ok(host.clone());
    }
    let ip = call
        .auth
        .client_ip
        .ok_or_else(|| call.failure("client host name unknown"))?;
    caps.dns
        .reverse(ip)?
        .ok_or_else(|| call.failure(format!("no host name for {}", ip)))
}

impl Evaluator for DnsEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, caps: &Capabilities) -> Result<EvalOutcome> {
        let host = client_host(call, caps)?;
        let host = host.trim_end_matches('.');
        let (hosts, update) = call.reuse_or(|| parse(call.pattern).map_err(|e| call.failure(e)))?;

        let matched = hosts.iter().any(|h| h.is_match(host));
        Ok(EvalOutcome::new(call.membership(matched)?).with_cookie(update))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        require_membership(comparator)?;
        parse(pattern).map(|_| ())
    }
}
