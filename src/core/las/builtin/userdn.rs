//! `userdn` evaluator
//!
//! Pattern: `||`-separated `ldap:///` DNs or keywords:
//! - `anyone` - every subject, including anonymous
//! - `all` - any authenticated subject
//! - `self` - the subject is the target entry
//! - `parent` - the subject is the target entry's parent
//!
//! DNs may contain `*` wildcards. `self` and `parent` read the resource
//! identifier as a DN.

use super::strip_ldap_url;
use crate::error::Result;
use crate::las::{
    require_membership, split_list, Capabilities, EvalCall, EvalOutcome, Evaluator, Wildcard,
};
use crate::policy::Comparator;
use crate::request::{normalize_dn, parent_dn};

#[derive(Debug, Default, Clone, Copy)]
pub struct UserDnEvaluator;

enum UserPattern {
    Anyone,
    All,
    SelfEntry,
    Parent,
    Dn(String),
    Glob(Wildcard),
}

fn parse(pattern: &str) -> std::result::Result<Vec<UserPattern>, String> {
    let mut patterns = Vec::new();
    for item in split_list(pattern, "||") {
        let value = strip_ldap_url(item);
        let parsed = match value.to_ascii_lowercase().as_str() {
            "anyone" => UserPattern::Anyone,
            "all" => UserPattern::All,
            "self" => UserPattern::SelfEntry,
            "parent" => UserPattern::Parent,
            _ if value.contains('*') => {
                UserPattern::Glob(Wildcard::new(&normalize_dn(value)).map_err(|e| e.to_string())?)
            }
            _ if value.contains('=') => UserPattern::Dn(normalize_dn(value)),
            _ => return Err(format!("'{}' is neither a DN nor a keyword", value)),
        };
        patterns.push(parsed);
    }
    if patterns.is_empty() {
        return Err("empty user list".to_string());
    }
    Ok(patterns)
}

fn matches(patterns: &[UserPattern], dn: Option<&str>, resource: &str) -> bool {
    let target = normalize_dn(resource);
    patterns.iter().any(|pattern| match (pattern, dn) {
        (UserPattern::Anyone, _) => true,
        (_, None) => false,
        (UserPattern::All, Some(_)) => true,
        (UserPattern::SelfEntry, Some(dn)) => dn == target,
        (UserPattern::Parent, Some(dn)) => parent_dn(&target) == Some(dn),
        (UserPattern::Dn(expected), Some(dn)) => dn == expected.as_str(),
        (UserPattern::Glob(glob), Some(dn)) => glob.is_match(dn),
    })
}

impl Evaluator for UserDnEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, _caps: &Capabilities) -> Result<EvalOutcome> {
        let (patterns, update) =
            call.reuse_or(|| parse(call.pattern).map_err(|e| call.failure(e)))?;

        let dn = call.subject.normalized_dn();
        let matched = matches(&patterns, dn.as_deref(), call.resource);
        Ok(EvalOutcome::new(call.membership(matched)?).with_cookie(update))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        require_membership(comparator)?;
        parse(pattern).map(|_| ())
    }
}
