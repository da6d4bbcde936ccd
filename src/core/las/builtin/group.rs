//! `group` evaluator
//!
//! Pattern: `||`-separated group names (an `ldap:///` prefix is allowed).
//! `*` alone matches any subject; other `*` patterns match the subject's
//! own group list. Literal groups are also resolved through the group
//! directory, once per generation, and kept in the cookie.

use super::strip_ldap_url;
use crate::error::Result;
use crate::las::{
    require_membership, split_list, Capabilities, Cookie, EvalCall, EvalOutcome, Evaluator,
    Wildcard,
};
use crate::policy::Comparator;
use crate::request::Subject;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct GroupEvaluator;

enum GroupPattern {
    Anyone,
    Name(String),
    Glob(Wildcard),
}

struct GroupState {
    patterns: Vec<GroupPattern>,
    /// Resolved member DNs per literal group
    members: HashMap<String, HashSet<String>>,
}

impl GroupState {
    fn matches(&self, subject: &Subject) -> bool {
        let dn = subject.normalized_dn();
        self.patterns.iter().any(|pattern| match pattern {
            GroupPattern::Anyone => true,
            GroupPattern::Name(name) => {
                subject.groups.iter().any(|g| g.eq_ignore_ascii_case(name))
                    || match (&dn, self.members.get(name)) {
                        (Some(dn), Some(members)) => members.contains(dn),
                        _ => false,
                    }
            }
            GroupPattern::Glob(glob) => subject.groups.iter().any(|g| glob.is_match(g)),
        })
    }
}

fn parse(pattern: &str) -> std::result::Result<Vec<GroupPattern>, String> {
    let mut patterns = Vec::new();
    for item in split_list(pattern, "||") {
        let name = strip_ldap_url(item);
        let parsed = if name == "*" {
            GroupPattern::Anyone
        } else if name.contains('*') {
            GroupPattern::Glob(Wildcard::new(name).map_err(|e| e.to_string())?)
        } else {
            GroupPattern::Name(name.to_lowercase())
        };
        patterns.push(parsed);
    }
    if patterns.is_empty() {
        return Err("empty group list".to_string());
    }
    Ok(patterns)
}

impl Evaluator for GroupEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, caps: &Capabilities) -> Result<EvalOutcome> {
        let (state, update) = call.reuse_or(|| {
            let patterns = parse(call.pattern).map_err(|e| call.failure(e))?;
            let mut members = HashMap::new();
            if let Some(directory) = &caps.groups {
                for pattern in &patterns {
                    if let GroupPattern::Name(name) = pattern {
                        if let Some(set) = directory.members(name)? {
                            members.insert(name.clone(), set);
                        }
                    }
                }
            }
            Ok(GroupState { patterns, members })
        })?;

        let verdict = call.membership(state.matches(call.subject))?;
        Ok(EvalOutcome::new(verdict).with_cookie(update))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        require_membership(comparator)?;
        parse(pattern).map(|_| ())
    }

    fn flush(&self, cookie: &Cookie) {
        if let Some(state) = cookie.downcast_ref::<GroupState>() {
            debug!("Released {} resolved group(s)", state.members.len());
        }
    }
}
