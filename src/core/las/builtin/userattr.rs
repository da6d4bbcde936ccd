//! `userattr` evaluator
//!
//! Pattern: `||`-separated `attr#value` pairs. A pair matches when the
//! subject's `attr` holds `value`, compared case-insensitively (as DNs when
//! the value contains `=`).
//!
//! The `USERDN`, `GROUPDN`, `ROLEDN` and `LDAPURL` value kinds compare
//! against attributes of the target entry and are rejected when the policy
//! is bound.

use crate::error::Result;
use crate::las::{require_membership, split_list, Capabilities, EvalCall, EvalOutcome, Evaluator};
use crate::policy::Comparator;
use crate::request::{normalize_dn, Subject};

const ENTRY_KINDS: [&str; 4] = ["userdn", "groupdn", "roledn", "ldapurl"];

#[derive(Debug, Default, Clone, Copy)]
pub struct UserAttrEvaluator;

struct AttrValue {
    attribute: String,
    value: String,
}

fn canonical(value: &str) -> String {
    if value.contains('=') {
        normalize_dn(value)
    } else {
        value.trim().to_lowercase()
    }
}

fn parse(pattern: &str) -> std::result::Result<Vec<AttrValue>, String> {
    let mut pairs = Vec::new();
    for item in split_list(pattern, "||") {
        let (attribute, value) = item
            .split_once('#')
            .ok_or_else(|| format!("'{}' is not of the form attr#value", item))?;
        let (attribute, value) = (attribute.trim(), value.trim());
        if attribute.is_empty() || value.is_empty() {
            return Err(format!("'{}' is not of the form attr#value", item));
        }
        if ENTRY_KINDS
            .iter()
            .any(|kind| value.eq_ignore_ascii_case(kind))
        {
            return Err(format!(
                "'{}' needs target entry attributes, which requests do not carry",
                value
            ));
        }
        pairs.push(AttrValue {
            attribute: attribute.to_ascii_lowercase(),
            value: canonical(value),
        });
    }
    if pairs.is_empty() {
        return Err("empty attribute list".to_string());
    }
    Ok(pairs)
}

fn matches(pairs: &[AttrValue], subject: &Subject) -> bool {
    pairs.iter().any(|pair| {
        subject
            .attribute(&pair.attribute)
            .iter()
            .any(|held| canonical(held) == pair.value)
    })
}

impl Evaluator for UserAttrEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, _caps: &Capabilities) -> Result<EvalOutcome> {
        let (pairs, update) =
            call.reuse_or(|| parse(call.pattern).map_err(|e| call.failure(e)))?;
        let verdict = call.membership(matches(&pairs, call.subject))?;
        Ok(EvalOutcome::new(verdict).with_cookie(update))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        require_membership(comparator)?;
        parse(pattern).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;
    use crate::las::builtin::testing::call;
    use crate::las::Verdict;
    use crate::request::AuthContext;

    fn run(comparator: Comparator, pattern: &str, subject: &Subject) -> Result<EvalOutcome> {
        call(
            &UserAttrEvaluator,
            "userattr",
            comparator,
            pattern,
            subject,
            &AuthContext::new(),
            &Capabilities::default(),
        )
    }

    #[test]
    fn test_attribute_value_match() {
        let carol = Subject::user("uid=carol,o=x")
            .with_attribute("ou", "Directory Server")
            .with_attribute("manager", "UID=Bob, o=x");

        let verdict = |pattern: &str| run(Comparator::Eq, pattern, &carol).unwrap().verdict;
        assert_eq!(verdict("ou#directory server"), Verdict::True);
        assert_eq!(verdict("OU#Directory Server"), Verdict::True);
        assert_eq!(verdict("manager#uid=bob,o=x"), Verdict::True);
        assert_eq!(verdict("ou#Sales || manager#uid=alice,o=x"), Verdict::False);
        assert_eq!(verdict("title#Engineer"), Verdict::False);

        assert_eq!(
            run(Comparator::Ne, "ou#Sales", &carol).unwrap().verdict,
            Verdict::True
        );
    }

    #[test]
    fn test_malformed_pattern_fails_at_call() {
        let result = run(Comparator::Eq, "ou", &Subject::anonymous());
        assert!(matches!(
            result,
            Err(PolicyError::EvaluatorFailure { attribute, .. }) if attribute == "userattr"
        ));
    }

    #[test]
    fn test_validate() {
        assert!(UserAttrEvaluator.validate(Comparator::Eq, "ou#Sales").is_ok());
        assert!(UserAttrEvaluator.validate(Comparator::Eq, "ou").is_err());
        assert!(UserAttrEvaluator.validate(Comparator::Eq, "#Sales").is_err());
        assert!(UserAttrEvaluator.validate(Comparator::Eq, "ou#").is_err());
        assert!(UserAttrEvaluator.validate(Comparator::Eq, "manager#USERDN").is_err());
        assert!(UserAttrEvaluator.validate(Comparator::Le, "ou#Sales").is_err());
    }
}
