//! `roledn` evaluator
//!
//! Pattern: `||`-separated `ldap:///` role DNs, or `anyone`. A subject
//! holds a role when the DN appears among its `nsrole` attribute values.
//! Anonymous subjects hold no roles.

use super::strip_ldap_url;
use crate::error::Result;
use crate::las::{require_membership, split_list, Capabilities, EvalCall, EvalOutcome, Evaluator};
use crate::policy::Comparator;
use crate::request::{normalize_dn, Subject};

/// Subject attribute listing the role DNs a subject holds
pub const ROLE_ATTRIBUTE: &str = "nsrole";

#[derive(Debug, Default, Clone, Copy)]
pub struct RoleDnEvaluator;

struct Roles {
    anyone: bool,
    dns: Vec<String>,
}

impl Roles {
    fn parse(pattern: &str) -> std::result::Result<Self, String> {
        let mut roles = Roles {
            anyone: false,
            dns: Vec::new(),
        };
        for item in split_list(pattern, "||") {
            let value = strip_ldap_url(item);
            if value.eq_ignore_ascii_case("anyone") {
                roles.anyone = true;
            } else if value.contains('=') {
                roles.dns.push(normalize_dn(value));
            } else {
                return Err(format!("'{}' is not a role DN", value));
            }
        }
        if !roles.anyone && roles.dns.is_empty() {
            return Err("empty role list".to_string());
        }
        Ok(roles)
    }

    fn held_by(&self, subject: &Subject) -> bool {
        if self.anyone {
            return true;
        }
        if subject.is_anonymous() {
            return false;
        }
        subject
            .attribute(ROLE_ATTRIBUTE)
            .iter()
            .map(|role| normalize_dn(role))
            .any(|role| self.dns.contains(&role))
    }
}

impl Evaluator for RoleDnEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, _caps: &Capabilities) -> Result<EvalOutcome> {
        let (roles, update) =
            call.reuse_or(|| Roles::parse(call.pattern).map_err(|e| call.failure(e)))?;
        let verdict = call.membership(roles.held_by(call.subject))?;
        Ok(EvalOutcome::new(verdict).with_cookie(update))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        require_membership(comparator)?;
        Roles::parse(pattern).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::las::builtin::testing::call;
    use crate::las::Verdict;
    use crate::request::AuthContext;

    fn check(comparator: Comparator, pattern: &str, subject: &Subject) -> Verdict {
        call(
            &RoleDnEvaluator,
            "roledn",
            comparator,
            pattern,
            subject,
            &AuthContext::new(),
            &Capabilities::default(),
        )
        .unwrap()
        .verdict
    }

    #[test]
    fn test_role_held() {
        let manager = Subject::user("uid=bob,o=x")
            .with_attribute("nsRole", "CN=Managers, o=x")
            .with_attribute("nsrole", "cn=staff,o=x");
        let plain = Subject::user("uid=eve,o=x");

        assert_eq!(
            check(Comparator::Eq, "ldap:///cn=managers,o=x", &manager),
            Verdict::True
        );
        assert_eq!(
            check(Comparator::Eq, "ldap:///cn=admins,o=x || ldap:///cn=staff,o=x", &manager),
            Verdict::True
        );
        assert_eq!(
            check(Comparator::Eq, "ldap:///cn=managers,o=x", &plain),
            Verdict::False
        );
        assert_eq!(
            check(Comparator::Ne, "ldap:///cn=managers,o=x", &plain),
            Verdict::True
        );
    }

    #[test]
    fn test_anonymous_holds_no_roles() {
        let anon = Subject::anonymous().with_attribute("nsrole", "cn=managers,o=x");
        assert_eq!(
            check(Comparator::Eq, "ldap:///cn=managers,o=x", &anon),
            Verdict::False
        );
        assert_eq!(check(Comparator::Eq, "ldap:///anyone", &anon), Verdict::True);
    }

    #[test]
    fn test_validate() {
        assert!(RoleDnEvaluator
            .validate(Comparator::Eq, "ldap:///cn=managers,o=x")
            .is_ok());
        assert!(RoleDnEvaluator.validate(Comparator::Eq, "managers").is_err());
        assert!(RoleDnEvaluator.validate(Comparator::Eq, " || ").is_err());
        assert!(RoleDnEvaluator
            .validate(Comparator::Gt, "ldap:///cn=managers,o=x")
            .is_err());
    }
}
