//! Built-in evaluators
//!
//! | name         | checks                                     |
//! |--------------|--------------------------------------------|
//! | `group`      | subject group membership                   |
//! | `userdn`     | bind DN, `anyone` / `all` / `self` / `parent` |
//! | `ip`         | client address (wildcards, CIDR)           |
//! | `dns`        | client host name                           |
//! | `timeofday`  | local wall-clock time                      |
//! | `dayofweek`  | local weekday                              |
//! | `authmethod` | bind method                                |
//! | `ssf`        | connection security strength factor        |
//! | `roledn`     | roles listed in the subject's `nsrole`     |
//! | `userattr`   | `attr#value` pairs on the subject          |

mod authmethod;
mod dayofweek;
mod dns;
mod group;
mod ip;
mod roledn;
mod ssf;
mod timeofday;
mod userattr;
mod userdn;

pub use authmethod::AuthMethodEvaluator;
pub use dayofweek::DayOfWeekEvaluator;
pub use dns::DnsEvaluator;
pub use group::GroupEvaluator;
pub use ip::IpEvaluator;
pub use roledn::{RoleDnEvaluator, ROLE_ATTRIBUTE};
pub use ssf::SsfEvaluator;
pub use timeofday::TimeOfDayEvaluator;
pub use userattr::UserAttrEvaluator;
pub use userdn::UserDnEvaluator;

use super::Evaluator;
use std::sync::Arc;

/// Every built-in evaluator with its registry name
pub fn all() -> Vec<(&'static str, Arc<dyn Evaluator>)> {
    vec![
        ("group", Arc::new(GroupEvaluator)),
        ("userdn", Arc::new(UserDnEvaluator)),
        ("ip", Arc::new(IpEvaluator)),
        ("dns", Arc::new(DnsEvaluator)),
        ("timeofday", Arc::new(TimeOfDayEvaluator)),
        ("dayofweek", Arc::new(DayOfWeekEvaluator)),
        ("authmethod", Arc::new(AuthMethodEvaluator)),
        ("ssf", Arc::new(SsfEvaluator)),
        ("roledn", Arc::new(RoleDnEvaluator)),
        ("userattr", Arc::new(UserAttrEvaluator)),
    ]
}

/// Strip an `ldap:///` URL prefix
pub(crate) fn strip_ldap_url(value: &str) -> &str {
    let trimmed = value.trim();
    match trimmed.get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case("ldap:///") => &trimmed[8..],
        _ => trimmed,
    }
}
