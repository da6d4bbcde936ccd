//! Integration tests across the decision core
//!
//! Tests the interaction between:
//! - Policy binding and the evaluator registry
//! - The decision walk and the per-generation cache
//! - Generation publication on reload
//! - Call-time capabilities (clock, group directory, DNS)

#[cfg(test)]
mod tests {
    use crate::las::{Capabilities, FixedClock, StaticDns, StaticGroups};
    use crate::policy::{Ace, Acl, Comparator, Expr, PolicySource, Right};
    use crate::{AccessControl, AuthContext, AuthMethod, Reason, Subject};
    use chrono::NaiveDate;
    use std::net::IpAddr;
    use std::sync::Arc;

    fn secret_policy() -> PolicySource {
        PolicySource::new().with_acl(
            Acl::new("secret")
                .with_entry(Ace::deny(
                    "/secret",
                    Expr::term("group", Comparator::Ne, "admins"),
                ))
                .with_entry(Ace::allow(
                    "/secret",
                    Expr::term("group", Comparator::Eq, "*"),
                )),
        )
    }

    #[test]
    fn test_secret_scenario_end_to_end() {
        let acl = AccessControl::new(secret_policy()).unwrap();
        let auth = AuthContext::new();
        let admin = Subject::user("uid=root,o=example").with_group("admins");
        let guest = Subject::user("uid=guest,o=example").with_group("guests");

        let allowed = acl.evaluate("/secret", Right::Read, &admin, &auth);
        assert_eq!(
            allowed.reason,
            Reason::AllowedBy {
                acl: "secret".to_string(),
                ace: 1
            }
        );

        let denied = acl.evaluate("/secret", Right::Read, &guest, &auth);
        assert_eq!(
            denied.reason,
            Reason::DeniedBy {
                acl: "secret".to_string(),
                ace: 0
            }
        );

        // Nothing is bound to other resources
        let other = acl.evaluate("/public", Right::Read, &admin, &auth);
        assert_eq!(other.reason, Reason::NoMatchingAcl);
    }

    #[test]
    fn test_dot_segments_cannot_escape_deny() {
        let policy = PolicySource::new().with_acl(
            Acl::new("p")
                .with_entry(Ace::deny("/secret/**", Expr::always()))
                .with_entry(Ace::allow("/public/**", Expr::always())),
        );
        let acl = AccessControl::new(policy).unwrap();
        let anon = Subject::anonymous();
        let auth = AuthContext::new();

        for resource in ["/public/../secret", "/public/./../secret/x", "/public/../../secret"] {
            let decision = acl.evaluate(resource, Right::Read, &anon, &auth);
            assert_eq!(
                decision.reason,
                Reason::DeniedBy {
                    acl: "p".to_string(),
                    ace: 0
                },
                "{}",
                resource
            );
        }
        assert!(acl
            .evaluate("/public/./readme", Right::Read, &anon, &auth)
            .is_allowed());
    }

    #[test]
    fn test_subject_attributes_drive_role_and_userattr() {
        let policy = PolicySource::new().with_acl(
            Acl::new("reports")
                .with_entry(Ace::allow(
                    "/reports/**",
                    Expr::term("roledn", Comparator::Eq, "ldap:///cn=auditors,o=example"),
                ))
                .with_entry(
                    Ace::allow(
                        "/reports/**",
                        Expr::term("userattr", Comparator::Eq, "ou#Finance"),
                    )
                    .with_rights([Right::Read]),
                ),
        );
        let acl = AccessControl::new(policy).unwrap();
        let auth = AuthContext::new();

        let auditor = Subject::user("uid=ann,o=example")
            .with_attribute("nsrole", "cn=Auditors, o=example");
        let finance = Subject::user("uid=fred,o=example").with_attribute("ou", "finance");
        let other = Subject::user("uid=olga,o=example").with_attribute("ou", "sales");

        assert!(acl.evaluate("/reports/q1", Right::Write, &auditor, &auth).is_allowed());
        assert!(acl.evaluate("/reports/q1", Right::Read, &finance, &auth).is_allowed());
        assert!(acl.evaluate("/reports/q1", Right::Write, &finance, &auth).is_denied());
        assert!(acl.evaluate("/reports/q1", Right::Read, &other, &auth).is_denied());

        // Different attributes never share a cached decision
        let promoted = other.clone().with_attribute("nsrole", "cn=auditors,o=example");
        assert!(acl.evaluate("/reports/q1", Right::Read, &promoted, &auth).is_allowed());

        let bad = PolicySource::new().with_acl(Acl::new("bad").with_entry(Ace::allow(
            "/**",
            Expr::term("userattr", Comparator::Eq, "manager#USERDN"),
        )));
        assert!(AccessControl::new(bad).is_err());
    }

    #[test]
    fn test_policy_json_workflow() {
        let json = r#"{
            "acls": [{
                "tag": "people",
                "entries": [
                    {
                        "effect": "allow",
                        "resource": "/people/**",
                        "rights": ["read", "search", "compare"],
                        "expr": {"term": {"attribute": "userdn", "comparator": "eq", "pattern": "anyone"}}
                    },
                    {
                        "effect": "allow",
                        "resource": "/people/**",
                        "rights": ["*"],
                        "expr": {"and": [
                            {"term": {"attribute": "ssf", "comparator": "ge", "pattern": "128"}},
                            {"term": {"attribute": "authmethod", "comparator": "eq", "pattern": "sasl"}}
                        ]}
                    }
                ]
            }]
        }"#;
        let acl = AccessControl::new(PolicySource::from_json(json).unwrap()).unwrap();
        let subject = Subject::user("uid=alice,ou=people,o=example");

        let plain = AuthContext::new().with_method(AuthMethod::Simple);
        assert!(acl
            .evaluate("/people/alice", Right::Read, &subject, &plain)
            .is_allowed());
        assert!(acl
            .evaluate("/people/alice", Right::Write, &subject, &plain)
            .is_denied());

        let strong = AuthContext::new()
            .with_method(AuthMethod::Sasl)
            .with_ssf(256);
        assert!(acl
            .evaluate("/people/alice", Right::Write, &subject, &strong)
            .is_allowed());
    }

    #[test]
    fn test_generation_held_across_reload() {
        let acl = AccessControl::new(secret_policy()).unwrap();
        let guest = Subject::user("uid=guest,o=example").with_group("guests");
        let auth = AuthContext::new();

        let before = acl.current();
        let open = PolicySource::new()
            .with_acl(Acl::new("open").with_entry(Ace::allow("/**", Expr::always())));
        acl.reload(open).unwrap();

        assert!(acl
            .evaluate_in(&before, "/secret", Right::Read, &guest, &auth)
            .is_denied());
        assert!(acl.evaluate("/secret", Right::Read, &guest, &auth).is_allowed());
        assert_eq!(before.id(), 1);
        assert_eq!(acl.current().id(), 2);
    }

    #[test]
    fn test_unreachable_directory_fails_closed() {
        let caps = Capabilities::new().with_groups(Arc::new(StaticGroups::new().offline()));
        let policy = PolicySource::new().with_acl(
            Acl::new("staff")
                .with_entry(Ace::allow(
                    "/staff/**",
                    Expr::term("group", Comparator::Eq, "staff"),
                ))
                .with_entry(Ace::allow("/staff/**", Expr::always())),
        );
        let acl = AccessControl::builder()
            .capabilities(caps)
            .policy(policy)
            .build()
            .unwrap();
        let subject = Subject::user("uid=bob,o=example");

        for _ in 0..2 {
            let decision = acl.evaluate("/staff/roster", Right::Read, &subject, &AuthContext::new());
            assert!(decision.is_failure());
            assert!(decision.is_denied());
        }

        let stats = acl.stats();
        assert_eq!(stats.evaluator_failure_count, 2);
        assert_eq!(stats.cache_hit_count, 0);
        assert_eq!(stats.cached_decisions, 0);
    }

    #[test]
    fn test_directory_membership_resolved_once_per_generation() {
        let groups = StaticGroups::new().with_group("staff", ["uid=bob,o=example"]);
        let caps = Capabilities::new().with_groups(Arc::new(groups));
        let policy = PolicySource::new().with_acl(Acl::new("staff").with_entry(Ace::allow(
            "/staff/**",
            Expr::term("group", Comparator::Eq, "staff"),
        )));
        let acl = AccessControl::builder()
            .capabilities(caps)
            .policy(policy)
            .build()
            .unwrap();
        let auth = AuthContext::new();

        let bob = Subject::user("uid=Bob, o=example");
        let eve = Subject::user("uid=eve,o=example");
        assert!(acl.evaluate("/staff/a", Right::Read, &bob, &auth).is_allowed());
        assert!(acl.evaluate("/staff/a", Right::Read, &eve, &auth).is_denied());
        assert_eq!(acl.current().cache().sizes().cookies, 1);
    }

    #[test]
    fn test_time_window_never_served_stale() {
        let at = |h, m| {
            NaiveDate::from_ymd_opt(2024, 3, 4)
                .and_then(|d| d.and_hms_opt(h, m, 0))
                .unwrap()
        };
        let clock = Arc::new(FixedClock::new(at(9, 0)));
        let caps = Capabilities::new().with_clock(clock.clone());
        let policy = PolicySource::new().with_acl(Acl::new("hours").with_entry(Ace::allow(
            "/reports/**",
            Expr::term("timeofday", Comparator::Eq, "0800-1700"),
        )));
        let acl = AccessControl::builder()
            .capabilities(caps)
            .policy(policy)
            .build()
            .unwrap();
        let subject = Subject::anonymous();
        let auth = AuthContext::new();

        assert!(acl.evaluate("/reports/q1", Right::Read, &subject, &auth).is_allowed());
        clock.set(at(18, 30));
        assert!(acl.evaluate("/reports/q1", Right::Read, &subject, &auth).is_denied());
        assert_eq!(acl.stats().cache_hit_count, 0);
    }

    #[test]
    fn test_network_context() {
        let ip: IpAddr = "10.1.2.3".parse().unwrap();
        let caps = Capabilities::new()
            .with_dns(Arc::new(StaticDns::new().with_name(ip, "build.corp.example.com")));
        let policy = PolicySource::new().with_acl(
            Acl::new("net")
                .with_entry(Ace::deny(
                    "/**",
                    Expr::not(Expr::term("ip", Comparator::Eq, "10.0.0.0/8")),
                ))
                .with_entry(Ace::allow(
                    "/**",
                    Expr::term("dns", Comparator::Eq, "*.corp.example.com"),
                )),
        );
        let acl = AccessControl::builder()
            .capabilities(caps)
            .policy(policy)
            .build()
            .unwrap();
        let subject = Subject::anonymous();

        let inside = AuthContext::new().with_ip(ip);
        assert!(acl.evaluate("/x", Right::Read, &subject, &inside).is_allowed());

        let outside = AuthContext::new().with_ip("192.168.1.1".parse().unwrap());
        let decision = acl.evaluate("/x", Right::Read, &subject, &outside);
        assert_eq!(
            decision.reason,
            Reason::DeniedBy {
                acl: "net".to_string(),
                ace: 0
            }
        );
    }

    #[test]
    fn test_effective_rights_report() {
        let policy = PolicySource::new().with_acl(
            Acl::new("docs")
                .with_entry(
                    Ace::deny("/docs/**", Expr::always()).with_rights([Right::Delete]),
                )
                .with_entry(
                    Ace::allow("/docs/**", Expr::term("userdn", Comparator::Eq, "all"))
                        .with_rights([Right::Read, Right::Write, Right::Delete]),
                ),
        );
        let acl = AccessControl::new(policy).unwrap();
        let rights = acl.effective_rights(
            "/docs/plan",
            &Subject::user("uid=carol,o=example"),
            &AuthContext::new(),
        );

        let allowed: Vec<Right> = rights
            .iter()
            .filter(|(_, d)| d.is_allowed())
            .map(|(r, _)| *r)
            .collect();
        assert_eq!(allowed, vec![Right::Read, Right::Write]);
        assert_eq!(rights.len(), Right::CONCRETE.len());
    }

    #[test]
    fn test_uncached_matches_cached() {
        let acl = AccessControl::new(secret_policy()).unwrap();
        let auth = AuthContext::new();
        let subjects = [
            Subject::user("uid=root,o=example").with_group("admins"),
            Subject::user("uid=guest,o=example").with_group("guests"),
            Subject::anonymous(),
        ];

        for subject in &subjects {
            let warm = acl.evaluate("/secret", Right::Read, subject, &auth);
            let again = acl.evaluate("/secret", Right::Read, subject, &auth);
            let cold = acl.evaluate_uncached("/secret", Right::Read, subject, &auth);
            assert_eq!(warm, again);
            assert_eq!(warm, cold);
        }
        assert_eq!(acl.stats().cache_hit_count, 3);
    }
}
