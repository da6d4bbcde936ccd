#![no_main]
use arbitrary::Arbitrary;
use dsacl::policy::{Ace, Acl, Comparator, Expr, PolicySource, Right};
use dsacl::{AccessControl, AuthContext, Subject};
use libfuzzer_sys::fuzz_target;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::OnceLock;

#[derive(Arbitrary, Debug)]
struct Input {
    resource: String,
    dn: Option<String>,
    groups: Vec<String>,
    ip: [u8; 4],
    ssf: u32,
    right: u8,
}

fn acl() -> &'static AccessControl {
    static ACL: OnceLock<AccessControl> = OnceLock::new();
    ACL.get_or_init(|| {
        let policy = PolicySource::new().with_acl(
            Acl::new("fuzz")
                .with_entry(Ace::allow("/people/*", Expr::term("userdn", Comparator::Eq, "self")))
                .with_entry(Ace::deny("/**", Expr::term("ip", Comparator::Ne, "10.0.0.0/8")))
                .with_entry(Ace::allow(
                    "/**",
                    Expr::or(vec![
                        Expr::term("group", Comparator::Eq, "admins || *ops"),
                        Expr::term("ssf", Comparator::Ge, "128"),
                    ]),
                )),
        );
        match AccessControl::new(policy) {
            Ok(acl) => acl,
            Err(e) => panic!("fuzz policy rejected: {}", e),
        }
    })
}

// Malformed request data must never panic and the cache must stay transparent
fuzz_target!(|input: Input| {
    let subject = match input.dn {
        Some(dn) => Subject::user(dn),
        None => Subject::anonymous(),
    }
    .with_groups(input.groups);
    let [a, b, c, d] = input.ip;
    let auth = AuthContext::new()
        .with_ip(IpAddr::V4(Ipv4Addr::new(a, b, c, d)))
        .with_ssf(input.ssf);
    let right = Right::CONCRETE[input.right as usize % Right::CONCRETE.len()];

    let acl = acl();
    let cached = acl.evaluate(&input.resource, right, &subject, &auth);
    let uncached = acl.evaluate_uncached(&input.resource, right, &subject, &auth);
    assert_eq!(cached, uncached);
});
