#![no_main]
use dsacl::policy::{PolicySource, Right};
use dsacl::{AccessControl, AuthContext, Subject};
use libfuzzer_sys::fuzz_target;

// Arbitrary policy documents must either be rejected or evaluate to a decision
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(policy) = PolicySource::from_json(text) else {
        return;
    };
    let Ok(acl) = AccessControl::new(policy) else {
        return;
    };

    let subject = Subject::user("uid=fuzz,o=example").with_group("admins");
    let auth = AuthContext::new();
    for resource in ["/", "/secret", "/people/alice/mail"] {
        let cached = acl.evaluate(resource, Right::Read, &subject, &auth);
        let uncached = acl.evaluate_uncached(resource, Right::Read, &subject, &auth);
        assert_eq!(cached, uncached);
    }
});
