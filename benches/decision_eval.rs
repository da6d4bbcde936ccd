use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dsacl::policy::{Ace, Acl, Comparator, Expr, PolicySource, Right};
use dsacl::{AccessControl, AuthContext, AuthMethod, Subject};

/// Create a policy with several ACLs and mixed evaluators
fn create_complex_policy() -> PolicySource {
    PolicySource::new()
        .with_acl(
            Acl::new("public").with_entry(
                Ace::allow("/public/**", Expr::term("userdn", Comparator::Eq, "anyone"))
                    .with_rights([Right::Read, Right::Search]),
            ),
        )
        .with_acl(
            Acl::new("people")
                .with_entry(Ace::allow(
                    "/people/*",
                    Expr::term("userdn", Comparator::Eq, "self"),
                ))
                .with_entry(Ace::deny(
                    "/people/**",
                    Expr::term("ip", Comparator::Ne, "10.0.0.0/8"),
                ))
                .with_entry(Ace::allow(
                    "/people/**",
                    Expr::and(vec![
                        Expr::term("group", Comparator::Eq, "hr || admins"),
                        Expr::term("ssf", Comparator::Ge, "128"),
                        Expr::term("authmethod", Comparator::Eq, "sasl"),
                    ]),
                )),
        )
        .with_acl(Acl::new("system").with_entry(Ace::deny("/system/**", Expr::always())))
}

fn subject() -> Subject {
    Subject::user("uid=alice,ou=people,o=example").with_group("hr")
}

fn auth() -> AuthContext {
    AuthContext::new()
        .with_ip("10.1.2.3".parse().unwrap())
        .with_ssf(256)
        .with_method(AuthMethod::Sasl)
}

/// Benchmark evaluation with cache (hot path)
fn bench_decision_cached(c: &mut Criterion) {
    let eval_counts = vec![100, 1_000, 10_000];

    let mut group = c.benchmark_group("decision_cached");

    for count in eval_counts {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let acl = AccessControl::new(create_complex_policy()).unwrap();
            let subject = subject();
            let auth = auth();

            b.iter(|| {
                // Repeatedly evaluate the same request (should hit cache)
                for _ in 0..count {
                    let decision = acl.evaluate("/people/bob", Right::Write, &subject, &auth);
                    black_box(decision);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark evaluation without cache (cold path)
fn bench_decision_uncached(c: &mut Criterion) {
    let eval_counts = vec![100, 1_000, 5_000];

    let mut group = c.benchmark_group("decision_uncached");

    for count in eval_counts {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let acl = AccessControl::new(create_complex_policy()).unwrap();
            let subject = subject();
            let auth = auth();

            b.iter(|| {
                for i in 0..count {
                    let resource = format!("/people/user{}", i);
                    let decision = acl.evaluate_uncached(&resource, Right::Write, &subject, &auth);
                    black_box(decision);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark a cold cache filling with distinct resources
fn bench_cache_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_fill");
    let count = 1_000;
    group.throughput(Throughput::Elements(count as u64));

    group.bench_function("distinct_resources", |b| {
        let subject = subject();
        let auth = auth();

        b.iter_with_setup(
            || AccessControl::new(create_complex_policy()).unwrap(),
            |acl| {
                for i in 0..count {
                    let resource = format!("/people/user{}", i);
                    black_box(acl.evaluate(&resource, Right::Read, &subject, &auth));
                }
            },
        );
    });

    group.finish();
}

/// Benchmark the effective-rights report
fn bench_effective_rights(c: &mut Criterion) {
    let acl = AccessControl::new(create_complex_policy()).unwrap();
    let subject = subject();
    let auth = auth();

    c.bench_function("effective_rights", |b| {
        b.iter(|| black_box(acl.effective_rights("/people/alice", &subject, &auth)));
    });
}

/// Benchmark generation build and publish
fn bench_reload(c: &mut Criterion) {
    let acl = AccessControl::new(create_complex_policy()).unwrap();

    c.bench_function("reload", |b| {
        b.iter(|| acl.reload(black_box(create_complex_policy())).unwrap());
    });
}

criterion_group!(
    benches,
    bench_decision_cached,
    bench_decision_uncached,
    bench_cache_fill,
    bench_effective_rights,
    bench_reload
);
criterion_main!(benches);
