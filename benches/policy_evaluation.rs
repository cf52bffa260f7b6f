//! Policy Evaluation Benchmark (Criterion)
//!
//! Evaluates generated policy trees through the engine: linear scans with
//! first-applicable and deny-overrides, mapper dispatch, and cached lookups.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pdp_engine::config::Config;
use pdp_engine::core::{AttributeValue, Type};
use pdp_engine::expression::{Expression, FunctionRegistry};
use pdp_engine::policy::{CombiningAlgorithm, MapperAlgorithm, Policy, PolicySet, Rule, Target};
use pdp_engine::{PolicyEngine, Request};

fn equal(id: &str, value: &str) -> Target {
    let e = FunctionRegistry::builtin()
        .make(
            "equal",
            vec![
                Expression::designator(id, Type::String),
                AttributeValue::new_string(value).into(),
            ],
        )
        .unwrap();
    Target::matching(e)
}

/// One policy per tenant; only the last tenant's policy applies.
fn tenant_policies(count: usize, algorithm: CombiningAlgorithm) -> PolicySet {
    let mut root = PolicySet::builder("root").algorithm(algorithm);
    for i in 0..count {
        let tenant = format!("tenant-{}", i);
        let policy = Policy::builder(tenant.clone())
            .target(equal("tenant", &tenant))
            .algorithm(CombiningAlgorithm::DenyOverrides)
            .rule(Rule::deny("guests").with_target(equal("role", "guest")))
            .rule(Rule::permit("members").with_target(equal("role", "member")))
            .build()
            .unwrap();
        root = root.child(policy);
    }
    root.build().unwrap()
}

fn mapped_policies(count: usize) -> PolicySet {
    let mapper = MapperAlgorithm::new(Expression::designator("tenant", Type::String)).unwrap();
    let root = tenant_policies(count, CombiningAlgorithm::FirstApplicable);
    let mut builder = PolicySet::builder("root").algorithm(mapper);
    for child in root.policies() {
        builder = builder.child(child.as_ref().clone());
    }
    builder.build().unwrap()
}

fn no_cache() -> Config {
    let mut config = Config::default();
    config.cache.enabled = false;
    config
}

fn engine(root: PolicySet, config: Config) -> PolicyEngine {
    PolicyEngine::builder()
        .with_config(config)
        .with_telemetry_enabled(false)
        .with_policies(root, None)
        .build()
        .unwrap()
}

fn request(count: usize) -> Request {
    Request::builder()
        .attribute("tenant", format!("tenant-{}", count - 1))
        .attribute("role", "member")
        .build()
}

fn benchmark_policy_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_evaluation");

    for policy_count in [1, 10, 50, 200].iter() {
        let req = request(*policy_count);
        group.throughput(Throughput::Elements(1));

        for (name, algorithm) in [
            ("first_applicable", CombiningAlgorithm::FirstApplicable),
            ("deny_overrides", CombiningAlgorithm::DenyOverrides),
        ] {
            let e = engine(tenant_policies(*policy_count, algorithm), no_cache());
            group.bench_with_input(BenchmarkId::new(name, policy_count), &req, |b, req| {
                b.iter(|| std::hint::black_box(e.evaluate(req)));
            });
        }

        let e = engine(mapped_policies(*policy_count), no_cache());
        group.bench_with_input(BenchmarkId::new("mapper", policy_count), &req, |b, req| {
            b.iter(|| std::hint::black_box(e.evaluate(req)));
        });
    }

    group.finish();
}

fn benchmark_cached_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_evaluation");

    for policy_count in [10, 200].iter() {
        let e = engine(
            tenant_policies(*policy_count, CombiningAlgorithm::DenyOverrides),
            Config::default(),
        );
        let req = request(*policy_count);
        e.evaluate(&req);

        group.bench_with_input(BenchmarkId::new("hit", policy_count), &req, |b, req| {
            b.iter(|| std::hint::black_box(e.evaluate(req)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_policy_evaluation,
    benchmark_cached_evaluation
);

criterion_main!(benches);
