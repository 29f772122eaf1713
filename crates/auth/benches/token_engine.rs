use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use chrono::Utc;
use gatewarden_auth::{
    HttpMethod, Identity, RequestClassifier, TokenConfig, TokenEngine, TokenKind, TokenVerifier,
    PUBLIC_ENDPOINTS,
};
use gatewarden_core::UserId;

fn engine() -> TokenEngine {
    TokenEngine::new(TokenConfig::new("bench-secret-key-that-is-long-enough-for-hs256")).unwrap()
}

fn bench_token_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_lifecycle");
    let engine = engine();
    let identity = Identity::new(UserId::new("1").unwrap());

    group.bench_function("issue_access", |b| {
        b.iter(|| engine.issue(black_box(&identity), TokenKind::Access).unwrap());
    });

    group.bench_function("issue_pair", |b| {
        b.iter(|| engine.issue_pair(black_box(&identity)).unwrap());
    });

    let token = engine.issue(&identity, TokenKind::Access).unwrap();
    group.bench_function("verify_valid", |b| {
        let now = Utc::now();
        b.iter(|| engine.verify_at(black_box(&token), now).unwrap());
    });

    // Tampered signature: cost of the rejection path.
    let mut tampered = token.clone();
    tampered.pop();
    tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
    group.bench_function("verify_tampered", |b| {
        let now = Utc::now();
        b.iter(|| engine.verify_at(black_box(&tampered), now).unwrap_err());
    });

    group.finish();
}

fn bench_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");

    for rules in [1usize, 8, 64] {
        let mut builder = RequestClassifier::builder().allow_all(PUBLIC_ENDPOINTS.iter().copied());
        for i in 0..rules {
            builder = builder.allow(&format!("/public-{i}/**"));
        }
        let classifier = builder.require("/**").build().unwrap();

        group.bench_with_input(BenchmarkId::new("protected_path", rules), &classifier, |b, classifier| {
            b.iter(|| classifier.requires_authentication(black_box("/r/r1/detail"), &HttpMethod::Get));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_token_lifecycle, bench_classifier);
criterion_main!(benches);
