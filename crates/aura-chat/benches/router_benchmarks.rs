//! Benchmarks for keyword routing.
//!
//! Routing runs once per command, so it should stay well under a
//! microsecond even for intents that fall through the whole table.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use aura_chat::Router;
use aura_core::types::Intent;

fn bench_route(c: &mut Criterion) {
    let router = Router::default();
    let first = Intent::new("task", "add", json!({"description": "Finish report"}));
    let late = Intent::new("custom", "execute", json!({"name": "backup"}));
    let by_command = Intent::new("media", "volume up", json!({}));
    let fallback = Intent::new("smalltalk", "greet", json!({}));

    let mut group = c.benchmark_group("router");
    group.bench_function("first_rule", |b| b.iter(|| router.route(black_box(&first))));
    group.bench_function("last_rule", |b| b.iter(|| router.route(black_box(&late))));
    group.bench_function("command_match", |b| {
        b.iter(|| router.route(black_box(&by_command)))
    });
    group.bench_function("fallback", |b| b.iter(|| router.route(black_box(&fallback))));
    group.finish();
}

criterion_group!(benches, bench_route);
criterion_main!(benches);
