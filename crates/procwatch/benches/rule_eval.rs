//! Rule evaluation benchmarks.
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use procwatch::{ActionRegistry, Line, RuleEngine, RuleSpec};

fn engine_with_rules(rule_count: usize) -> RuleEngine {
    let registry = ActionRegistry::with_builtins();
    let mut engine = RuleEngine::new(registry);
    for i in 0..rule_count {
        engine
            .register(&RuleSpec::new(format!("^PATTERN{i}"), "log"))
            .unwrap();
    }
    engine
        .register(&RuleSpec::new("^ERROR", "log").remove(r"\d+"))
        .unwrap();
    engine
}

fn bench_non_matching_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = engine_with_rules(0);
    let line = Line::from("INFO everything is fine\n");

    c.bench_function("evaluate_non_matching", |b| {
        b.iter(|| rt.block_on(engine.evaluate(black_box(&line))));
    });
}

fn bench_matching_line_with_removal(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = engine_with_rules(0);
    let line = Line::from("ERROR 404 not found\n");

    c.bench_function("evaluate_matching_with_removal", |b| {
        b.iter(|| rt.block_on(engine.evaluate(black_box(&line))));
    });
}

fn bench_rule_set_sizes(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("rule_set_size");

    for size in &[2usize, 5, 10, 20] {
        let engine = engine_with_rules(*size);
        let line = Line::from("ERROR 500 internal\n");

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| rt.block_on(engine.evaluate(black_box(&line))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_non_matching_line,
    bench_matching_line_with_removal,
    bench_rule_set_sizes
);
criterion_main!(benches);
