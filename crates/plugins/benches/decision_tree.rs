//! Benchmarks for decision tree evaluation
//!
//! Run with: cargo bench --package plugins

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use framework::{CycleState, Filter, LlmRequest, Pod, PodInfo, PodMetrics, SchedulingContext};
use plugins::{PluginFactoryRegistry, SchedulerConfig, instantiate_plugins};
use std::sync::Arc;

const SAMPLE_CONFIG: &str = include_str!("../../../config/scheduler.json");

fn load_tree() -> Arc<dyn Filter> {
    let config = SchedulerConfig::from_json_str(SAMPLE_CONFIG).expect("Failed to parse config");
    let registry = instantiate_plugins(&config, &PluginFactoryRegistry::with_defaults())
        .expect("Failed to instantiate plugins");
    registry.filter("low-latency").expect("Missing low-latency tree")
}

/// A fleet with a mix of queue depths and loaded adapters
fn synthetic_pods(count: usize) -> Vec<Pod> {
    (0..count)
        .map(|i| {
            let adapter = if i % 3 == 0 { "sql-lora" } else { "tweet-lora" };
            Pod::new(
                PodInfo::new(format!("vllm-{i}")),
                PodMetrics {
                    waiting_queue_size: (i * 7) % 40,
                    kv_cache_usage_percent: (i % 10) as f64 / 10.0,
                    active_models: [adapter.to_string()].into_iter().collect(),
                    max_active_models: 2,
                },
            )
        })
        .collect()
}

fn bench_decision_tree(c: &mut Criterion) {
    let tree = load_tree();
    let request = LlmRequest::new("bench", "sql-lora");
    let ctx = SchedulingContext::new();

    for count in [8, 64, 512] {
        let pods = synthetic_pods(count);
        c.bench_function(&format!("decision_tree_{count}_pods"), |b| {
            b.iter(|| {
                let mut state = CycleState::new();
                let survivors = tree.filter(&ctx, &mut state, black_box(&request), black_box(&pods));
                black_box(survivors)
            })
        });
    }
}

fn bench_build_from_config(c: &mut Criterion) {
    let config = SchedulerConfig::from_json_str(SAMPLE_CONFIG).expect("Failed to parse config");
    let factories = PluginFactoryRegistry::with_defaults();

    c.bench_function("instantiate_plugins", |b| {
        b.iter(|| {
            let registry = instantiate_plugins(black_box(&config), &factories).unwrap();
            black_box(registry)
        })
    });
}

criterion_group!(benches, bench_decision_tree, bench_build_from_config);
criterion_main!(benches);
