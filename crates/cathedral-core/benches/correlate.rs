//! Correlation and healing-need search over a full-size codex.
//!
//! Run with: cargo bench --bench correlate

use cathedral_core::constants::*;
use cathedral_core::{Controller, Mode, StaticSource};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};

const ELEMENTS: &[&str] = &["Air", "Water", "Earth", "Fire"];
const SOUNDS: &[&str] = &["396Hz", "417Hz", "528Hz", "639Hz", "741Hz", "852Hz"];

fn codex(nodes: u32) -> Value {
    let nodes: Vec<Value> = (1..=nodes)
        .map(|id| {
            json!({
                "node_id": id,
                "name": format!("Node {id}"),
                "element": ELEMENTS[id as usize % ELEMENTS.len()],
                "sound": SOUNDS[id as usize % SOUNDS.len()],
                "teaching_function": if id % 7 == 0 { "softens anxiety" } else { "opens a door" },
            })
        })
        .collect();
    json!({ "nodes": nodes })
}

fn angels() -> Value {
    let angels: Vec<Value> = (1..=ANGEL_CYCLE)
        .map(|n| {
            json!({
                "number": n,
                "name": format!("Angel {n}"),
                "element": ELEMENTS[n as usize % ELEMENTS.len()],
                "toneHz": 396 + (n % 6) * 50,
            })
        })
        .collect();
    json!({ "angels": angels })
}

fn controller(nodes: u32) -> Controller {
    let source = StaticSource::new()
        .with(CODEX_NODES, codex(nodes))
        .with(ANGELS_72, angels())
        .with(
            ALCHEMY_OPERATIONS,
            json!({ "operations": [{ "key": "separation", "element": "Air" }] }),
        );
    let mut c = Controller::default();
    c.load_datasets(&source);
    c.apply_mode_with(Mode::Advanced, &|_: &str| true);
    c
}

fn bench_get_node(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_node");
    for nodes in [CODEX_CYCLE, 1_000] {
        let controller = controller(nodes);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &nodes, |b, &n| {
            b.iter(|| black_box(controller.get_node(black_box(n / 2), true)));
        });
    }
    group.finish();
}

fn bench_correlations(c: &mut Criterion) {
    let controller = controller(CODEX_CYCLE);
    c.bench_function("correlate_active", |b| {
        b.iter(|| black_box(controller.get_correlations(black_box(42), None)));
    });
}

fn bench_search(c: &mut Criterion) {
    let controller = controller(CODEX_CYCLE);
    c.bench_function("search_by_healing", |b| {
        b.iter(|| black_box(controller.search_by_healing(black_box("anxiety"))));
    });
}

criterion_group!(benches, bench_get_node, bench_correlations, bench_search);
criterion_main!(benches);
