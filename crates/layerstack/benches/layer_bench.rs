//! Benchmarks for layer stack resolution and the move protocol.
//!
//! Run with: cargo bench -p layerstack

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use layerstack::{
    LayerConstraints, LayerItem, LayerPin, LayerStack, LayerStackConfig, LayoutRequest,
    MoveEndMethod, initial_positions, resolve,
};
use std::hint::black_box;

/// `n` layers with mixed widths, gaps and snapping points.
fn make_constraints(n: usize) -> Vec<LayerConstraints> {
    (0..n)
        .map(|i| {
            let width = 280.0 + (i % 4) as f64 * 40.0;
            let gap = 48.0 + (i % 3) as f64 * 8.0;
            let layer = LayerConstraints::new(width, gap);
            match i % 4 {
                0 => layer,
                1 => layer.with_point(i as f64 * 60.0, 0),
                2 => layer.with_point(i as f64 * 40.0, 120).with_point(i as f64 * 90.0, 10),
                _ => layer.expandable(),
            }
        })
        .collect()
}

fn make_stack(n: usize, total: f64) -> LayerStack {
    let mut stack = LayerStack::new(LayerStackConfig::default(), total);
    for i in 0..n {
        let item = LayerItem::new(280.0 + (i % 4) as f64 * 40.0)
            .with_snapping_point(i as f64 * 50.0, (i % 3) as i32 * 50);
        stack.push(item).expect("idle push");
    }
    stack
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("layerstack/resolve");

    for n in [2, 4, 8, 16, 32] {
        let layers = make_constraints(n);
        group.bench_with_input(BenchmarkId::new("free", n), &layers, |b, layers| {
            b.iter(|| black_box(resolve(&LayoutRequest::new(layers, 1024.0))))
        });
        group.bench_with_input(BenchmarkId::new("pinned_top", n), &layers, |b, layers| {
            let pin = Some(LayerPin {
                index: n - 1,
                position: 600.0,
            });
            b.iter(|| black_box(resolve(&LayoutRequest::new(layers, 1024.0).with_pin(pin))))
        });
        group.bench_with_input(BenchmarkId::new("initial_positions", n), &layers, |b, layers| {
            b.iter(|| black_box(initial_positions(layers, 1e-4)))
        });
    }

    group.finish();
}

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("layerstack/push_pop");

    for n in [4, 16] {
        group.bench_with_input(BenchmarkId::new("round_trip", n), &n, |b, &n| {
            b.iter_batched(
                || make_stack(n, 1024.0),
                |mut stack| {
                    stack.push(LayerItem::new(320.0)).expect("push");
                    black_box(stack.pop().expect("pop"))
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_set_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("layerstack/set_width");

    for n in [4, 16] {
        group.bench_with_input(BenchmarkId::new("sweep", n), &n, |b, &n| {
            b.iter_batched(
                || make_stack(n, 1024.0),
                |mut stack| {
                    for width in [320.0, 768.0, 1024.0, 1366.0] {
                        black_box(stack.set_width(width));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_drag(c: &mut Criterion) {
    let mut group = c.benchmark_group("layerstack/drag");

    for n in [4, 16] {
        group.bench_with_input(BenchmarkId::new("gesture_30_steps", n), &n, |b, &n| {
            b.iter_batched(
                || make_stack(n, 1024.0),
                |mut stack| {
                    let mut ctx = stack.begin_move(n - 1, 500.0).expect("begin");
                    for step in 0..30 {
                        let dx = if step < 15 { 12.0 } else { -7.0 };
                        ctx = stack.continue_move(&ctx, dx).expect("continue").context;
                    }
                    black_box(stack.end_move(&ctx, MoveEndMethod::Nearest).expect("end"))
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_resolve,
    bench_push_pop,
    bench_set_width,
    bench_drag,
);

criterion_main!(benches);
