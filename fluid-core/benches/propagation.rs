//! Propagation benchmarks
//!
//! These benchmarks measure:
//! - Fan-out of one signal to many effects
//! - A deep chain of memos
//! - Reconciling a reordered list of children

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fluid_core::dom::Node;
use fluid_core::reactive::{batch, create_effect, create_memo, create_root, create_signal, Memo};
use fluid_core::reconcile::{reconcile, Desired};

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for width in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            create_root(|dispose| {
                let (source, set_source) = create_signal(0usize);
                for _ in 0..width {
                    let source = source.clone();
                    create_effect(move |_| {
                        black_box(source.get());
                    });
                }
                let mut next = 0;
                b.iter(|| {
                    next += 1;
                    set_source.set(next);
                });
                dispose.dispose();
            });
        });
    }
    group.finish();
}

fn bench_memo_chain(c: &mut Criterion) {
    c.bench_function("memo_chain_100", |b| {
        create_root(|dispose| {
            let (source, set_source) = create_signal(0u64);
            let mut tail: Memo<u64> = create_memo(move || source.get());
            for _ in 0..100 {
                let previous = tail.clone();
                tail = create_memo(move || previous.get() + 1);
            }
            let observed = tail.clone();
            create_effect(move |_| {
                black_box(observed.get());
            });

            let mut next = 0;
            b.iter(|| {
                next += 1;
                batch(|| set_source.set(next));
            });
            dispose.dispose();
        });
    });
}

fn bench_reconcile_reverse(c: &mut Criterion) {
    c.bench_function("reconcile_reverse_1000", |b| {
        let parent = Node::element("ul");
        let mut current: Vec<Node> = (0..1_000).map(|_| Node::element("li")).collect();
        for node in &current {
            parent.append_child(node);
        }

        b.iter(|| {
            let desired = current.iter().rev().cloned().map(Desired::Node).collect();
            let (nodes, _) = reconcile(&parent, &current, desired, None);
            current = nodes;
        });
    });
}

criterion_group!(benches, bench_fan_out, bench_memo_chain, bench_reconcile_reverse);
criterion_main!(benches);
