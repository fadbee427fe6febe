//! Criterion benchmarks for the circuit compiler and arena evaluator.
//!
//! Two axes:
//!
//! - **Compile**: analysis + two-pass arena serialization
//! - **Step**: one pretick/tick pair over the whole arena
//!
//! Run with: `cargo bench -p gatework-core -- sim/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use gatework_core::{ButtonKind, Circuit, DisplayKind, GateKind, Simulation, UnaryKind, compile};

const CHAIN_LENGTHS: &[usize] = &[16, 256, 4096];

// ---------------------------------------------------------------------------
// Circuit constructors
// ---------------------------------------------------------------------------

/// Button → `n` alternating XOR/NOT stages → lamp.
fn make_chain(n: usize) -> Circuit {
    let mut c = Circuit::new();
    let a = c.add_button(ButtonKind::Toggle);
    let b = c.add_button(ButtonKind::Toggle);
    let mut prev = a;
    for i in 0..n {
        let node = if i % 2 == 0 {
            let xor = c.add_gate(GateKind::Xor, 2).unwrap();
            c.connect(prev, 0, xor, 0).unwrap();
            c.connect(b, 0, xor, 1).unwrap();
            xor
        } else {
            let not = c.add_unary(UnaryKind::Not, 1).unwrap();
            c.connect(prev, 0, not, 0).unwrap();
            not
        };
        prev = node;
    }
    let lamp = c.add_display(DisplayKind::LightBulb);
    c.connect(prev, 0, lamp, 0).unwrap();
    c
}

/// Eight copies of an XOR function wrapped `depth` levels deep.
fn make_nested(depth: usize) -> Circuit {
    let mut body = Circuit::new();
    let x = body.add_button(ButtonKind::Push);
    let y = body.add_button(ButtonKind::Push);
    let xor = body.add_gate(GateKind::Xor, 2).unwrap();
    let out = body.add_display(DisplayKind::LightBulb);
    body.connect(x, 0, xor, 0).unwrap();
    body.connect(y, 0, xor, 1).unwrap();
    body.connect(xor, 0, out, 0).unwrap();

    for _ in 0..depth {
        let mut outer = Circuit::new();
        let x = outer.add_button(ButtonKind::Push);
        let y = outer.add_button(ButtonKind::Push);
        let f = outer.add_function(body);
        let out = outer.add_display(DisplayKind::LightBulb);
        outer.connect(x, 0, f, 0).unwrap();
        outer.connect(y, 0, f, 1).unwrap();
        outer.connect(f, 0, out, 0).unwrap();
        body = outer;
    }

    let mut top = Circuit::new();
    let a = top.add_button(ButtonKind::Toggle);
    for _ in 0..8 {
        let f = top.add_function(body.clone());
        top.connect(a, 0, f, 0).unwrap();
    }
    top
}

// ---------------------------------------------------------------------------
// Compile benchmarks
// ---------------------------------------------------------------------------

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("sim/compile");

    for &n in CHAIN_LENGTHS {
        let circuit = make_chain(n);
        group.bench_with_input(BenchmarkId::new("chain", n), &circuit, |b, circuit| {
            b.iter(|| black_box(compile(black_box(circuit))));
        });
    }

    let nested = make_nested(4);
    group.bench_function("nested_4", |b| {
        b.iter(|| black_box(compile(black_box(&nested))));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Step benchmarks
// ---------------------------------------------------------------------------

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("sim/step");

    for &n in CHAIN_LENGTHS {
        let mut sim = Simulation::new(make_chain(n));
        sim.compile();
        group.bench_function(BenchmarkId::new("chain", n), |b| {
            b.iter(|| black_box(sim.step()));
        });
    }

    // Quiescent nested functions: has_changed skips every subtree.
    {
        let mut sim = Simulation::new(make_nested(4));
        sim.compile();
        sim.settle(64);
        group.bench_function("nested_4_idle", |b| {
            b.iter(|| black_box(sim.step()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_step);
criterion_main!(benches);
