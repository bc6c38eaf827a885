//! Criterion benchmarks for the Mixworks engine.
//!
//! Three benchmark groups:
//! - `mixing`: mean color of large pots, through the full CSS resolver
//! - `duration`: weather-scaled processing time of large pots
//! - `session`: a whole hall of machines processed to completion

use criterion::{Criterion, criterion_group, criterion_main};
use mixworks_core::color::{ColorHarmony, Rgb};
use mixworks_core::id::{IngredientId, PotId};
use mixworks_core::ingredient::{Ingredient, IngredientSpec, Speed, StandardIngredientFactory, Structure};
use mixworks_core::pot::Pot;
use mixworks_core::test_utils::*;
use mixworks_core::timing::{SpeedCosts, processing_duration};
use std::hint::black_box;
use std::rc::Rc;

// ===========================================================================
// Builders
// ===========================================================================

const COLORS: [&str; 4] = ["rgb(200, 30, 30)", "#1e90ff", "hsl(120, 80%, 60%)", "gold"];

fn big_pot(n: u32) -> Pot {
    let mut pot = Pot::new(PotId(1), Rc::new(StandardIngredientFactory));
    for i in 0..n {
        let color = COLORS[i as usize % COLORS.len()];
        let _ = pot.add_ingredient(Ingredient::new(
            IngredientId(i),
            IngredientSpec::new(color, Structure::Smooth, Speed::Medium),
        ));
    }
    pot
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_mixing(c: &mut Criterion) {
    let pot = big_pot(1000);
    let mut group = c.benchmark_group("mixing");
    group.bench_function("mean_color_1000", |b| {
        b.iter(|| black_box(pot.mixed_color()));
    });
    group.bench_function("harmony", |b| {
        b.iter(|| black_box(ColorHarmony::of(black_box(Rgb::new(64, 128, 192)))));
    });
    group.finish();
}

fn bench_duration(c: &mut Criterion) {
    let pot = big_pot(1000);
    let costs = SpeedCosts::default();
    let weather = rainy();
    c.bench_function("duration/rain_1000", |b| {
        b.iter(|| {
            black_box(processing_duration(
                pot.ingredients(),
                1000,
                &costs,
                Some(&weather),
            ))
        });
    });
}

fn bench_session(c: &mut Criterion) {
    c.bench_function("session/50_machines_run_to_idle", |b| {
        b.iter(|| {
            let mut s = session();
            for _ in 0..50 {
                let _ = loaded_machine(
                    &mut s,
                    Speed::Easy,
                    &[&["red", "green"], &["#102030"], &["blue"]],
                );
            }
            let machines: Vec<_> = s.store().machines().map(|m| m.id()).collect();
            for m in machines {
                let _ = s.start_machine(m);
            }
            black_box(s.run_until_idle().len())
        });
    });
}

criterion_group!(benches, bench_mixing, bench_duration, bench_session);
criterion_main!(benches);
