use criterion::{criterion_group, criterion_main, Criterion};
use tinyrand::{Seeded, StdRand};

use hipodrom::data::Runner;
use hipodrom::sim::{RaceSimulation, SimConfig, Tick};

fn field(runners: usize) -> Vec<Runner> {
    (1..=runners)
        .map(|number| {
            Runner::new(format!("R{number}"), number.to_string(), format!("RUNNER {number}"))
                .with_favoritism(format!("{},5", number * 2))
                .with_handicap((50 + number).to_string())
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    // sanity check
    let mut sim = RaceSimulation::new(SimConfig::planar(), field(14), StdRand::seed(42)).unwrap();
    sim.start().unwrap();
    while !matches!(sim.tick(), Tick::Finished(_)) {}
    assert!(sim.winner().is_some());

    c.bench_function("cri_sim_tick_14", |b| {
        let mut sim =
            RaceSimulation::new(SimConfig::planar(), field(14), StdRand::seed(42)).unwrap();
        sim.start().unwrap();
        b.iter(|| {
            if let Tick::Finished(_) = sim.tick() {
                sim.reset().unwrap();
                sim.start().unwrap();
            }
        });
    });

    c.bench_function("cri_sim_race_14", |b| {
        let mut sim =
            RaceSimulation::new(SimConfig::track(), field(14), StdRand::seed(42)).unwrap();
        b.iter(|| {
            sim.start().unwrap();
            while !matches!(sim.tick(), Tick::Finished(_)) {}
            sim.reset().unwrap();
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
