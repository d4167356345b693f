use criterion::{criterion_group, criterion_main, Criterion};

use hipodrom::data::{BetEntry, BetType};
use hipodrom::grid::OddsGrid;

fn race(runners: usize) -> Vec<BetType> {
    let win = (1..=runners)
        .map(|number| {
            BetEntry::runner(number.to_string(), format!("{}.{}", number + 1, number % 10))
                .with_favorite(number == 3)
                .with_non_runner(number == 7)
                .with_group(if number % 5 == 0 { "1" } else { "0" })
        })
        .collect();
    let place = (1..=runners)
        .map(|number| BetEntry::runner(number.to_string(), "1.45"))
        .collect();
    let exacta = (1..=runners)
        .flat_map(|first| {
            (1..=runners)
                .filter(move |&second| second != first)
                .map(move |second| {
                    BetEntry::combination(first.to_string(), second.to_string(), "48.10")
                })
        })
        .collect();
    vec![
        BetType::new("GANYAN", win),
        BetType::new("PLASE", place),
        BetType::new("IKILI", exacta),
    ]
}

fn criterion_benchmark(c: &mut Criterion) {
    {
        let bet_types = race(8);
        assert_eq!(56, OddsGrid::build(&bet_types).row_count());
        c.bench_function("cri_grid_8", |b| {
            b.iter(|| OddsGrid::build(&bet_types));
        });
    }
    {
        let bet_types = race(16);
        assert_eq!(240, OddsGrid::build(&bet_types).row_count());
        c.bench_function("cri_grid_16", |b| {
            b.iter(|| OddsGrid::build(&bet_types));
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
