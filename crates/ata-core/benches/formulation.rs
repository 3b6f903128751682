use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ata_core::config::AssemblyConfig;
use ata_core::formulation::Formulation;
use ata_core::information::InformationMatrix;
use ata_core::lp_format::to_lp_string;
use ata_core::model::{Item, ItemPool};

fn make_pool(n: usize) -> ItemPool {
    let items = (0..n)
        .map(|i| {
            let a = 0.6 + (i % 7) as f64 * 0.15;
            let b = -2.0 + (i % 17) as f64 * 0.25;
            let c = (i % 5) as f64 * 0.05;
            Item::new(format!("I{i:04}"), a, b, c, (i % 5) as u32 + 1)
        })
        .collect();
    ItemPool::new(items).unwrap()
}

fn config(num_forms: usize) -> AssemblyConfig {
    AssemblyConfig {
        num_forms,
        items_per_form: 40,
        thetas: vec![-1.5, -0.5, 0.5, 1.5],
        targets: vec![8.0, 10.0, 10.0, 8.0],
        content_minimums: vec![5; 5],
        ..AssemblyConfig::default()
    }
}

fn bench_formulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("formulation");

    for (items, forms) in [(300, 2), (1000, 4)] {
        let pool = make_pool(items);
        let config = config(forms);
        let levels = config.ability_levels();
        let matrix = InformationMatrix::compute(&pool, &levels, config.scaling_constant).unwrap();

        group.bench_function(format!("build_{items}_items_{forms}_forms"), |b| {
            b.iter(|| {
                Formulation::build(
                    black_box(&pool),
                    black_box(&matrix),
                    black_box(&levels),
                    black_box(&config),
                )
            })
        });

        let formulation = Formulation::build(&pool, &matrix, &levels, &config).unwrap();
        group.bench_function(format!("lp_export_{items}_items_{forms}_forms"), |b| {
            b.iter(|| to_lp_string(black_box(&formulation)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_formulation);
criterion_main!(benches);
