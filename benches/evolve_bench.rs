//! Criterion benchmarks for the evolution engine.
//!
//! Uses synthetic problems (Sphere function, OneMax) to measure the
//! overhead of the topologies and the processor, independent of any domain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use u_evolve::prelude::*;

// ===========================================================================
// Sphere function: minimize sum(x_i^2)
// ===========================================================================

type Point = Vec<f64>;

#[allow(clippy::ptr_arg)]
fn sphere(x: &Point) -> f64 {
    x.iter().map(|v| v * v).sum()
}

fn random_point(dim: usize) -> impl Fn(&mut EvoRng) -> Point + Send + Sync + 'static {
    move |rng: &mut EvoRng| (0..dim).map(|_| rng.random_range(-5.0..5.0)).collect()
}

fn one_point(a: &Point, b: &Point, rng: &mut EvoRng) -> Result<(Point, Point)> {
    let cut = rng.random_range(0..a.len());
    let mut x = a.clone();
    let mut y = b.clone();
    x[cut..].copy_from_slice(&b[cut..]);
    y[cut..].copy_from_slice(&a[cut..]);
    Ok((x, y))
}

fn nudge(x: &mut Point, rng: &mut EvoRng) -> Result<()> {
    let i = rng.random_range(0..x.len());
    x[i] += rng.random_range(-0.5..0.5);
    Ok(())
}

fn panmictic_sphere(dim: usize, config: GaConfig) -> Ga<Panmictic<Point, f64>> {
    let topology = Panmictic::new(
        PanmicticConfig::default()
            .with_population_size(100)
            .with_elitism(2)
            .with_goal(Goal::Minimize),
        random_point(dim),
    )
    .unwrap();
    Ga::new(topology, config, |ga| {
        ga.evaluate(sphere)?;
        ga.sort();
        ga.select(Selection::Tournament(3))?;
        ga.crossover(0.8, one_point)?;
        ga.mutate(0.2, nudge)?;
        ga.evaluate(sphere)?;
        ga.stop_by_max_iteration(100);
        Ok(())
    })
    .unwrap()
}

fn bench_panmictic_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("panmictic_sphere");
    group.sample_size(10);

    for &dim in &[10, 30, 100] {
        group.bench_with_input(BenchmarkId::new("sequential", dim), &dim, |b, &dim| {
            b.iter(|| {
                let mut ga = panmictic_sphere(dim, GaConfig::default().with_seed(42));
                black_box(ga.start().unwrap())
            })
        });
        group.bench_with_input(BenchmarkId::new("parallel_4", dim), &dim, |b, &dim| {
            b.iter(|| {
                let config = GaConfig::default().with_seed(42).with_workers(4);
                let mut ga = panmictic_sphere(dim, config);
                black_box(ga.start().unwrap())
            })
        });
    }
    group.finish();
}

// ===========================================================================
// Cellular sphere on a square grid
// ===========================================================================

fn bench_cellular_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("cellular_sphere");
    group.sample_size(10);

    for &(name, cellular_type) in &[
        ("synchronous", CellularType::Synchronous),
        ("asynchronous", CellularType::Asynchronous),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &cellular_type, |b, &t| {
            b.iter(|| {
                let config = CellularConfig::new(Dimens::new([20, 20]).unwrap())
                    .with_neighborhood(Neighborhood::moore(1).unwrap())
                    .with_cellular_type(t)
                    .with_elitism(true);
                let topology: Cellular<Point, f64> =
                    Cellular::new(config, random_point(10)).unwrap();
                let step = CellularStep::new(sphere)
                    .with_crossover(0.8, |a: &Point, b: &Point, rng: &mut EvoRng| {
                        one_point(a, b, rng).map(|(x, _)| x)
                    })
                    .with_mutation(0.2, nudge);
                let mut ga = Ga::new(topology, GaConfig::default().with_seed(42), move |ga| {
                    ga.evaluate(sphere)?;
                    ga.evolve_cells(&step)?;
                    ga.stop_by_max_iteration(50);
                    Ok(())
                })
                .unwrap();
                black_box(ga.start().unwrap())
            })
        });
    }
    group.finish();
}

// ===========================================================================
// OneMax islands with ring migration
// ===========================================================================

#[allow(clippy::ptr_arg)]
fn ones(bits: &Vec<bool>) -> usize {
    bits.iter().filter(|&&b| b).count()
}

fn one_max_island(n: usize, seed: u64) -> Box<dyn Island<Vec<bool>, usize>> {
    let topology = Panmictic::new(
        PanmicticConfig::default()
            .with_population_size(50)
            .with_elitism(1)
            .with_goal(Goal::Maximize),
        move |rng: &mut EvoRng| (0..n).map(|_| rng.random_bool(0.5)).collect::<Vec<bool>>(),
    )
    .unwrap();
    let ga = Ga::new(topology, GaConfig::default().with_seed(seed), |ga| {
        ga.evaluate(ones)?;
        ga.select(Selection::Tournament(2))?;
        ga.mutate(0.3, |bits: &mut Vec<bool>, rng: &mut EvoRng| {
            let i = rng.random_range(0..bits.len());
            bits[i] = !bits[i];
            Ok(())
        })?;
        ga.evaluate(ones)?;
        ga.stop_by_session_iteration(5);
        Ok(())
    })
    .unwrap();
    Box::new(ga)
}

fn bench_island_onemax(c: &mut Criterion) {
    let mut group = c.benchmark_group("island_onemax");
    group.sample_size(10);

    for &islands in &[2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(islands), &islands, |b, &count| {
            b.iter(|| {
                let islands = (0..count as u64).map(|seed| one_max_island(50, seed)).collect();
                let topology = Distributed::new(
                    DistributedConfig::default().with_goal(Goal::Maximize),
                    islands,
                )
                .unwrap();
                let config = GaConfig::default().with_seed(42).with_workers(2);
                let mut ga = Ga::new(topology, config, |ga| {
                    ga.launch_islands()?;
                    ga.migrate(0.1)?;
                    ga.stop_by_max_iteration(10);
                    Ok(())
                })
                .unwrap();
                black_box(ga.start().unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_panmictic_sphere,
    bench_cellular_sphere,
    bench_island_onemax
);
criterion_main!(benches);
