//! Island-model runs mixing panmictic, cellular and nested distributed
//! islands.

use rand::Rng;
use u_evolve::prelude::*;

type Island64 = Box<dyn Island<f64, f64>>;

fn sphere(x: &f64) -> f64 {
    x * x
}

fn panmictic_island(seed: u64, rounds: usize) -> Island64 {
    let config = PanmicticConfig::default()
        .with_population_size(30)
        .with_elitism(2)
        .with_goal(Goal::Minimize);
    let topology: Panmictic<f64, f64> =
        Panmictic::new(config, |rng: &mut EvoRng| rng.random_range(-50.0..50.0)).unwrap();
    let ga = Ga::new(topology, GaConfig::default().with_seed(seed), move |ga| {
        ga.evaluate(sphere)?;
        ga.sort();
        ga.select(Selection::Tournament(2))?;
        ga.mutate(0.5, |x: &mut f64, rng: &mut EvoRng| {
            *x += rng.random_range(-1.0..1.0);
            Ok(())
        })?;
        ga.evaluate(sphere)?;
        ga.stop_by_session_iteration(rounds);
        Ok(())
    })
    .unwrap();
    Box::new(ga)
}

fn cellular_island(seed: u64, rounds: usize) -> Island64 {
    let config = CellularConfig::new(Dimens::new([6, 6]).unwrap())
        .with_neighborhood(Neighborhood::von_neumann(1).unwrap())
        .with_cellular_type(CellularType::Asynchronous)
        .with_elitism(true)
        .with_goal(Goal::Minimize);
    let topology: Cellular<f64, f64> =
        Cellular::new(config, |rng: &mut EvoRng| rng.random_range(-50.0..50.0)).unwrap();
    let step = CellularStep::new(sphere)
        .with_selection(Selection::Tournament(2))
        .with_crossover(0.7, |a: &f64, b: &f64, _: &mut EvoRng| Ok((a + b) / 2.0))
        .with_mutation(0.3, |x: &mut f64, rng: &mut EvoRng| {
            *x += rng.random_range(-1.0..1.0);
            Ok(())
        })
        .with_replacement(Replacement::IfBetter);
    let ga = Ga::new(topology, GaConfig::default().with_seed(seed), move |ga| {
        ga.evaluate(sphere)?;
        ga.evolve_cells(&step)?;
        ga.stop_by_session_iteration(rounds);
        Ok(())
    })
    .unwrap();
    Box::new(ga)
}

fn distributed_run(islands: Vec<Island64>, seed: u64, max: usize) -> Ga<Distributed<f64, f64>> {
    let topology = Distributed::new(
        DistributedConfig::default().with_goal(Goal::Minimize),
        islands,
    )
    .unwrap();
    Ga::new(topology, GaConfig::default().with_seed(seed), move |ga| {
        ga.launch_islands()?;
        ga.migrate(0.1)?;
        ga.stop_by_max_iteration(max);
        Ok(())
    })
    .unwrap()
}

#[test]
fn mixed_islands_improve() {
    let islands = vec![
        panmictic_island(1, 5),
        cellular_island(2, 5),
        panmictic_island(3, 5),
    ];
    let mut ga = distributed_run(islands, 10, 6);

    assert_eq!(ga.start().unwrap(), State::Finished(FinishReason::MaxIteration));
    assert_eq!(ga.topology().islands().len(), 3);
    assert!(ga
        .topology()
        .islands()
        .iter()
        .all(|island| island.iteration() == 30));
    assert_eq!(ga.island_size(), 30 + 36 + 30);
    assert!(ga.best_fitness().unwrap() < 1.0);
}

#[test]
fn nested_distributed_islands() {
    let inner = |seed: u64| -> Island64 {
        let islands = vec![panmictic_island(seed, 2), panmictic_island(seed + 1, 2)];
        Box::new(distributed_run(islands, seed, 1))
    };
    // an inner run finishes after one round per launch, each island
    // running two iterations
    let mut outer = Ga::new(
        Distributed::new(
            DistributedConfig::default().with_goal(Goal::Minimize),
            vec![inner(100), inner(200)],
        )
        .unwrap(),
        GaConfig::default().with_seed(5),
        |ga| {
            ga.launch_islands()?;
            ga.migrate(0.2)?;
            ga.stop_by_max_iteration(3);
            Ok(())
        },
    )
    .unwrap();

    assert_eq!(outer.start().unwrap(), State::Finished(FinishReason::MaxIteration));
    assert_eq!(outer.island_size(), 120);
    for island in outer.topology().islands() {
        assert_eq!(island.iteration(), 3);
    }
}

#[test]
fn stopping_parent_stops_islands() {
    let endless = |seed: u64| -> Island64 {
        let config = PanmicticConfig::default().with_population_size(10);
        let topology: Panmictic<f64, f64> =
            Panmictic::new(config, |rng: &mut EvoRng| rng.random_range(-1.0..1.0)).unwrap();
        Box::new(
            Ga::new(topology, GaConfig::default().with_seed(seed), |ga| {
                ga.evaluate(sphere)?;
                std::thread::sleep(std::time::Duration::from_millis(1));
                Ok(())
            })
            .unwrap(),
        )
    };
    let topology = Distributed::new(DistributedConfig::default(), vec![endless(1), endless(2)]).unwrap();
    let ga = Ga::new(topology, GaConfig::default().with_seed(1), |ga| {
        ga.launch_islands()?;
        Ok(())
    })
    .unwrap();

    let running = Running::start(ga).unwrap();
    let state = running.stop(StopPolicy::Default);
    assert_eq!(state, State::Stopped(StopPolicy::Default));
    let (ga, outcome) = running.join();
    assert!(outcome.is_ok());
    for island in ga.topology().islands() {
        assert!(island.state().is_halted());
    }
}
