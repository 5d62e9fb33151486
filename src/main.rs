use anyhow::Context;
use ensemblegp::config::{AppConfig, ConfigManager};
use ensemblegp::engines::evaluation::{avg_votes, PopulationEvaluator, PredictionPool};
use ensemblegp::engines::generation::{
    ensure_feasible, validate, CrossoverEngine, MutationEngine, TreeCreator,
};
use ensemblegp::types::Prediction;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;

const N_LABELS: usize = 12;
const LABELSET_SIZE: usize = 3;
const N_INSTANCES: usize = 200;
const POPULATION_SIZE: usize = 40;
const GENERATIONS: usize = 5;

/// Stand-in for a trained classifier: a random labelset with random votes
fn synthetic_prediction(_index: usize, rng: &mut StdRng) -> ensemblegp::Result<Prediction> {
    let labels = index::sample(rng, N_LABELS, LABELSET_SIZE).into_vec();
    let values = (0..N_INSTANCES)
        .map(|_| {
            labels
                .iter()
                .map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 })
                .collect()
        })
        .collect();
    Prediction::new(labels, values)
}

const MANIFEST_FLAG: &str = "--manifest";

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let manager = ConfigManager::new();
    manager
        .load_layered(path.as_deref())
        .context("Failed to load configuration")?;
    Ok(manager.get())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let print_manifest = args.iter().any(|a| a == MANIFEST_FLAG);
    let path = args.iter().find(|a| *a != MANIFEST_FLAG).map(PathBuf::from);

    let config = load_config(path)?;
    if print_manifest {
        println!("{}", config.manifest_json()?);
        return Ok(());
    }

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    log::info!("Seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let pool = Arc::new(PredictionPool::build(
        config.tree.n_max,
        seed,
        synthetic_prediction,
    )?);
    let evaluator = PopulationEvaluator::from_config(Arc::clone(&pool), &config.reduction)?;

    let creator = TreeCreator::new(config.tree.clone())?;
    let mutator = MutationEngine::new(config.tree.clone())?;
    let recombinator = CrossoverEngine::new(config.tree.clone())?;

    let mut population: Vec<String> = (0..POPULATION_SIZE)
        .map(|_| creator.create(&mut rng))
        .collect();

    for generation in 0..GENERATIONS {
        let mut offspring = Vec::with_capacity(population.len());
        for _ in 0..population.len() / 2 {
            let a = &population[rng.gen_range(0..population.len())];
            let b = &population[rng.gen_range(0..population.len())];
            let (ab, ba) = recombinator.cross(a, b, &mut rng)?;
            offspring.push(mutator.mutate(&ab, &mut rng)?);
            offspring.push(ba);
        }

        for child in &offspring {
            validate(child, &config.tree)?;
            ensure_feasible(child)?;
        }

        population.extend(offspring);
        evaluator
            .evaluate(&population)
            .with_context(|| format!("Failed to reduce generation {}", generation))?;

        let mut scored = population
            .into_iter()
            .map(|tree| {
                let coverage = pool.label_coverage(&tree)?;
                Ok((coverage, tree))
            })
            .collect::<ensemblegp::Result<Vec<_>>>()?;
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(POPULATION_SIZE);

        log::info!(
            "Generation {}: best coverage {:.2} by {}",
            generation,
            scored[0].0,
            scored[0].1
        );
        population = scored.into_iter().map(|(_, tree)| tree).collect();
    }

    let best = &population[0];
    let votes = pool.votes_per_label(best, pool.n_labels())?;
    log::info!(
        "Best individual {} covers {:.0}% of labels with {:.2} votes per label",
        best,
        pool.label_coverage(best)? * 100.0,
        avg_votes(&votes)
    );

    let prediction = evaluator.evaluate_one(best)?;
    let relevant = prediction
        .bipartition(config.reduction.default_threshold)
        .iter()
        .flatten()
        .filter(|&&b| b)
        .count();
    let total = prediction.n_instances() * prediction.label_indices().len();
    log::info!(
        "Best ensemble predicts {} of {} instance-label pairs as relevant (all labels covered: {})",
        relevant,
        total,
        prediction.covers_all(pool.n_labels())
    );
    println!("{}", best);
    Ok(())
}
