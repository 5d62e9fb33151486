use ensemblegp::config::TreeConfig;
use ensemblegp::engines::generation::locator::{leaf_count, max_tree_depth, subtree_count};
use ensemblegp::engines::generation::{
    check_ind, validate, CrossoverEngine, MutationEngine, Tree, TreeCreator,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn configs() -> Vec<TreeConfig> {
    vec![
        TreeConfig::default(),
        TreeConfig {
            n_max: 10,
            max_depth: 2,
            min_children: 2,
            max_children: 3,
            ..TreeConfig::default()
        },
        TreeConfig {
            n_max: 30,
            max_depth: 5,
            min_children: 2,
            max_children: 4,
            weighted: true,
            gaussian_stdv: 0.25,
            threshold_mutation_ratio: 0.5,
        },
    ]
}

#[test]
fn test_evolution_keeps_grammar() {
    for config in configs() {
        let creator = TreeCreator::new(config.clone()).unwrap();
        let mutator = MutationEngine::new(config.clone()).unwrap();
        let recombinator = CrossoverEngine::new(config.clone()).unwrap();

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut population: Vec<String> = (0..6).map(|_| creator.create(&mut rng)).collect();

            // A few generations so operators also see their own output
            for _ in 0..4 {
                let mut next = Vec::new();
                for pair in population.chunks(2) {
                    let (a, b) = recombinator.cross(&pair[0], &pair[1], &mut rng).unwrap();
                    next.push(mutator.mutate(&a, &mut rng).unwrap());
                    next.push(mutator.mutate(&b, &mut rng).unwrap());
                }
                for tree in &next {
                    assert!(validate(tree, &config).is_ok(), "{}", tree);
                    assert!(check_ind(tree), "{}", tree);
                    assert!(max_tree_depth(tree) <= config.max_depth);
                }
                population = next;
            }
        }
    }
}

#[test]
fn test_crossover_into_flat_tree_takes_a_leaf() {
    let config = TreeConfig {
        n_max: 5,
        max_depth: 1,
        ..TreeConfig::default()
    };
    let recombinator = CrossoverEngine::new(config).unwrap();

    for seed in 0..100 {
        let mut rng = StdRng::seed_from_u64(seed);
        let child = recombinator
            .splice_one("(0 1);", "((2 3) 4);", &mut rng)
            .unwrap();
        assert_eq!(max_tree_depth(&child), 1);
        assert_eq!(leaf_count(&child), 2);
    }
}

#[test]
fn test_operators_are_reproducible() {
    let config = TreeConfig {
        weighted: true,
        ..TreeConfig::default()
    };
    let creator = TreeCreator::new(config.clone()).unwrap();
    let mutator = MutationEngine::new(config.clone()).unwrap();
    let recombinator = CrossoverEngine::new(config).unwrap();

    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = creator.create(&mut rng);
        let b = creator.create(&mut rng);
        let (ab, ba) = recombinator.cross(&a, &b, &mut rng).unwrap();
        (mutator.mutate(&ab, &mut rng).unwrap(), ba)
    };

    assert_eq!(run(99), run(99));
}

/// Integer tokens found by splitting on the grammar's delimiters
fn token_leaf_count(tree: &str) -> usize {
    tree.split(|c: char| c == ' ' || c == '(' || c == ')' || c == ';')
        .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .count()
}

#[test]
fn test_counts_agree_with_token_scan() {
    let config = TreeConfig {
        n_max: 25,
        max_depth: 4,
        min_children: 2,
        max_children: 4,
        weighted: true,
        gaussian_stdv: 0.3,
        threshold_mutation_ratio: 0.5,
    };
    let creator = TreeCreator::new(config.clone()).unwrap();
    let mutator = MutationEngine::new(config.clone()).unwrap();
    let recombinator = CrossoverEngine::new(config).unwrap();

    for seed in 0..500 {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = creator.create(&mut rng);
        let b = creator.create(&mut rng);
        let (ab, ba) = recombinator.cross(&a, &b, &mut rng).unwrap();
        let mutated = mutator.mutate(&ab, &mut rng).unwrap();

        for tree in [&a, &b, &ab, &ba, &mutated] {
            let parsed = Tree::parse(tree).unwrap();
            assert_eq!(leaf_count(tree), token_leaf_count(tree), "{}", tree);
            assert_eq!(leaf_count(tree), parsed.leaves().count(), "{}", tree);
            assert_eq!(subtree_count(tree), parsed.combiner_count(), "{}", tree);
        }
    }
}
