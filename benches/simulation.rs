//! Performance benchmarks for ARBOR

use arbor::tree::{Mutation, Tree, TreeLibrary};
use arbor::{Config, World};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Tree grown by repeated random mutation until it reaches `size` nodes
fn grown_tree(size: usize, seed: u64) -> Tree {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tree = Tree::random(&mut rng);
    while tree.size() < size {
        tree = tree.mutate(size, &mut rng);
    }
    tree
}

fn benchmark_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for population in [100, 500, 1000].iter() {
        let mut config = Config::default();
        config.world.initial_population = *population;

        let mut world = World::new_with_seed(config, 42).expect("valid config");

        // Warm up
        world.run(10);

        group.bench_with_input(
            BenchmarkId::new("population", population),
            population,
            |b, _| {
                b.iter(|| {
                    world.step();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_tree_evaluate(c: &mut Criterion) {
    let mut tree = grown_tree(31, 7);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    c.bench_function("tree_evaluate_31", |b| {
        b.iter(|| tree.evaluate(|_| rng.gen_bool(0.5)));
    });
}

fn benchmark_mutation(c: &mut Criterion) {
    let tree = grown_tree(21, 3);
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    c.bench_function("tree_mutation", |b| {
        b.iter(|| {
            let mutation = Mutation::random(black_box(&tree), 31, &mut rng);
            tree.mutated(&mutation)
        });
    });
}

fn benchmark_library(c: &mut Criterion) {
    let trees: Vec<Tree> = (0..64).map(|seed| grown_tree(15, seed)).collect();

    c.bench_function("library_register_prune", |b| {
        b.iter(|| {
            let mut library = TreeLibrary::seeded(16);
            for tree in &trees {
                library.register(tree.clone());
                library.prune();
            }
            black_box(library.len())
        });
    });
}

criterion_group!(
    benches,
    benchmark_world_step,
    benchmark_tree_evaluate,
    benchmark_mutation,
    benchmark_library,
);

criterion_main!(benches);
