//! ECS microbenchmarks using Criterion.
//!
//! These benchmarks measure individual operations in isolation:
//! - Entity spawn (single, multi-component, batch)
//! - Chunked component iteration
//! - Component add/remove (archetype migration)
//! - Query resolution with filters

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_bench::components::*;
use strata_engine::ecs::World;

// =============================================================================
// Spawn Benchmarks
// =============================================================================

fn bench_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for count in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        // Single component spawn
        group.bench_with_input(BenchmarkId::new("single_component", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                for _ in 0..n {
                    black_box(world.spawn(Position::default()).unwrap());
                }
            });
        });

        // Multi-component spawn (4 components like ecs_bench_suite)
        group.bench_with_input(BenchmarkId::new("four_components", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                for _ in 0..n {
                    black_box(
                        world
                            .spawn((
                                Transform::default(),
                                Position::default(),
                                Rotation::default(),
                                Velocity::default(),
                            ))
                            .unwrap(),
                    );
                }
            });
        });

        // Batch spawn from one prototype
        group.bench_with_input(BenchmarkId::new("many_single", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                black_box(world.spawn_many(n, Position::default()).unwrap());
            });
        });

        // Batch spawn from per-entity values
        group.bench_with_input(BenchmarkId::new("batch_four", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                let values: Vec<_> = (0..n)
                    .map(|_| {
                        (
                            Transform::default(),
                            Position::default(),
                            Rotation::default(),
                            Velocity::default(),
                        )
                    })
                    .collect();
                black_box(world.spawn_batch(values).unwrap());
            });
        });
    }

    group.finish();
}

// =============================================================================
// Iteration Benchmarks
// =============================================================================

fn iteration_world(count: usize) -> World {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut world = World::new();
    let values: Vec<_> = (0..count)
        .map(|_| {
            (
                Position::default(),
                Velocity {
                    x: rng.gen_range(-1.0..1.0),
                    y: rng.gen_range(-1.0..1.0),
                    z: rng.gen_range(-1.0..1.0),
                },
            )
        })
        .collect();
    world.spawn_batch(values).unwrap();
    world
}

fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");

    for count in [1_000, 10_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));

        // Chunked SoA iteration - the hot path
        group.bench_with_input(BenchmarkId::new("chunks", count), &count, |b, &n| {
            let mut world = iteration_world(n);
            b.iter(|| {
                world
                    .query::<(&mut Position, &Velocity)>()
                    .chunks(|_entities, (positions, velocities)| {
                        for (pos, vel) in positions.iter_mut().zip(velocities.iter()) {
                            pos.x += vel.x;
                            pos.y += vel.y;
                            pos.z += vel.z;
                        }
                    });
            });
        });

        // Per-entity iterator - the ergonomic path
        group.bench_with_input(BenchmarkId::new("iter", count), &count, |b, &n| {
            let mut world = iteration_world(n);
            b.iter(|| {
                for (_entity, (pos, vel)) in world.query::<(&mut Position, &Velocity)>().iter() {
                    pos.x += vel.x;
                }
            });
        });

        // Persistent query amortizes filter resolution
        group.bench_with_input(BenchmarkId::new("persistent", count), &count, |b, &n| {
            let mut world = iteration_world(n);
            let mut movers = world.query_for::<(&mut Position, &Velocity)>();
            b.iter(|| {
                movers.chunks(&mut world, |_entities, (positions, velocities)| {
                    for (pos, vel) in positions.iter_mut().zip(velocities.iter()) {
                        pos.x += vel.x;
                    }
                });
            });
        });
    }

    group.finish();
}

// =============================================================================
// Migration Benchmarks
// =============================================================================

fn bench_migration(c: &mut Criterion) {
    let mut group = c.benchmark_group("migration");

    for count in [100, 1_000] {
        group.throughput(Throughput::Elements(count as u64));

        // Add then remove one component per entity (two moves each)
        group.bench_with_input(BenchmarkId::new("add_remove", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                let entities = world
                    .spawn_many(n, (Position::default(), Velocity::default()))
                    .unwrap();
                for entity in &entities {
                    world.add_component(*entity, Health { current: 10, max: 10 });
                }
                for entity in &entities {
                    world.remove_component::<Health>(*entity);
                }
                black_box(entities);
            });
        });

        // Batched set_components performs a single move
        group.bench_with_input(BenchmarkId::new("set_components", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                let entities = world.spawn_many(n, Position::default()).unwrap();
                for entity in &entities {
                    world.set_components(
                        *entity,
                        (Velocity::default(), Health { current: 10, max: 10 }),
                    );
                }
                black_box(entities);
            });
        });
    }

    group.finish();
}

// =============================================================================
// Query Resolution Benchmarks
// =============================================================================

fn bench_query_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_resolution");

    // A world with a spread of archetypes to filter over
    let mut world = World::new();
    world.spawn_many(100, Position::default()).unwrap();
    world
        .spawn_many(100, (Position::default(), Velocity::default()))
        .unwrap();
    world
        .spawn_many(100, (Position::default(), Frozen))
        .unwrap();
    world
        .spawn_many(100, (Position::default(), Velocity::default(), Frozen))
        .unwrap();

    group.bench_function("count_filtered", |b| {
        b.iter(|| black_box(world.query::<&Position>().without::<Frozen>().count()));
    });

    group.bench_function("ids_any_of", |b| {
        b.iter(|| black_box(world.query::<&Position>().any_of::<(Velocity, Frozen)>().ids()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_spawn,
    bench_iteration,
    bench_migration,
    bench_query_resolution
);
criterion_main!(benches);
