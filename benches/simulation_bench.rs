use collision_engine::{
    collision::DynamicTree,
    common::{DynamicTreeConfig, PhysicsConfig, SolverStrategy},
    world::DiscardEvents,
    BoundingBox, CircleCollider, CollisionType, PhysicsWorld, PolygonCollider, Vec2,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const FRAME_MS: f64 = 1000.0 / 60.0;
const STEPS: usize = 30;

// --- Helper for building worlds ---
fn world_with_floor(solver: SolverStrategy) -> PhysicsWorld {
    let config = PhysicsConfig {
        gravity: Vec2::new(0.0, 800.0),
        solver,
        ..PhysicsConfig::default()
    };
    let mut world = PhysicsWorld::new(config);
    world
        .spawn(Vec2::new(0.0, 10.0), CollisionType::Fixed, PolygonCollider::rectangle(2000.0, 20.0, Vec2::ZERO))
        .expect("floor");
    world
}

fn run_steps(world: &mut PhysicsWorld) {
    for _ in 0..STEPS {
        world.step(black_box(FRAME_MS), &mut DiscardEvents).expect("step");
    }
}

// Benchmark for a stack of circles falling under gravity
fn bench_circle_stack(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut group = c.benchmark_group("circle_stack");

    for num_circles in [10, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(num_circles), num_circles, |b, &n| {
            b.iter(|| {
                let mut world = world_with_floor(SolverStrategy::Arcade);
                let radius = 5.0;
                for i in 0..n {
                    // Ten columns with a slight gap between rows
                    let x = (i % 10) as f64 * radius * 2.5 - 100.0;
                    let y = -radius - (i / 10) as f64 * radius * 2.1;
                    world
                        .spawn(Vec2::new(x, y), CollisionType::Active, CircleCollider::new(radius, Vec2::ZERO))
                        .expect("circle");
                }
                run_steps(&mut world);
            });
        });
    }
    group.finish();
}

// Benchmark for a pile of boxes under the realistic solver
fn bench_box_pile(c: &mut Criterion) {
    let mut group = c.benchmark_group("box_pile_realistic");

    for num_boxes in [10, 100, 300].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(num_boxes), num_boxes, |b, &n| {
            b.iter(|| {
                let mut world = world_with_floor(SolverStrategy::Realistic);
                let mut rng = fastrand::Rng::with_seed(7);
                for i in 0..n {
                    let x = rng.f64() * 400.0 - 200.0;
                    let y = -20.0 - i as f64 * 12.0;
                    world
                        .spawn(Vec2::new(x, y), CollisionType::Active, PolygonCollider::rectangle(10.0, 10.0, Vec2::ZERO))
                        .expect("box");
                }
                run_steps(&mut world);
            });
        });
    }
    group.finish();
}

// Benchmark for moving many leaves around the tree
fn bench_tree_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_churn");

    for num_leaves in [100, 1000, 5000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(num_leaves), num_leaves, |b, &n| {
            b.iter(|| {
                let mut rng = fastrand::Rng::with_seed(42);
                let mut tree = DynamicTree::new(DynamicTreeConfig::default());
                let mut centers: Vec<Vec2> = (0..n)
                    .map(|_| Vec2::new(rng.f64() * 5000.0, rng.f64() * 5000.0))
                    .collect();
                for (id, center) in centers.iter().enumerate() {
                    tree.track(id, BoundingBox::from_center(*center, 10.0, 10.0)).expect("track");
                }
                for _ in 0..STEPS {
                    for (id, center) in centers.iter_mut().enumerate() {
                        let velocity = Vec2::new(rng.f64() * 20.0 - 10.0, rng.f64() * 20.0 - 10.0);
                        *center += velocity;
                        tree.update(id, BoundingBox::from_center(*center, 10.0, 10.0), velocity)
                            .expect("update");
                    }
                    let mut hits = 0usize;
                    for (id, center) in centers.iter().enumerate() {
                        tree.query(id, &BoundingBox::from_center(*center, 10.0, 10.0), |_| {
                            hits += 1;
                            false
                        });
                    }
                    black_box(hits);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_circle_stack, bench_box_pile, bench_tree_churn);
criterion_main!(benches);
