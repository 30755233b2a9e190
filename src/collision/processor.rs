use log::debug;
use rustc_hash::FxHashSet;

use super::contact::CollisionContact;
use super::dynamic_tree::DynamicTree;
use super::group::CollisionGroup;
use super::pair::{Pair, PairId};
use crate::colliders::{ColliderArena, ColliderId, RayCastHit};
use crate::common::config::{CompositeStrategy, ContinuousConfig, PhysicsConfig};
use crate::error::Result;
use crate::math::{BoundingBox, Ray, Vec2};
use crate::objects::body::CollisionType;
use crate::world::store::EntityStore;

/// Options for [`CollisionProcessor::ray_cast`].
pub struct RayCastOptions {
    /// Hits further along the ray than this are ignored.
    pub max_distance: f64,
    /// Only bodies whose group category intersects this mask are hit.
    pub collision_mask: u32,
    /// Overrides `collision_mask` with the group's category.
    pub collision_group: Option<CollisionGroup>,
    /// Skips bodies in the catch-all group.
    pub ignore_collision_group_all: bool,
    /// Keep going after the first accepted hit.
    pub search_all_colliders: bool,
    /// Extra acceptance test on each hit.
    pub filter: Option<Box<dyn Fn(&RayCastHit) -> bool>>,
}

impl Default for RayCastOptions {
    fn default() -> Self {
        Self {
            max_distance: f64::INFINITY,
            collision_mask: CollisionGroup::ALL.category(),
            collision_group: None,
            ignore_collision_group_all: false,
            search_all_colliders: false,
            filter: None,
        }
    }
}

impl std::fmt::Debug for RayCastOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayCastOptions")
            .field("max_distance", &self.max_distance)
            .field("collision_mask", &self.collision_mask)
            .field("collision_group", &self.collision_group)
            .field("ignore_collision_group_all", &self.ignore_collision_group_all)
            .field("search_all_colliders", &self.search_all_colliders)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// Broadphase and narrowphase over a dynamic AABB tree.
///
/// Only leaf colliders live in the tree; composites are expanded when
/// tracked. Pairs are deduplicated per frame.
#[derive(Debug, Clone)]
pub struct CollisionProcessor {
    tree: DynamicTree<ColliderId>,
    colliders: Vec<ColliderId>,
    pairs: FxHashSet<PairId>,
    continuous: ContinuousConfig,
}

impl CollisionProcessor {
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            tree: DynamicTree::new(config.dynamic_tree),
            colliders: Vec::new(),
            pairs: FxHashSet::default(),
            continuous: config.continuous,
        }
    }

    /// Tracked leaf colliders in tracking order.
    pub fn colliders(&self) -> &[ColliderId] {
        &self.colliders
    }

    pub fn tree(&self) -> &DynamicTree<ColliderId> {
        &self.tree
    }

    pub fn track(&mut self, arena: &ColliderArena, collider: ColliderId) -> Result<()> {
        for leaf in arena.flatten(collider) {
            if !self.colliders.contains(&leaf) {
                self.colliders.push(leaf);
            }
            self.tree.track(leaf, arena.bounds(leaf))?;
        }
        Ok(())
    }

    pub fn untrack(&mut self, arena: &ColliderArena, collider: ColliderId) -> Result<()> {
        for leaf in arena.flatten(collider) {
            self.colliders.retain(|c| *c != leaf);
            self.tree.untrack(leaf)?;
        }
        Ok(())
    }

    /// Refreshes the tree leaves of `targets`. Returns how many were reinserted.
    pub fn update(&mut self, store: &EntityStore, targets: &[ColliderId]) -> Result<usize> {
        let mut updated = 0;
        for &target in targets {
            let Some(collider) = store.colliders.get(target) else {
                continue;
            };
            let velocity = collider
                .owner
                .filter(|owner| store.body(*owner).is_some())
                .and_then(|owner| store.motion(owner))
                .map_or(Vec2::ZERO, |m| m.vel);
            if self.tree.update(target, store.colliders.bounds(target), velocity)? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Finds candidate pairs among `targets`, then sweeps fast bodies so they
    /// cannot tunnel through thin colliders.
    ///
    /// # Arguments
    /// * `targets` - Leaf colliders to consider this frame.
    /// * `elapsed_ms` - Frame length, for the fast-body travel estimate.
    pub fn broadphase(&mut self, store: &mut EntityStore, targets: &[ColliderId], elapsed_ms: f64) -> Result<Vec<Pair>> {
        let seconds = elapsed_ms / 1000.0;

        let potential: Vec<ColliderId> = targets
            .iter()
            .copied()
            .filter(|&id| {
                let Some(owner) = store.colliders.get(id).and_then(|c| c.owner) else {
                    return false;
                };
                store.is_active(owner)
                    && store.body(owner).is_some_and(|b| b.collision_type != CollisionType::PreventCollision)
            })
            .collect();

        self.pairs.clear();
        let mut pairs = Vec::new();
        for &collider in &potential {
            let bounds = store.colliders.bounds(collider);
            let known = &mut self.pairs;
            let found = &mut pairs;
            let view: &EntityStore = store;
            self.tree.query(collider, &bounds, |other| {
                let pair = Pair::new(collider, other);
                if !known.contains(&pair.id) && Pair::can_collide(view, collider, other) {
                    known.insert(pair.id);
                    found.push(pair);
                }
                false
            });
        }
        debug!("broadphase found {} pairs among {} colliders", pairs.len(), potential.len());

        if self.continuous.check_for_fast_bodies {
            for &collider in &potential {
                if let Some(pair) = self.sweep_fast_body(store, collider, seconds) {
                    if self.pairs.insert(pair.id) {
                        pairs.push(pair);
                    }
                }
            }
        }
        Ok(pairs)
    }

    /// Casts a ray along the body's velocity from where it was last frame
    /// and, on a hit, moves the body into contact with what it hit.
    fn sweep_fast_body(&self, store: &mut EntityStore, collider: ColliderId, seconds: f64) -> Option<Pair> {
        let owner = store.colliders.get(collider)?.owner?;
        let body = store.body(owner)?;
        if body.collision_type != CollisionType::Active {
            return None;
        }
        let old_pos = body.old_pos;
        let motion = *store.motion(owner)?;
        let transform = store.transform(owner)?;
        let epsilon = self.continuous.surface_epsilon;

        let update_distance = motion.vel.magnitude() * seconds + motion.acc.magnitude() * 0.5 * seconds * seconds;
        let bounds = store.colliders.bounds(collider);
        let min_dimension = bounds.width().min(bounds.height());
        if !(self.continuous.disable_minimum_speed_for_fast_body || update_distance > min_dimension / 2.0) {
            return None;
        }

        // Start from last frame's position since integration already moved the body
        let update_vec = transform.position - old_pos;
        let center = store.colliders.center(collider);
        let furthest = store.colliders.furthest_point(collider, motion.vel);
        let origin = furthest - update_vec;
        let mut ray = Ray::new(origin, motion.vel);
        ray.pos = ray.pos + ray.dir * (-2.0 * epsilon);

        let mut min_collider = None;
        let mut min_translate = Vec2::new(f64::INFINITY, f64::INFINITY);
        let view: &EntityStore = store;
        self.tree.ray_cast_query(&ray, update_distance + epsilon * 2.0, |other| {
            if !self.pairs.contains(&PairId::new(collider, other)) && Pair::can_collide(view, collider, other) {
                if let Some(hit) = view.colliders.ray_cast(other, &ray, update_distance + epsilon * 10.0) {
                    let translate = hit.point - origin;
                    if translate.magnitude() < min_translate.magnitude() {
                        min_translate = translate;
                        min_collider = Some(other);
                    }
                }
            }
            false
        });

        let other = min_collider?;
        if !min_translate.is_valid() {
            return None;
        }
        let position = origin + (center - furthest) + min_translate + ray.dir * (10.0 * epsilon);
        debug!("fast body {:?} swept into {:?}", collider, other);
        store.place(owner, position, transform.rotation);
        Some(Pair::new(collider, other))
    }

    /// Exact contacts for every pair, in pair order.
    pub fn narrowphase(
        &self,
        arena: &ColliderArena,
        pairs: &[Pair],
        composite_strategy: CompositeStrategy,
    ) -> Result<Vec<CollisionContact>> {
        let mut contacts = Vec::new();
        for pair in pairs {
            contacts.extend(pair.collide(arena)?);
        }
        if composite_strategy == CompositeStrategy::Separate {
            for contact in &mut contacts {
                contact.id.composite = None;
            }
        }
        debug!("narrowphase produced {} contacts from {} pairs", contacts.len(), pairs.len());
        Ok(contacts)
    }

    /// Tracked colliders whose fat bounds contain `point`.
    pub fn query_point(&self, point: Vec2) -> Vec<ColliderId> {
        let mut results = Vec::new();
        self.tree.query_point(point, |other| {
            results.push(other);
            false
        });
        results
    }

    /// Tracked colliders whose fat bounds overlap `bounds`.
    pub fn query_bounds(&self, bounds: &BoundingBox) -> Vec<ColliderId> {
        let mut results = Vec::new();
        self.tree.query_bounds(bounds, |other| {
            results.push(other);
            false
        });
        results
    }

    /// Casts a ray through the tracked colliders, nearest hit first.
    pub fn ray_cast(&self, store: &EntityStore, ray: &Ray, options: &RayCastOptions) -> Vec<RayCastHit> {
        let mut results = Vec::new();
        let mask = options.collision_group.map_or(options.collision_mask, |g| g.category());
        self.tree.ray_cast_query(ray, options.max_distance, |collider| {
            let body = store
                .colliders
                .get(collider)
                .and_then(|c| c.owner)
                .and_then(|owner| store.body(owner));
            if let Some(body) = body {
                if options.ignore_collision_group_all && body.group == CollisionGroup::ALL {
                    return false;
                }
                if mask & body.group.category() == 0 {
                    return false;
                }
            }

            let Some(hit) = store.colliders.ray_cast(collider, ray, options.max_distance) else {
                return false;
            };
            if options.filter.as_ref().is_some_and(|accept| !accept(&hit)) {
                return false;
            }
            results.push(hit);
            !options.search_all_colliders
        });
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colliders::{CircleCollider, EdgeCollider, PolygonCollider};
    use crate::math::Transform;
    use crate::objects::body::Body;
    use crate::world::store::EntityId;

    fn spawn(store: &mut EntityStore, processor: &mut CollisionProcessor, x: f64, y: f64, collision_type: CollisionType) -> (EntityId, ColliderId) {
        let e = store.add_entity(Transform::new(Vec2::new(x, y), 0.0), None);
        store.attach_body(e, Body::new(collision_type)).unwrap();
        let c = store.attach_collider(e, CircleCollider::new(5.0, Vec2::ZERO)).unwrap();
        processor.track(&store.colliders, c).unwrap();
        (e, c)
    }

    #[test]
    fn test_broadphase_finds_each_pair_once() {
        let mut store = EntityStore::new();
        let mut processor = CollisionProcessor::new(&PhysicsConfig::default());
        let (_, a) = spawn(&mut store, &mut processor, 0.0, 0.0, CollisionType::Active);
        let (_, b) = spawn(&mut store, &mut processor, 8.0, 0.0, CollisionType::Active);
        spawn(&mut store, &mut processor, 100.0, 0.0, CollisionType::Active);

        let targets = processor.colliders().to_vec();
        let pairs = processor.broadphase(&mut store, &targets, 16.0).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].id, PairId::new(a, b));
        assert_eq!(pairs[0].collider_a, a);
    }

    #[test]
    fn test_broadphase_skips_inactive_and_prevented() {
        let mut store = EntityStore::new();
        let mut processor = CollisionProcessor::new(&PhysicsConfig::default());
        let (_, _) = spawn(&mut store, &mut processor, 0.0, 0.0, CollisionType::Active);
        let (ghost, _) = spawn(&mut store, &mut processor, 4.0, 0.0, CollisionType::Active);
        spawn(&mut store, &mut processor, -4.0, 0.0, CollisionType::PreventCollision);
        store.set_active(ghost, false).unwrap();

        let targets = processor.colliders().to_vec();
        let pairs = processor.broadphase(&mut store, &targets, 16.0).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_update_counts_reinsertions() {
        let mut store = EntityStore::new();
        let mut processor = CollisionProcessor::new(&PhysicsConfig::default());
        let (e, c) = spawn(&mut store, &mut processor, 0.0, 0.0, CollisionType::Active);
        spawn(&mut store, &mut processor, 50.0, 0.0, CollisionType::Active);
        let targets = processor.colliders().to_vec();

        assert_eq!(processor.update(&store, &targets).unwrap(), 0);
        store.set_position(e, Vec2::new(30.0, 0.0)).unwrap();
        assert_eq!(processor.update(&store, &targets).unwrap(), 1);
        assert!(processor.tree().fat_bounds(c).unwrap().contains_box(&store.colliders.bounds(c)));
    }

    #[test]
    fn test_leaving_world_bounds_untracks() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut config = PhysicsConfig::default();
        config.dynamic_tree.world_bounds = BoundingBox::new(-100.0, -100.0, 100.0, 100.0);
        let mut store = EntityStore::new();
        let mut processor = CollisionProcessor::new(&config);
        let (e, c) = spawn(&mut store, &mut processor, 0.0, 0.0, CollisionType::Active);
        let targets = processor.colliders().to_vec();

        store.set_position(e, Vec2::new(500.0, 0.0)).unwrap();
        assert_eq!(processor.update(&store, &targets).unwrap(), 0);
        assert!(!processor.tree().contains(c));
        assert!(processor.query_point(Vec2::new(500.0, 0.0)).is_empty());
    }

    #[test]
    fn test_fast_body_is_swept_into_thin_wall() {
        let mut store = EntityStore::new();
        let mut processor = CollisionProcessor::new(&PhysicsConfig::default());

        let wall = store.add_entity(Transform::new(Vec2::new(50.0, 0.0), 0.0), None);
        store.attach_body(wall, Body::new(CollisionType::Fixed)).unwrap();
        let wall_collider = store
            .attach_collider(wall, EdgeCollider::new(Vec2::new(0.0, -50.0), Vec2::new(0.0, 50.0), Vec2::ZERO))
            .unwrap();
        processor.track(&store.colliders, wall_collider).unwrap();

        // Integrated from x=0 to x=100 in one frame, straight through the wall
        let (bullet, bullet_collider) = spawn(&mut store, &mut processor, 0.0, 0.0, CollisionType::Active);
        store.body_mut(bullet).unwrap().old_pos = Vec2::ZERO;
        store.motion_mut(bullet).unwrap().vel = Vec2::new(6000.0, 0.0);
        store.set_position(bullet, Vec2::new(100.0, 0.0)).unwrap();

        let targets = processor.colliders().to_vec();
        let pairs = processor.broadphase(&mut store, &targets, 1000.0 / 60.0).unwrap();

        assert!(pairs.iter().any(|p| p.id == PairId::new(wall_collider, bullet_collider)));
        // Leading edge pushed just past the wall surface
        let x = store.position(bullet).unwrap().x;
        assert!((x - (45.0 + 10.0 * 0.1)).abs() < 1e-6, "x = {}", x);
    }

    #[test]
    fn test_narrowphase_separate_strategy_drops_composite_key() {
        let mut store = EntityStore::new();
        let mut processor = CollisionProcessor::new(&PhysicsConfig::default());
        let e = store.add_entity(Transform::identity(), None);
        store.attach_body(e, Body::new(CollisionType::Fixed)).unwrap();
        let composite = store
            .attach_composite(
                e,
                vec![
                    PolygonCollider::rectangle(10.0, 10.0, Vec2::new(-5.0, 0.0)).into(),
                    PolygonCollider::rectangle(10.0, 10.0, Vec2::new(5.0, 0.0)).into(),
                ],
            )
            .unwrap();
        processor.track(&store.colliders, composite).unwrap();
        assert_eq!(processor.colliders().len(), 2);
        spawn(&mut store, &mut processor, 0.0, -8.0, CollisionType::Active);

        let targets = processor.colliders().to_vec();
        let pairs = processor.broadphase(&mut store, &targets, 16.0).unwrap();
        assert_eq!(pairs.len(), 2);

        let together = processor.narrowphase(&store.colliders, &pairs, CompositeStrategy::Together).unwrap();
        assert_eq!(together.len(), 2);
        assert_eq!(together[0].id.lifecycle_key(), together[1].id.lifecycle_key());

        let separate = processor.narrowphase(&store.colliders, &pairs, CompositeStrategy::Separate).unwrap();
        assert_ne!(separate[0].id.lifecycle_key(), separate[1].id.lifecycle_key());
    }

    #[test]
    fn test_query_point_and_bounds() {
        let mut store = EntityStore::new();
        let mut processor = CollisionProcessor::new(&PhysicsConfig::default());
        let (_, a) = spawn(&mut store, &mut processor, 0.0, 0.0, CollisionType::Active);
        let (_, b) = spawn(&mut store, &mut processor, 100.0, 0.0, CollisionType::Active);

        assert_eq!(processor.query_point(Vec2::new(1.0, 1.0)), vec![a]);
        assert!(processor.query_point(Vec2::new(50.0, 50.0)).is_empty());
        // Fat bounds are radius 5 plus 2 of padding, edges included
        assert_eq!(processor.query_point(Vec2::new(7.0, 0.0)), vec![a]);
        assert_eq!(processor.query_point(Vec2::new(100.0, -6.0)), vec![b]);
        let mut both = processor.query_bounds(&BoundingBox::new(-10.0, -10.0, 110.0, 10.0));
        both.sort();
        assert_eq!(both, vec![a, b]);
    }

    #[test]
    fn test_ray_cast_options() {
        let mut store = EntityStore::new();
        let mut processor = CollisionProcessor::new(&PhysicsConfig::default());
        let (near_e, near) = spawn(&mut store, &mut processor, 20.0, 0.0, CollisionType::Active);
        let (_, far) = spawn(&mut store, &mut processor, 60.0, 0.0, CollisionType::Active);
        let ray = Ray::new(Vec2::ZERO, Vec2::new(1.0, 0.0));

        let all = processor.ray_cast(
            &store,
            &ray,
            &RayCastOptions {
                search_all_colliders: true,
                ..RayCastOptions::default()
            },
        );
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].collider, near);
        assert!((all[0].distance - 15.0).abs() < 1e-9);
        assert_eq!(all[1].collider, far);

        let first = processor.ray_cast(&store, &ray, &RayCastOptions::default());
        assert_eq!(first.len(), 1);

        let short = processor.ray_cast(
            &store,
            &ray,
            &RayCastOptions {
                max_distance: 30.0,
                search_all_colliders: true,
                ..RayCastOptions::default()
            },
        );
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].collider, near);

        store.body_mut(near_e).unwrap().group = CollisionGroup::new(0b10, u32::MAX);
        let masked = processor.ray_cast(
            &store,
            &ray,
            &RayCastOptions {
                collision_mask: 0b01,
                search_all_colliders: true,
                ..RayCastOptions::default()
            },
        );
        assert!(masked.is_empty() || masked.iter().all(|h| h.collider == far));
        assert!(masked.iter().all(|h| h.collider != near));

        let filtered = processor.ray_cast(
            &store,
            &ray,
            &RayCastOptions {
                search_all_colliders: true,
                filter: Some(Box::new(move |hit: &RayCastHit| hit.collider == far)),
                ..RayCastOptions::default()
            },
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].collider, far);
    }
}
