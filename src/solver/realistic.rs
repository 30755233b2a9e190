use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::{contact_bodies, either_passive, order_contacts, CollisionSolver, ContactConstraintPoint, SolveOrder, MTV_EPSILON};
use crate::collision::contact::{CollisionContact, ContactId};
use crate::collision::jump_table::find_contact_separation;
use crate::common::config::RealisticConfig;
use crate::math::Vec2;
use crate::objects::body::DegreeOfFreedom;
use crate::world::events::{emit_both, CollisionEvent, EventKind};
use crate::world::store::{EntityId, EntityStore};

/// Largest positional correction applied per point and iteration.
const MAX_CORRECTION: f64 = -5.0;
/// Approach speed below which restitution is ignored.
const RESTITUTION_THRESHOLD: f64 = -0.1;
/// Squared distance within which a contact point keeps last frame's impulses.
const REUSE_DISTANCE_SQUARED: f64 = 4.0;
/// Two-point manifolds whose effective mass matrix is worse conditioned
/// than this are solved one point at a time.
const MAX_CONDITION_NUMBER: f64 = 1000.0;

type ConstraintPoints = SmallVec<[ContactConstraintPoint; 2]>;

/// Sequential impulse solver with friction, restitution, rotation and warm
/// starting.
///
/// Velocity is solved first, then position, since non-overlap is what
/// matters most at the end of a step. Accumulated impulses are cached per
/// contact id and fed back in on the next frame, which keeps tall stacks
/// stable. Both points of a two-point manifold are solved together.
///
/// The integrator has already moved bodies by the time contacts are known.
/// Once the step length is set through [`CollisionSolver::begin_step`], the
/// velocity the solver adds is also carried into positions for that step.
#[derive(Debug, Clone, Default)]
pub struct RealisticSolver {
    config: RealisticConfig,
    order: FxHashMap<ContactId, SolveOrder>,
    constraints: FxHashMap<ContactId, ConstraintPoints>,
    step_seconds: f64,
}

impl RealisticSolver {
    pub fn new(config: RealisticConfig) -> Self {
        Self {
            config,
            order: FxHashMap::default(),
            constraints: FxHashMap::default(),
            step_seconds: 0.0,
        }
    }

    /// Cached constraint points of a contact, empty if unknown.
    pub fn contact_constraints(&self, id: &ContactId) -> &[ContactConstraintPoint] {
        self.constraints.get(id).map_or(&[], |points| points.as_slice())
    }

    fn pre_solve(&mut self, store: &mut EntityStore, contacts: &mut [CollisionContact], events: &mut Vec<CollisionEvent>) {
        self.order.clear();
        let wake_threshold = store.body_config().wake_threshold;
        for contact in contacts.iter_mut() {
            if contact.mtv.x.abs() < MTV_EPSILON && contact.mtv.y.abs() < MTV_EPSILON {
                contact.cancel();
                continue;
            }
            let side = contact.side_a();
            self.order.insert(contact.id, SolveOrder::new(contact));
            emit_both(events, EventKind::PreCollision, contact, side, contact.mtv);
            emit_both(events, EventKind::BeforeResolve, contact, side, contact.mtv);
            contact.match_awake(store, wake_threshold);
        }

        let live: FxHashSet<ContactId> = contacts.iter().filter(|c| !c.is_canceled()).map(|c| c.id).collect();
        for contact in contacts.iter().filter(|c| !c.is_canceled()) {
            let previous = self.constraints.remove(&contact.id).unwrap_or_default();
            let points = build_constraint_points(store, contact, previous);
            self.constraints.insert(contact.id, points);
        }
        // Contacts that did not happen this frame lose their cached impulses
        self.constraints.retain(|id, _| live.contains(id));

        for contact in contacts.iter().filter(|c| !c.is_canceled()) {
            self.warm_start(store, contact);
        }
    }

    /// Re-applies last frame's accumulated impulses, or zeroes them when
    /// warm starting is off.
    fn warm_start(&mut self, store: &mut EntityStore, contact: &CollisionContact) {
        let Some((owner_a, _, owner_b, _)) = contact_bodies(store, contact) else {
            return;
        };
        let Some(points) = self.constraints.get_mut(&contact.id) else {
            return;
        };
        for point in points.iter_mut() {
            if self.config.warm_start {
                let impulse = contact.normal * point.normal_impulse + contact.tangent * point.tangent_impulse;
                store.apply_impulse(owner_a, point.point, -impulse);
                store.apply_impulse(owner_b, point.point, impulse);
            } else {
                point.normal_impulse = 0.0;
                point.tangent_impulse = 0.0;
            }
        }
    }

    fn solve_velocity(&mut self, store: &mut EntityStore, contacts: &[CollisionContact]) {
        for _ in 0..self.config.velocity_iterations {
            for contact in contacts {
                let Some((owner_a, body_a, owner_b, body_b)) = contact_bodies(store, contact) else {
                    continue;
                };
                if either_passive(body_a, body_b) {
                    continue;
                }
                let friction = body_a.material.combined_friction(&body_b.material);
                let Some(points) = self.constraints.get_mut(&contact.id) else {
                    continue;
                };

                // --- Friction --- //
                for point in points.iter_mut() {
                    let relative_velocity = point.relative_velocity(store, contact);
                    let tangent_velocity = -relative_velocity.dot(contact.tangent);
                    let mut impulse_delta = tangent_velocity * point.tangent_mass;

                    // Accumulated friction stays within the friction cone; deltas may not
                    let max_friction = friction * point.normal_impulse;
                    let new_impulse = (point.tangent_impulse + impulse_delta).clamp(-max_friction, max_friction);
                    impulse_delta = new_impulse - point.tangent_impulse;
                    point.tangent_impulse = new_impulse;

                    let impulse = contact.tangent * impulse_delta;
                    apply_pair_impulse(store, owner_a, owner_b, point.point, impulse);
                }

                // --- Normal --- //
                if points.len() == 2 && solve_normal_block(store, contact, owner_a, owner_b, points) {
                    continue;
                }
                for point in points.iter_mut() {
                    let relative_velocity = point.relative_velocity(store, contact);
                    let normal_velocity = relative_velocity.dot(contact.normal);
                    let mut impulse_delta =
                        -point.normal_mass * (normal_velocity - point.original_velocity_and_restitution);

                    // Accumulated impulse only ever pushes
                    let new_impulse = (point.normal_impulse + impulse_delta).max(0.0);
                    impulse_delta = new_impulse - point.normal_impulse;
                    point.normal_impulse = new_impulse;

                    let impulse = contact.normal * impulse_delta;
                    apply_pair_impulse(store, owner_a, owner_b, point.point, impulse);
                }
            }
        }
    }

    /// Moves bodies by the velocity added since `before` was taken, over
    /// the current step length.
    fn carry_into_step(&self, store: &mut EntityStore, before: &[(EntityId, Vec2, f64)]) {
        if self.step_seconds <= 0.0 {
            return;
        }
        for &(owner, vel, angular_velocity) in before {
            if !store.body(owner).is_some_and(|b| b.is_active()) {
                continue;
            }
            let (Some(tx), Some(motion)) = (store.transform(owner), store.motion(owner)) else {
                continue;
            };
            let position = tx.position + (motion.vel - vel) * self.step_seconds;
            let rotation = tx.rotation + (motion.angular_velocity - angular_velocity) * self.step_seconds;
            store.place(owner, position, rotation);
        }
    }

    fn solve_position(&self, store: &mut EntityStore, contacts: &[CollisionContact]) {
        for _ in 0..self.config.position_iterations {
            for contact in contacts {
                let Some((owner_a, body_a, owner_b, body_b)) = contact_bodies(store, contact) else {
                    continue;
                };
                if either_passive(body_a, body_b) {
                    continue;
                }
                let (active_a, active_b) = (body_a.is_active(), body_b.is_active());
                let (locks_a, locks_b) = (body_a.limit_degree_of_freedom, body_b.limit_degree_of_freedom);
                let (inv_mass_a, inv_mass_b) = (body_a.inverse_mass(), body_b.inverse_mass());
                let (inv_inertia_a, inv_inertia_b) = (store.inverse_inertia(owner_a), store.inverse_inertia(owner_b));
                let (Some(tx_a), Some(tx_b)) = (store.transform(owner_a), store.transform(owner_b)) else {
                    continue;
                };

                // Every point is measured against the same poses before any push
                let pushes: SmallVec<[(Vec2, Vec2, Vec2); 2]> = self
                    .contact_constraints(&contact.id)
                    .iter()
                    .map(|point| {
                        let separation = find_contact_separation(&store.colliders, contact, point.local, &tx_a, &tx_b);
                        let steering =
                            (self.config.steering_factor * (separation + self.config.slop)).clamp(MAX_CORRECTION, 0.0);
                        let impulse = contact.normal * (-steering * point.normal_mass);
                        (point.a_to_contact, point.b_to_contact, impulse)
                    })
                    .collect();

                // Pseudo impulses: position and rotation move, velocity is untouched
                for (a_to_contact, b_to_contact, impulse) in pushes {
                    if active_a {
                        nudge(store, owner_a, locks_a, inv_mass_a, inv_inertia_a, a_to_contact, -impulse);
                    }
                    if active_b {
                        nudge(store, owner_b, locks_b, inv_mass_b, inv_inertia_b, b_to_contact, impulse);
                    }
                }
            }
        }
    }

    fn post_solve(&self, store: &mut EntityStore, contacts: &[CollisionContact], events: &mut Vec<CollisionEvent>) {
        let config = *store.body_config();
        for contact in contacts {
            if let Some((owner_a, body_a, owner_b, body_b)) = contact_bodies(store, contact) {
                if either_passive(body_a, body_b) {
                    continue;
                }
                // Sleep bookkeeping
                for owner in [owner_a, owner_b] {
                    if let Some((body, motion)) = store.body_and_motion_mut(owner) {
                        body.update_motion(motion, &config);
                    }
                }
            }
            let side = contact.side_a();
            emit_both(events, EventKind::PostCollision, contact, side, contact.mtv);
            emit_both(events, EventKind::AfterResolve, contact, side, contact.mtv);
        }
    }
}

impl CollisionSolver for RealisticSolver {
    fn begin_step(&mut self, elapsed_ms: f64) {
        self.step_seconds = elapsed_ms / 1000.0;
    }

    fn solve(
        &mut self,
        store: &mut EntityStore,
        mut contacts: Vec<CollisionContact>,
        events: &mut Vec<CollisionEvent>,
    ) -> Vec<CollisionContact> {
        let before = motion_snapshot(store, &contacts);
        self.pre_solve(store, &mut contacts, events);
        contacts.retain(|c| !c.is_canceled());
        order_contacts(&mut contacts, &self.order, self.config.contact_solve_bias);

        self.solve_velocity(store, &contacts);
        self.carry_into_step(store, &before);
        self.solve_position(store, &contacts);

        self.post_solve(store, &contacts, events);
        contacts
    }
}

/// Builds this frame's constraint points, keeping accumulated impulses of
/// points that barely moved since last frame.
fn build_constraint_points(store: &EntityStore, contact: &CollisionContact, mut previous: ConstraintPoints) -> ConstraintPoints {
    let Some((owner_a, body_a, owner_b, body_b)) = contact_bodies(store, contact) else {
        return previous;
    };
    let (inv_mass_a, inv_mass_b) = (body_a.inverse_mass(), body_b.inverse_mass());
    let (inv_inertia_a, inv_inertia_b) = (store.inverse_inertia(owner_a), store.inverse_inertia(owner_b));
    let restitution = body_a.material.combined_bounciness(&body_b.material);
    let center_a = store.colliders.center(contact.collider_a);
    let center_b = store.colliders.center(contact.collider_b);

    let mut points = ConstraintPoints::new();
    for (index, point) in contact.points.iter().enumerate() {
        let local = contact.local_points.get(index).copied().unwrap_or(*point);
        let a_to_contact = *point - center_a;
        let b_to_contact = *point - center_b;

        let rn_a = a_to_contact.cross(contact.normal);
        let rn_b = b_to_contact.cross(contact.normal);
        let normal_mass = inv_mass_a + inv_mass_b + inv_inertia_a * rn_a * rn_a + inv_inertia_b * rn_b * rn_b;

        let rt_a = a_to_contact.cross(contact.tangent);
        let rt_b = b_to_contact.cross(contact.tangent);
        let tangent_mass = inv_mass_a + inv_mass_b + inv_inertia_a * rt_a * rt_a + inv_inertia_b * rt_b * rt_b;

        let mut constraint = match previous.get_mut(index) {
            Some(old) if old.point.distance_squared(*point) < REUSE_DISTANCE_SQUARED => {
                old.point = *point;
                old.local = local;
                *old
            }
            _ => ContactConstraintPoint::new(*point, local),
        };
        constraint.a_to_contact = a_to_contact;
        constraint.b_to_contact = b_to_contact;
        constraint.normal_mass = inverse_or_zero(normal_mass);
        constraint.tangent_mass = inverse_or_zero(tangent_mass);

        // Restitution is applied against the approach speed before solving
        let relative_velocity = contact.normal.dot(constraint.relative_velocity(store, contact));
        constraint.original_velocity_and_restitution = if relative_velocity < RESTITUTION_THRESHOLD {
            -restitution * relative_velocity
        } else {
            0.0
        };
        points.push(constraint);
    }
    points
}

/// Solves the normal constraints of a two-point manifold together, as a
/// 2x2 complementarity problem: the first of "both push", "only the first
/// pushes", "only the second pushes" and "neither pushes" whose impulses
/// are non-negative and leave no point approaching wins. Returns false when
/// the pair is too badly conditioned to solve this way.
fn solve_normal_block(
    store: &mut EntityStore,
    contact: &CollisionContact,
    owner_a: EntityId,
    owner_b: EntityId,
    points: &mut [ContactConstraintPoint],
) -> bool {
    let [first, second] = points else {
        return false;
    };
    let linear = store.inverse_mass(owner_a) + store.inverse_mass(owner_b);
    let (inv_inertia_a, inv_inertia_b) = (store.inverse_inertia(owner_a), store.inverse_inertia(owner_b));
    let n = contact.normal;
    let (rn1_a, rn1_b) = (first.a_to_contact.cross(n), first.b_to_contact.cross(n));
    let (rn2_a, rn2_b) = (second.a_to_contact.cross(n), second.b_to_contact.cross(n));

    let k11 = linear + inv_inertia_a * rn1_a * rn1_a + inv_inertia_b * rn1_b * rn1_b;
    let k22 = linear + inv_inertia_a * rn2_a * rn2_a + inv_inertia_b * rn2_b * rn2_b;
    let k12 = linear + inv_inertia_a * rn1_a * rn2_a + inv_inertia_b * rn1_b * rn2_b;
    let det = k11 * k22 - k12 * k12;
    if k11 * k11 >= MAX_CONDITION_NUMBER * det {
        return false;
    }

    let (old1, old2) = (first.normal_impulse, second.normal_impulse);
    let b1 = normal_speed(store, contact, first) - (k11 * old1 + k12 * old2);
    let b2 = normal_speed(store, contact, second) - (k12 * old1 + k22 * old2);
    let candidates = [
        ((k12 * b2 - k22 * b1) / det, (k12 * b1 - k11 * b2) / det),
        (-b1 / k11, 0.0),
        (0.0, -b2 / k22),
        (0.0, 0.0),
    ];
    let solution = candidates.into_iter().find(|&(x1, x2)| {
        let vn1 = k11 * x1 + k12 * x2 + b1;
        let vn2 = k12 * x1 + k22 * x2 + b2;
        x1 >= 0.0 && x2 >= 0.0 && (x1 > 0.0 || vn1 >= 0.0) && (x2 > 0.0 || vn2 >= 0.0)
    });
    // No consistent case: keep last iteration's impulses
    let Some((x1, x2)) = solution else {
        return true;
    };
    for (point, impulse) in [(first, x1), (second, x2)] {
        let delta = impulse - point.normal_impulse;
        point.normal_impulse = impulse;
        apply_pair_impulse(store, owner_a, owner_b, point.point, contact.normal * delta);
    }
    true
}

/// Normal closing speed of a point relative to its restitution target.
fn normal_speed(store: &EntityStore, contact: &CollisionContact, point: &ContactConstraintPoint) -> f64 {
    point.relative_velocity(store, contact).dot(contact.normal) - point.original_velocity_and_restitution
}

/// Linear and angular velocity of every body in `contacts`, in first-seen order.
fn motion_snapshot(store: &EntityStore, contacts: &[CollisionContact]) -> Vec<(EntityId, Vec2, f64)> {
    let mut seen = FxHashSet::default();
    contacts
        .iter()
        .flat_map(|c| [c.owner_a, c.owner_b])
        .flatten()
        .filter(|owner| seen.insert(*owner))
        .filter_map(|owner| store.motion(owner).map(|m| (owner, m.vel, m.angular_velocity)))
        .collect()
}

/// Moves an active body by a pseudo impulse at lever arm `lever`.
fn nudge(
    store: &mut EntityStore,
    owner: EntityId,
    locks: DegreeOfFreedom,
    inv_mass: f64,
    inv_inertia: f64,
    lever: Vec2,
    impulse: Vec2,
) {
    let Some(tx) = store.transform(owner) else {
        return;
    };
    let shift = lock_axes(impulse * inv_mass, locks);
    let mut rotation = tx.rotation;
    if !locks.contains(DegreeOfFreedom::ROTATION) {
        rotation += lever.cross(impulse) * inv_inertia;
    }
    store.place(owner, tx.position + shift, rotation);
}

fn apply_pair_impulse(store: &mut EntityStore, owner_a: EntityId, owner_b: EntityId, point: Vec2, impulse: Vec2) {
    store.apply_impulse(owner_a, point, -impulse);
    store.apply_impulse(owner_b, point, impulse);
}

fn lock_axes(mut shift: Vec2, locks: DegreeOfFreedom) -> Vec2 {
    if locks.contains(DegreeOfFreedom::X) {
        shift.x = 0.0;
    }
    if locks.contains(DegreeOfFreedom::Y) {
        shift.y = 0.0;
    }
    shift
}

fn inverse_or_zero(value: f64) -> f64 {
    if value > 0.0 {
        1.0 / value
    } else {
        0.0
    }
}
