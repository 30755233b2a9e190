use smallvec::SmallVec;

use super::pair::PairId;
use super::side::Side;
use crate::colliders::{Collider, ColliderId};
use crate::math::{LineSegment, Vec2};
use crate::objects::body::CollisionType;
use crate::world::store::{EntityId, EntityStore};

/// Stable identity of a contact across frames.
///
/// `composite` is set when either collider is part of a composite, so all
/// the sub-shape contacts of one composite pair share a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId {
    pub pair: PairId,
    pub composite: Option<PairId>,
}

impl ContactId {
    /// Key used for start/end tracking.
    pub fn lifecycle_key(&self) -> PairId {
        self.composite.unwrap_or(self.pair)
    }
}

/// How the narrowphase found the contact: the reference collider and face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparationInfo {
    pub collider: ColliderId,
    /// Signed distance along `axis`; negative when overlapping.
    pub separation: f64,
    pub axis: Vec2,
    pub point: Vec2,
    pub local_point: Option<Vec2>,
    /// World-space reference side, for polygons and edges.
    pub side: Option<LineSegment>,
    /// The same side in the reference body's space.
    pub local_side: Option<LineSegment>,
    pub side_id: Option<usize>,
}

impl SeparationInfo {
    pub fn new(collider: ColliderId, separation: f64, axis: Vec2, point: Vec2) -> Self {
        Self {
            collider,
            separation,
            axis,
            point,
            local_point: None,
            side: None,
            local_side: None,
            side_id: None,
        }
    }
}

/// Contact geometry between two colliders for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionContact {
    pub id: ContactId,
    pub collider_a: ColliderId,
    pub collider_b: ColliderId,
    pub owner_a: Option<EntityId>,
    pub owner_b: Option<EntityId>,
    /// Moving A by `-mtv` (or B by `+mtv`) removes the overlap.
    pub mtv: Vec2,
    /// Unit normal pointing from A toward B.
    pub normal: Vec2,
    pub tangent: Vec2,
    pub points: SmallVec<[Vec2; 2]>,
    /// `points` in body space.
    pub local_points: SmallVec<[Vec2; 2]>,
    pub info: SeparationInfo,
    canceled: bool,
}

impl CollisionContact {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: &Collider,
        b: &Collider,
        mtv: Vec2,
        normal: Vec2,
        tangent: Vec2,
        points: SmallVec<[Vec2; 2]>,
        local_points: SmallVec<[Vec2; 2]>,
        info: SeparationInfo,
    ) -> Self {
        let composite = if a.composite.is_some() || b.composite.is_some() {
            Some(PairId::new(a.composite.unwrap_or(a.id), b.composite.unwrap_or(b.id)))
        } else {
            None
        };
        Self {
            id: ContactId {
                pair: PairId::new(a.id, b.id),
                composite,
            },
            collider_a: a.id,
            collider_b: b.id,
            owner_a: a.owner,
            owner_b: b.owner,
            mtv,
            normal,
            tangent,
            points,
            local_points,
            info,
            canceled: false,
        }
    }

    /// Drops the contact from resolution for this frame.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Side of A that was hit.
    pub fn side_a(&self) -> Side {
        Side::from_direction(self.mtv)
    }

    pub fn side_b(&self) -> Side {
        self.side_a().opposite()
    }

    /// The other collider of the contact, if `collider` takes part in it.
    pub fn other(&self, collider: ColliderId) -> Option<ColliderId> {
        if collider == self.collider_a {
            Some(self.collider_b)
        } else if collider == self.collider_b {
            Some(self.collider_a)
        } else {
            None
        }
    }

    /// Wakes a sleeping participant when its partner is moving enough.
    pub fn match_awake(&self, store: &mut EntityStore, wake_threshold: f64) {
        let (Some(owner_a), Some(owner_b)) = (self.owner_a, self.owner_b) else {
            return;
        };
        let (Some(a), Some(b)) = (store.body(owner_a).cloned(), store.body(owner_b).cloned()) else {
            return;
        };
        if a.sleeping == b.sleeping {
            return;
        }
        if a.sleeping && a.collision_type != CollisionType::Fixed && b.sleep_motion >= wake_threshold {
            store.set_sleeping(owner_a, false);
        }
        if b.sleeping && b.collision_type != CollisionType::Fixed && a.sleep_motion >= wake_threshold {
            store.set_sleeping(owner_b, false);
        }
    }
}
