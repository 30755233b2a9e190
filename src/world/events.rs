use crossbeam_channel::Sender;
use log::warn;

use crate::colliders::ColliderId;
use crate::collision::contact::{CollisionContact, ContactId};
use crate::collision::side::Side;
use crate::math::Vec2;
use crate::world::store::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Every frame a contact is about to be resolved.
    PreCollision,
    /// Every frame a contact was resolved.
    PostCollision,
    /// First frame two colliders touch.
    CollisionStart,
    /// First frame two colliders stop touching.
    CollisionEnd,
    ContactStart,
    ContactEnd,
    BeforeResolve,
    AfterResolve,
}

/// A collision notification addressed to one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    pub kind: EventKind,
    pub target: EntityId,
    pub other: EntityId,
    pub target_collider: ColliderId,
    pub other_collider: ColliderId,
    /// Side of `target` that was hit.
    pub side: Side,
    /// Overlap vector as seen from `target`.
    pub intersection: Vec2,
    pub contact: ContactId,
}

impl CollisionEvent {
    /// Event for collider A of `contact`, or `None` when either collider has no owner.
    pub fn for_a(kind: EventKind, contact: &CollisionContact, side: Side, intersection: Vec2) -> Option<Self> {
        Some(Self {
            kind,
            target: contact.owner_a?,
            other: contact.owner_b?,
            target_collider: contact.collider_a,
            other_collider: contact.collider_b,
            side,
            intersection,
            contact: contact.id,
        })
    }

    pub fn for_b(kind: EventKind, contact: &CollisionContact, side: Side, intersection: Vec2) -> Option<Self> {
        Some(Self {
            kind,
            target: contact.owner_b?,
            other: contact.owner_a?,
            target_collider: contact.collider_b,
            other_collider: contact.collider_a,
            side,
            intersection,
            contact: contact.id,
        })
    }
}

/// Emits a matching pair of events: A sees `side`/`intersection`, B sees the
/// opposite side and the negated vector.
pub(crate) fn emit_both(
    events: &mut Vec<CollisionEvent>,
    kind: EventKind,
    contact: &CollisionContact,
    side: Side,
    intersection: Vec2,
) {
    events.extend(CollisionEvent::for_a(kind, contact, side, intersection));
    events.extend(CollisionEvent::for_b(kind, contact, side.opposite(), -intersection));
}

/// Receives the batch of events produced by one step.
pub trait EventSink {
    fn publish(&mut self, batch: Vec<CollisionEvent>);
}

impl EventSink for Vec<CollisionEvent> {
    fn publish(&mut self, batch: Vec<CollisionEvent>) {
        self.extend(batch);
    }
}

impl EventSink for Sender<Vec<CollisionEvent>> {
    fn publish(&mut self, batch: Vec<CollisionEvent>) {
        if batch.is_empty() {
            return;
        }
        if self.send(batch).is_err() {
            warn!("collision event receiver disconnected, dropping batch");
        }
    }
}

/// Sink for callers that do not listen.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardEvents;

impl EventSink for DiscardEvents {
    fn publish(&mut self, _batch: Vec<CollisionEvent>) {}
}
