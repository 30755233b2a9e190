use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{info, warn};

use super::messages::{BodyMessage, PolygonColliderMessage, WorkerReply, WorkerRequest};
use crate::colliders::PolygonCollider;
use crate::common::config::PhysicsConfig;
use crate::error::{CollisionError, Result};
use crate::math::Vec2;
use crate::objects::body::CollisionType;
use crate::world::events::DiscardEvents;
use crate::world::physics_world::PhysicsWorld;
use crate::world::store::EntityId;

/// Runs a [`PhysicsWorld`] on its own thread.
///
/// Requests and replies cross the channel as JSON text, one reply per
/// request. Dropping the worker shuts the thread down.
pub struct PhysicsWorker {
    requests: Sender<String>,
    replies: Receiver<String>,
    thread: Option<JoinHandle<()>>,
}

impl PhysicsWorker {
    pub fn spawn(config: PhysicsConfig) -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<String>();
        let (reply_tx, reply_rx) = unbounded::<String>();
        let thread = thread::Builder::new()
            .name("physics-worker".into())
            .spawn(move || serve(config, request_rx, reply_tx))
            .map_err(|e| CollisionError::Worker(e.to_string()))?;
        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            thread: Some(thread),
        })
    }

    /// Adds a body, optionally with a polygon collider, to the remote world.
    pub fn add_body(
        &self,
        body: BodyMessage,
        collision_type: CollisionType,
        collider: Option<PolygonColliderMessage>,
    ) -> Result<()> {
        match self.request(&WorkerRequest::AddBody {
            body,
            collision_type,
            collider,
        })? {
            WorkerReply::Added { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Pushes `bodies` into the remote world, steps it and returns the
    /// resulting state of every body.
    pub fn step(&self, elapsed_ms: f64, bodies: Vec<BodyMessage>) -> Result<Vec<BodyMessage>> {
        match self.request(&WorkerRequest::Step {
            elapsed: elapsed_ms,
            bodies,
        })? {
            WorkerReply::Step { bodies } => Ok(bodies),
            other => Err(unexpected(&other)),
        }
    }

    /// Stops the thread and waits for it.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn request(&self, request: &WorkerRequest) -> Result<WorkerReply> {
        let text = serde_json::to_string(request)?;
        self.requests
            .send(text)
            .map_err(|_| CollisionError::Worker("worker thread has stopped".into()))?;
        let reply = self
            .replies
            .recv()
            .map_err(|_| CollisionError::Worker("worker thread has stopped".into()))?;
        match serde_json::from_str::<WorkerReply>(&reply)? {
            WorkerReply::Error { message } => Err(CollisionError::Worker(message)),
            reply => Ok(reply),
        }
    }

    fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // The thread may already be gone; joining tells us how it ended
        let _ = self.requests.send(serde_json::to_string(&WorkerRequest::Shutdown)?);
        thread
            .join()
            .map_err(|_| CollisionError::Worker("worker thread panicked".into()))
    }
}

impl Drop for PhysicsWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("physics worker did not stop cleanly: {}", e);
        }
    }
}

fn unexpected(reply: &WorkerReply) -> CollisionError {
    CollisionError::Worker(format!("unexpected reply {:?}", reply))
}

// --- Worker Thread --- //

/// The world on the worker side and the caller ids of its bodies.
struct WorkerWorld {
    world: PhysicsWorld,
    bodies: Vec<(u64, EntityId)>,
}

impl WorkerWorld {
    fn handle(&mut self, request: WorkerRequest) -> Result<WorkerReply> {
        match request {
            WorkerRequest::AddBody {
                body,
                collision_type,
                collider,
            } => self.add_body(body, collision_type, collider),
            WorkerRequest::Step { elapsed, bodies } => self.step(elapsed, bodies),
            WorkerRequest::Shutdown => Err(CollisionError::Worker("shutdown is handled by the serve loop".into())),
        }
    }

    fn add_body(
        &mut self,
        message: BodyMessage,
        collision_type: CollisionType,
        collider: Option<PolygonColliderMessage>,
    ) -> Result<WorkerReply> {
        if self.entity(message.id).is_some() {
            return Err(CollisionError::Worker(format!("body {} already exists", message.id)));
        }
        let polygon = match collider {
            Some(collider) => {
                if collider.id != message.id {
                    warn!("collider {} sent with body {}, attaching anyway", collider.id, message.id);
                }
                Some(PolygonCollider::new(collider.points, Vec2::ZERO)?)
            }
            None => None,
        };
        let entity = self.world.add_entity(message.transform(), None);
        let body = self.world.new_body(collision_type);
        self.world.add_body(entity, body)?;
        if let Some(polygon) = polygon {
            self.world.add_collider(entity, polygon)?;
        }
        self.bodies.push((message.id, entity));
        self.apply(&message)?;
        Ok(WorkerReply::Added { id: message.id })
    }

    fn step(&mut self, elapsed: f64, bodies: Vec<BodyMessage>) -> Result<WorkerReply> {
        for message in &bodies {
            self.apply(message)?;
        }
        self.world.step(elapsed, &mut DiscardEvents)?;

        let store = self.world.store();
        let bodies = self
            .bodies
            .iter()
            .filter_map(|&(id, entity)| Some(BodyMessage::new(id, store.transform(entity)?, store.motion(entity)?)))
            .collect();
        Ok(WorkerReply::Step { bodies })
    }

    fn apply(&mut self, message: &BodyMessage) -> Result<()> {
        let Some(entity) = self.entity(message.id) else {
            warn!("step references unknown body {}", message.id);
            return Ok(());
        };
        let store = self.world.store_mut();
        store.set_transform(entity, message.transform())?;
        if let Some(motion) = store.motion_mut(entity) {
            motion.vel = message.velocity;
            motion.acc = message.acceleration;
            motion.angular_velocity = message.angular_velocity;
        }
        Ok(())
    }

    fn entity(&self, id: u64) -> Option<EntityId> {
        self.bodies.iter().find(|(known, _)| *known == id).map(|&(_, entity)| entity)
    }
}

fn serve(config: PhysicsConfig, requests: Receiver<String>, replies: Sender<String>) {
    info!("physics worker started");
    let mut state = WorkerWorld {
        world: PhysicsWorld::new(config),
        bodies: Vec::new(),
    };
    for text in requests.iter() {
        let reply = match serde_json::from_str::<WorkerRequest>(&text) {
            Ok(WorkerRequest::Shutdown) => break,
            Ok(request) => state.handle(request).unwrap_or_else(|e| {
                warn!("physics worker request failed: {}", e);
                WorkerReply::Error { message: e.to_string() }
            }),
            Err(e) => WorkerReply::Error { message: e.to_string() },
        };
        let text = match serde_json::to_string(&reply) {
            Ok(text) => text,
            Err(e) => {
                warn!("physics worker could not encode reply: {}", e);
                continue;
            }
        };
        if replies.send(text).is_err() {
            warn!("physics worker lost its host");
            break;
        }
    }
    info!("physics worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::objects::body::Motion;
    const EPSILON: f64 = 1e-9;

    fn square(id: u64) -> PolygonColliderMessage {
        PolygonColliderMessage {
            id,
            points: vec![
                Vec2::new(-5.0, -5.0),
                Vec2::new(5.0, -5.0),
                Vec2::new(5.0, 5.0),
                Vec2::new(-5.0, 5.0),
            ],
        }
    }

    #[test]
    fn test_zero_elapsed_step_round_trips_bodies() {
        let _ = env_logger::builder().is_test(true).try_init();
        let worker = PhysicsWorker::spawn(PhysicsConfig::default()).unwrap();
        let motion = Motion {
            vel: Vec2::new(3.0, -1.0),
            acc: Vec2::new(0.0, 2.0),
            angular_velocity: 0.25,
            torque: 0.0,
        };
        let a = BodyMessage::new(1, Transform::new(Vec2::new(10.0, 20.0), 0.3), &motion);
        let b = BodyMessage::new(2, Transform::new(Vec2::new(-40.0, 5.0), -1.2), &Motion::default());
        worker.add_body(a.clone(), CollisionType::Active, Some(square(1))).unwrap();
        worker.add_body(b.clone(), CollisionType::Fixed, Some(square(2))).unwrap();

        let out = worker.step(0.0, vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(out.len(), 2);
        for (sent, got) in [a, b].iter().zip(&out) {
            assert_eq!(sent.id, got.id);
            for (x, y) in sent.transform_matrix_data.iter().zip(&got.transform_matrix_data) {
                assert!((x - y).abs() < EPSILON);
            }
            assert!(sent.velocity.distance(got.velocity) < EPSILON);
            assert!(sent.acceleration.distance(got.acceleration) < EPSILON);
            assert!((sent.angular_velocity - got.angular_velocity).abs() < EPSILON);
        }
        worker.shutdown().unwrap();
    }

    #[test]
    fn test_step_moves_bodies() {
        let worker = PhysicsWorker::spawn(PhysicsConfig::default()).unwrap();
        let motion = Motion {
            vel: Vec2::new(100.0, 0.0),
            ..Motion::default()
        };
        let body = BodyMessage::new(9, Transform::identity(), &motion);
        worker.add_body(body, CollisionType::Active, None).unwrap();

        let out = worker.step(500.0, Vec::new()).unwrap();
        assert!((out[0].transform().position.x - 50.0).abs() < EPSILON);
    }

    #[test]
    fn test_errors_are_reported() {
        let worker = PhysicsWorker::spawn(PhysicsConfig::default()).unwrap();
        let body = BodyMessage::new(1, Transform::identity(), &Motion::default());
        worker.add_body(body.clone(), CollisionType::Active, None).unwrap();

        let duplicate = worker.add_body(body, CollisionType::Active, None);
        assert!(matches!(duplicate, Err(CollisionError::Worker(_))));

        let degenerate = PolygonColliderMessage {
            id: 2,
            points: vec![Vec2::ZERO, Vec2::ONE],
        };
        let bad = worker.add_body(
            BodyMessage::new(2, Transform::identity(), &Motion::default()),
            CollisionType::Active,
            Some(degenerate),
        );
        assert!(matches!(bad, Err(CollisionError::Worker(_))));

        // Still serving after failures
        assert_eq!(worker.step(16.0, Vec::new()).unwrap().len(), 1);
    }
}
