//! Physics world: body ownership on top of a rapier2d pipeline
//!
//! Gameplay code reads and writes `Body` records. Each step pushes any
//! changed positions, velocities and accumulated forces into rapier, runs
//! the pipeline, then reads the results back.
//!
//! Velocities on `Body` are in pixels per base tick and forces follow the
//! same convention (`Δv = F / m · dt · base_dt` with times in milliseconds).
//! Rapier works in pixels and seconds; the conversions live here.

use std::collections::HashMap;
use std::fmt;

use glam::Vec2;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use super::body::{Body, BodyId, Category, Shape};
use crate::consts::{DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH};
use crate::error::ConfigError;

const MS_PER_SECOND: f32 = 1000.0;
/// px/ms² to px/s²
const ACCEL_MS_TO_S: f32 = MS_PER_SECOND * MS_PER_SECOND;
/// Squared drift below which a gameplay write is not pushed to the solver
const SYNC_EPSILON: f32 = 1.0e-6;

/// Playfield size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WORLD_WIDTH,
            height: DEFAULT_WORLD_HEIGHT,
        }
    }
}

impl WorldConfig {
    /// Validated constructor; non-positive (or NaN) sizes are rejected
    pub fn new(width: f32, height: f32) -> Result<Self, ConfigError> {
        let config = Self { width, height };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width > 0.0 && self.height > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Gravity, unit conventions and solver tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity direction and strength (y-down)
    pub gravity: Vec2,
    pub gravity_scale: f32,
    /// Reference tick length that velocities are expressed in
    pub base_delta_ms: f32,
    /// Pixels per solver length unit
    pub length_unit: f32,
    /// Penetration allowed before the solver pushes bodies apart, in pixels
    pub position_slop: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 0.5),
            gravity_scale: 0.001,
            base_delta_ms: 1000.0 / 60.0,
            length_unit: 100.0,
            position_slop: 0.05,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("physics.base_delta_ms", self.base_delta_ms),
            ("physics.length_unit", self.length_unit),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        if !(self.position_slop >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "physics.position_slop",
                reason: format!("must not be negative, got {}", self.position_slop),
            });
        }
        Ok(())
    }

    /// Multiplier from px per base tick to px per second
    #[inline]
    pub fn velocity_scale(&self) -> f32 {
        MS_PER_SECOND / self.base_delta_ms
    }

    /// Gravity as an acceleration in px/s²
    pub fn gravity_per_second(&self) -> Vec2 {
        self.gravity * self.gravity_scale * ACCEL_MS_TO_S
    }

    fn integration_parameters(&self) -> IntegrationParameters {
        let mut params = IntegrationParameters::default();
        params.length_unit = self.length_unit;
        params.normalized_allowed_linear_error = self.position_slop / self.length_unit;
        params
    }
}

/// Two bodies that started touching during a step. `a < b` by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub a: BodyId,
    pub a_category: Category,
    pub b: BodyId,
    pub b_category: Category,
}

/// Owns every body in the simulation
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bounds: WorldConfig,
    /// Gameplay view of every body, sorted by id for stable iteration
    bodies: Vec<Body>,
    next_id: u32,

    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    body_handles: HashMap<BodyId, RigidBodyHandle>,
    collider_to_body: HashMap<ColliderHandle, BodyId>,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("bounds", &self.bounds)
            .field("bodies", &self.bodies.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    pub fn new(bounds: WorldConfig, config: PhysicsConfig) -> Result<Self, ConfigError> {
        bounds.validate()?;
        config.validate()?;
        let gravity = config.gravity_per_second();
        Ok(Self {
            config,
            bounds,
            bodies: Vec::new(),
            next_id: 1,
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity.x, gravity.y],
            integration_params: config.integration_parameters(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            body_handles: HashMap::new(),
            collider_to_body: HashMap::new(),
        })
    }

    #[inline]
    pub fn bounds(&self) -> &WorldConfig {
        &self.bounds
    }

    #[inline]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Allocate a fresh body id
    pub fn next_body_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a body built with an id from [`next_body_id`](Self::next_body_id)
    pub fn add_body(&mut self, body: Body) -> BodyId {
        let id = body.id;
        if self.body_handles.contains_key(&id) {
            log::warn!("Body {id:?} already present, replacing");
            self.detach(id);
        }
        self.attach(&body);
        match self.bodies.binary_search_by_key(&id, |b| b.id) {
            Ok(idx) => self.bodies[idx] = body,
            Err(idx) => self.bodies.insert(idx, body),
        }
        id
    }

    /// Remove a body. Missing ids are a no-op returning `None`.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let idx = self.bodies.binary_search_by_key(&id, |b| b.id).ok()?;
        self.detach(id);
        Some(self.bodies.remove(idx))
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.bodies
            .binary_search_by_key(&id, |b| b.id)
            .ok()
            .map(|idx| &self.bodies[idx])
    }

    /// Writes to position, velocity and force reach the solver on the next step
    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies
            .binary_search_by_key(&id, |b| b.id)
            .ok()
            .map(move |idx| &mut self.bodies[idx])
    }

    #[inline]
    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Drop every body and contact
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.body_handles.clear();
        self.collider_to_body.clear();
        self.island_manager = IslandManager::new();
        self.broad_phase = DefaultBroadPhase::new();
        self.narrow_phase = NarrowPhase::new();
        self.rigid_body_set = RigidBodySet::new();
        self.collider_set = ColliderSet::new();
        self.impulse_joint_set = ImpulseJointSet::new();
        self.multibody_joint_set = MultibodyJointSet::new();
        self.ccd_solver = CCDSolver::new();
    }

    /// Accumulate a force for the next step. Returns false for a missing body.
    pub fn apply_force(&mut self, id: BodyId, force: Vec2) -> bool {
        self.get_mut(id).map(|b| b.apply_force(force)).is_some()
    }

    pub fn set_velocity(&mut self, id: BodyId, vel: Vec2) -> bool {
        self.get_mut(id).map(|b| b.vel = vel).is_some()
    }

    pub fn set_position(&mut self, id: BodyId, pos: Vec2) -> bool {
        self.get_mut(id).map(|b| b.pos = pos).is_some()
    }

    /// Advance all dynamic bodies by `delta_ms` and return pairs that began
    /// touching this step, ordered by id.
    pub fn step(&mut self, delta_ms: f32) -> Vec<CollisionPair> {
        self.push_bodies();
        self.integration_params.dt = delta_ms / MS_PER_SECOND;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut began = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                if let Some(pair) = self.pair_for(h1, h2) {
                    began.push(pair);
                }
            }
        }
        // Event delivery order is not part of the contract
        began.sort_by_key(|p| (p.a, p.b));
        began.dedup();

        self.pull_bodies();
        began
    }

    fn pair_for(&self, h1: ColliderHandle, h2: ColliderHandle) -> Option<CollisionPair> {
        let x = *self.collider_to_body.get(&h1)?;
        let y = *self.collider_to_body.get(&h2)?;
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        Some(CollisionPair {
            a,
            a_category: self.get(a)?.category,
            b,
            b_category: self.get(b)?.category,
        })
    }

    /// Create the rapier body and collider for `body`
    fn attach(&mut self, body: &Body) {
        let scale = self.config.velocity_scale();
        let builder = if body.is_static {
            RigidBodyBuilder::fixed()
        } else {
            let vel = body.vel * scale;
            RigidBodyBuilder::dynamic()
                .linvel(vector![vel.x, vel.y])
                .linear_damping(body.material.air_friction * scale)
                .ccd_enabled(true)
        };
        let rigid_body = builder
            .translation(vector![body.pos.x, body.pos.y])
            .rotation(body.angle)
            .build();
        let handle = self.rigid_body_set.insert(rigid_body);

        let collider = ColliderBuilder::new(collider_shape(&body.shape))
            .density(body.material.density)
            .friction(body.material.friction)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .restitution(body.material.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        self.body_handles.insert(body.id, handle);
        self.collider_to_body.insert(collider_handle, body.id);
    }

    /// Remove the rapier body and its colliders
    fn detach(&mut self, id: BodyId) {
        let Some(handle) = self.body_handles.remove(&id) else {
            return;
        };
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.collider_to_body.retain(|_, body| *body != id);
    }

    /// Hand gameplay writes and pending forces to the solver
    fn push_bodies(&mut self) {
        let scale = self.config.velocity_scale();
        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            let Some(rb) = self
                .body_handles
                .get(&body.id)
                .and_then(|&h| self.rigid_body_set.get_mut(h))
            else {
                continue;
            };

            let pos = vector![body.pos.x, body.pos.y];
            if (*rb.translation() - pos).norm_squared() > SYNC_EPSILON {
                rb.set_translation(pos, true);
            }
            let vel = body.vel * scale;
            let vel = vector![vel.x, vel.y];
            if (*rb.linvel() - vel).norm_squared() > SYNC_EPSILON {
                rb.set_linvel(vel, true);
            }

            rb.reset_forces(false);
            if body.force != Vec2::ZERO {
                let force = body.force * ACCEL_MS_TO_S;
                rb.add_force(vector![force.x, force.y], true);
                body.force = Vec2::ZERO;
            }
        }
    }

    /// Copy solver results back onto the gameplay records
    fn pull_bodies(&mut self) {
        let scale = self.config.velocity_scale();
        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            let Some(rb) = self
                .body_handles
                .get(&body.id)
                .and_then(|&h| self.rigid_body_set.get(h))
            else {
                continue;
            };
            let pos = rb.translation();
            let vel = rb.linvel();
            body.pos = Vec2::new(pos.x, pos.y);
            body.vel = Vec2::new(vel.x, vel.y) / scale;
            body.angle = rb.rotation().angle();
        }
    }
}

fn collider_shape(shape: &Shape) -> SharedShape {
    match *shape {
        Shape::Circle { radius } => SharedShape::ball(radius),
        Shape::Rect { half_extents } => SharedShape::cuboid(half_extents.x, half_extents.y),
        Shape::Polygon { radius, .. } => {
            let points: Vec<Point<Real>> = shape
                .local_vertices()
                .into_iter()
                .map(|v| point![v.x, v.y])
                .collect();
            SharedShape::convex_hull(&points).unwrap_or_else(|| {
                log::warn!("Degenerate polygon {shape:?}, using a ball collider");
                SharedShape::ball(radius)
            })
        }
    }
}
