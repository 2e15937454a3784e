//! Entity lifecycle: initial layout, random spawns, echoes and removal
//!
//! The manager tracks which body ids belong to which role. Bodies themselves
//! live in the physics world, so every mutation here touches both.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{Body, BodyId, Category, Material, Shape};
use super::echo::Echo;
use super::physics::PhysicsWorld;
use crate::Millis;
use crate::consts::*;
use crate::error::ConfigError;

/// Per-tick spawn probabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub enemy_chance: f64,
    pub pickup_chance: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            enemy_chance: ENEMY_SPAWN_CHANCE,
            pickup_chance: PICKUP_SPAWN_CHANCE,
        }
    }
}

impl SpawnConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("spawn.enemy_chance", self.enemy_chance),
            ("spawn.pickup_chance", self.pickup_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("probability must be within [0, 1], got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Bodies spawned by one probabilistic roll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnRoll {
    pub enemy: Option<BodyId>,
    pub pickup: Option<BodyId>,
}

/// Tracks every gameplay entity by role
#[derive(Debug, Clone)]
pub struct EntityManager {
    spawn: SpawnConfig,
    rng: Pcg32,
    avatar: Option<BodyId>,
    platforms: Vec<BodyId>,
    enemies: Vec<BodyId>,
    pickups: Vec<BodyId>,
    echoes: Vec<Echo>,
}

impl EntityManager {
    pub fn new(seed: u64, spawn: SpawnConfig) -> Self {
        Self {
            spawn,
            rng: Pcg32::seed_from_u64(seed),
            avatar: None,
            platforms: Vec::new(),
            enemies: Vec::new(),
            pickups: Vec::new(),
            echoes: Vec::new(),
        }
    }

    #[inline]
    pub fn avatar(&self) -> Option<BodyId> {
        self.avatar
    }

    pub fn platforms(&self) -> &[BodyId] {
        &self.platforms
    }

    pub fn enemies(&self) -> &[BodyId] {
        &self.enemies
    }

    pub fn pickups(&self) -> &[BodyId] {
        &self.pickups
    }

    pub fn echoes(&self) -> &[Echo] {
        &self.echoes
    }

    /// Create the avatar at the world centre and the starting platforms
    pub fn populate(&mut self, world: &mut PhysicsWorld) {
        let bounds = *world.bounds();
        let (w, h) = (bounds.width, bounds.height);

        let avatar = world.next_body_id();
        world.add_body(Body::new(
            avatar,
            Category::Avatar,
            Shape::Circle {
                radius: AVATAR_RADIUS,
            },
            Material::AVATAR,
            bounds.center(),
        ));
        self.avatar = Some(avatar);

        // (centre, size): ground plus three floating ledges
        let layout = [
            (Vec2::new(w / 2.0, h - 20.0), Vec2::new(w, 20.0)),
            (Vec2::new(w / 4.0, h - 120.0), Vec2::new(200.0, 15.0)),
            (Vec2::new(w * 0.75, h - 220.0), Vec2::new(200.0, 15.0)),
            (Vec2::new(w / 2.0, h - 320.0), Vec2::new(150.0, 15.0)),
        ];
        for (center, size) in layout {
            let id = world.next_body_id();
            world.add_body(Body::new_static(
                id,
                Category::Platform,
                Shape::Rect {
                    half_extents: size / 2.0,
                },
                center,
            ));
            self.platforms.push(id);
        }

        log::debug!(
            "Populated {}x{} world with avatar {:?} and {} platforms",
            w,
            h,
            avatar,
            self.platforms.len()
        );
    }

    /// Triangle at a random x along the top edge, launched downward
    pub fn spawn_enemy(&mut self, world: &mut PhysicsWorld) -> BodyId {
        let width = world.bounds().width;
        let x = self.rng.random_range(0.0..width);
        let vel = Vec2::new(
            self.rng.random_range(ENEMY_VX_RANGE.0..=ENEMY_VX_RANGE.1),
            self.rng.random_range(ENEMY_VY_RANGE.0..=ENEMY_VY_RANGE.1),
        );

        let id = world.next_body_id();
        let mut body = Body::new(
            id,
            Category::Enemy,
            Shape::Polygon {
                sides: 3,
                radius: ENEMY_RADIUS,
            },
            Material::ENEMY,
            Vec2::new(x, 0.0),
        );
        body.vel = vel;
        world.add_body(body);
        self.enemies.push(id);
        log::trace!("Spawned enemy {id:?} at x={x:.1}");
        id
    }

    /// Circle somewhere in the upper half of the playfield
    pub fn spawn_pickup(&mut self, world: &mut PhysicsWorld) -> BodyId {
        let bounds = *world.bounds();
        let pos = Vec2::new(
            self.rng.random_range(0.0..bounds.width),
            self.rng.random_range(0.0..bounds.height / 2.0),
        );

        let id = world.next_body_id();
        world.add_body(Body::new(
            id,
            Category::Pickup,
            Shape::Circle {
                radius: PICKUP_RADIUS,
            },
            Material::PICKUP,
            pos,
        ));
        self.pickups.push(id);
        log::trace!("Spawned pickup {id:?} at {pos}");
        id
    }

    /// Independent Bernoulli trials for an enemy and a pickup
    pub fn roll_spawns(&mut self, world: &mut PhysicsWorld) -> SpawnRoll {
        let mut roll = SpawnRoll::default();
        if self.rng.random_bool(self.spawn.enemy_chance) {
            roll.enemy = Some(self.spawn_enemy(world));
        }
        if self.rng.random_bool(self.spawn.pickup_chance) {
            roll.pickup = Some(self.spawn_pickup(world));
        }
        roll
    }

    /// New echo at `at`, sharing the avatar's physical profile
    pub fn create_echo(&mut self, world: &mut PhysicsWorld, at: Vec2, now: Millis) -> Echo {
        let id = world.next_body_id();
        world.add_body(Body::new(
            id,
            Category::Echo,
            Shape::Circle {
                radius: AVATAR_RADIUS,
            },
            Material::AVATAR,
            at,
        ));
        let echo = Echo::new(id, now);
        self.echoes.push(echo);
        log::debug!("Echo {id:?} created at {at}, expires at {}", echo.expires_at);
        echo
    }

    /// Remove every echo whose lifetime has run out. Returns how many.
    pub fn expire_echoes(&mut self, world: &mut PhysicsWorld, now: Millis) -> usize {
        let before = self.echoes.len();
        self.echoes.retain(|echo| {
            if echo.is_expired(now) {
                world.remove_body(echo.body);
                log::debug!("Echo {:?} expired at {now}", echo.body);
                false
            } else {
                true
            }
        });
        before - self.echoes.len()
    }

    /// Remove enemies and pickups that dropped wholly past the bottom edge.
    /// Returns how many.
    pub fn cull_offscreen(&mut self, world: &mut PhysicsWorld) -> usize {
        let limit = world.bounds().height + FALL_MARGIN;
        let gone = |id: BodyId| world.get(id).is_none_or(|body| body.aabb().0.y > limit);

        let mut culled = Vec::new();
        for (category, tracked) in [
            (Category::Enemy, &self.enemies),
            (Category::Pickup, &self.pickups),
        ] {
            culled.extend(
                tracked
                    .iter()
                    .copied()
                    .filter(|&id| gone(id))
                    .map(|id| (category, id)),
            );
        }

        for &(category, id) in &culled {
            self.remove_entity(world, category, id);
            log::trace!("Culled {} {id:?} below the playfield", category.label());
        }
        culled.len()
    }

    /// Remove a tracked enemy or pickup from tracking and from the world.
    /// Returns false when it was already gone (or isn't removable).
    pub fn remove_entity(&mut self, world: &mut PhysicsWorld, category: Category, id: BodyId) -> bool {
        let tracked = match category {
            Category::Enemy => &mut self.enemies,
            Category::Pickup => &mut self.pickups,
            Category::Avatar | Category::Echo | Category::Platform => {
                log::warn!("remove_entity called for non-removable {category:?} {id:?}");
                return false;
            }
        };
        let Some(idx) = tracked.iter().position(|&e| e == id) else {
            return false;
        };
        tracked.swap_remove(idx);
        world.remove_body(id);
        true
    }

    /// Forget every tracked entity and empty the world
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        world.clear();
        self.avatar = None;
        self.platforms.clear();
        self.enemies.clear();
        self.pickups.clear();
        self.echoes.clear();
    }
}
