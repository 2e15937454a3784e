//! Echoes: time-delayed copies of the avatar driven by recorded input

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, Category};
use super::input::{InputRecorder, InputSample};
use super::physics::PhysicsWorld;
use crate::Millis;
use crate::consts::*;

/// A live echo. Its body is owned by the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub body: BodyId,
    pub created_at: Millis,
    pub expires_at: Millis,
}

impl Echo {
    pub fn new(body: BodyId, now: Millis) -> Self {
        Self {
            body,
            created_at: now,
            expires_at: now + ECHO_LIFETIME_MS,
        }
    }

    #[inline]
    pub fn is_expired(&self, now: Millis) -> bool {
        now >= self.expires_at
    }
}

/// True when the body's lower edge sits within the contact tolerance of a
/// platform's upper edge and horizontally over it.
pub fn resting_on_platform(world: &PhysicsWorld, id: BodyId) -> bool {
    let Some(body) = world.get(id) else {
        return false;
    };
    let bottom = body.bottom();
    world
        .bodies()
        .iter()
        .filter(|p| p.category == Category::Platform)
        .any(|platform| {
            let half_width = platform.shape.half_extents().x;
            (bottom - platform.top()).abs() <= PLATFORM_CONTACT_TOLERANCE
                && (platform.pos.x - body.pos.x).abs() < half_width
        })
}

/// What the controller did for one echo this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoReplay {
    pub body: BodyId,
    pub sample: InputSample,
    pub force: Vec2,
    pub jumped: bool,
}

/// Replays delayed input onto echo bodies
#[derive(Debug, Clone, Copy)]
pub struct EchoController {
    pub delay_ms: Millis,
    pub force_scale: f32,
    pub jump_velocity: f32,
}

impl Default for EchoController {
    fn default() -> Self {
        Self {
            delay_ms: ECHO_DELAY_MS,
            force_scale: ECHO_FORCE_SCALE,
            jump_velocity: ECHO_JUMP_VELOCITY,
        }
    }
}

impl EchoController {
    /// Horizontal force for a recorded sample
    #[inline]
    pub fn replay_force(&self, sample: &InputSample) -> Vec2 {
        Vec2::new(f32::from(sample.intent.x) * self.force_scale, 0.0)
    }

    /// Apply the input recorded `delay_ms` ago to every echo. Echoes without
    /// a matching sample (or whose body is gone) are left to plain physics.
    pub fn apply(
        &self,
        echoes: &[Echo],
        recorder: &InputRecorder,
        world: &mut PhysicsWorld,
        now: Millis,
    ) -> Vec<EchoReplay> {
        let Some(sample) = recorder.closest_at_or_before(now - self.delay_ms) else {
            return Vec::new();
        };
        let force = self.replay_force(&sample);

        let mut replays = Vec::with_capacity(echoes.len());
        for echo in echoes {
            if !world.apply_force(echo.body, force) {
                log::debug!("Echo body {:?} missing, skipping replay", echo.body);
                continue;
            }

            let jumped = sample.intent.jump_requested() && resting_on_platform(world, echo.body);
            if jumped {
                if let Some(body) = world.get_mut(echo.body) {
                    body.vel.y = self.jump_velocity;
                }
            }

            replays.push(EchoReplay {
                body: echo.body,
                sample,
                force,
                jumped,
            });
        }
        replays
    }
}
