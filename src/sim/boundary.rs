//! Keeps the avatar inside the playfield: horizontal wrap and fall reset

use glam::Vec2;

use super::body::BodyId;
use super::physics::PhysicsWorld;
use crate::consts::FALL_MARGIN;

/// What the enforcer did this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryCheck {
    /// Avatar crossed a side edge and was moved to the opposite one
    pub wrapped: bool,
    /// Avatar fell below the floor and was returned to the centre
    pub fell: bool,
}

/// Wrap the avatar across the side edges and reset it after a fall. The
/// caller applies the life penalty for a fall.
pub fn enforce(world: &mut PhysicsWorld, avatar: BodyId) -> BoundaryCheck {
    let bounds = *world.bounds();
    let mut check = BoundaryCheck::default();
    let Some(body) = world.get_mut(avatar) else {
        log::debug!("Boundary check skipped: avatar {avatar:?} not in world");
        return check;
    };

    if body.pos.x < 0.0 {
        body.pos.x = bounds.width;
        check.wrapped = true;
    } else if body.pos.x > bounds.width {
        body.pos.x = 0.0;
        check.wrapped = true;
    }

    if body.pos.y > bounds.height + FALL_MARGIN {
        body.pos = bounds.center();
        body.vel = Vec2::ZERO;
        check.fell = true;
    }

    check
}
