//! Rigid bodies owned by the physics world
//!
//! Every simulated object (avatar, echoes, enemies, pickups, platforms) is a
//! `Body`. Other modules hold only its `BodyId`; the body itself lives in
//! [`PhysicsWorld`](super::physics::PhysicsWorld).

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable identifier for a body. Never reused within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Semantic classification driving collision rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// The player-controlled body
    Avatar,
    /// A delayed replay of the avatar
    Echo,
    Enemy,
    Platform,
    /// Collectible scroll
    Pickup,
}

impl Category {
    /// Label used by the presentation layer
    pub fn label(&self) -> &'static str {
        match self {
            Category::Avatar => "player",
            Category::Echo => "clone",
            Category::Enemy => "enemy",
            Category::Platform => "platform",
            Category::Pickup => "scroll",
        }
    }
}

/// Collision shape in the body's local frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    /// Regular polygon inscribed in a circle of `radius`
    Polygon { sides: u8, radius: f32 },
    /// Axis-aligned rectangle
    Rect { half_extents: Vec2 },
}

impl Shape {
    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Polygon { sides, radius } => {
                let n = f32::from(sides);
                0.5 * n * radius * radius * (std::f32::consts::TAU / n).sin()
            }
            Shape::Rect { half_extents } => 4.0 * half_extents.x * half_extents.y,
        }
    }

    /// Half size of the unrotated bounding box
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Polygon { .. } => {
                let verts = self.local_vertices();
                verts
                    .iter()
                    .fold(Vec2::ZERO, |acc, v| acc.max(v.abs()))
            }
            Shape::Rect { half_extents } => half_extents,
        }
    }

    /// Vertices relative to the body centre (empty for circles)
    pub fn local_vertices(&self) -> Vec<Vec2> {
        match *self {
            Shape::Circle { .. } => Vec::new(),
            Shape::Polygon { sides, radius } => {
                let step = std::f32::consts::TAU / f32::from(sides);
                let offset = step * 0.5;
                (0..sides)
                    .map(|i| {
                        let a = offset + f32::from(i) * step;
                        Vec2::new(radius * a.cos(), radius * a.sin())
                    })
                    .collect()
            }
            Shape::Rect { half_extents: h } => vec![
                Vec2::new(-h.x, -h.y),
                Vec2::new(h.x, -h.y),
                Vec2::new(h.x, h.y),
                Vec2::new(-h.x, h.y),
            ],
        }
    }
}

/// Surface and mass parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    /// Fraction of velocity lost per base tick
    pub air_friction: f32,
    pub restitution: f32,
}

impl Material {
    /// Shared by the avatar and its echoes so they respond identically to force
    pub const AVATAR: Material = Material {
        density: 0.002,
        friction: 0.1,
        air_friction: 0.01,
        restitution: 0.8,
    };

    pub const ENEMY: Material = Material {
        density: 0.001,
        friction: 0.01,
        air_friction: 0.001,
        restitution: 1.0,
    };

    pub const PICKUP: Material = Material {
        density: 0.001,
        friction: 0.01,
        air_friction: 0.001,
        restitution: 0.8,
    };

    pub const PLATFORM: Material = Material {
        density: 0.001,
        friction: 0.1,
        air_friction: 0.0,
        restitution: 0.0,
    };
}

/// A simulated rigid body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub category: Category,
    pub shape: Shape,
    pub material: Material,
    pub pos: Vec2,
    /// Displacement per base tick
    pub vel: Vec2,
    /// Orientation in radians, read back from the solver
    pub angle: f32,
    /// Accumulated force, cleared after each step
    pub force: Vec2,
    pub mass: f32,
    pub is_static: bool,
}

impl Body {
    /// Create a dynamic body at rest
    pub fn new(id: BodyId, category: Category, shape: Shape, material: Material, pos: Vec2) -> Self {
        Self {
            id,
            category,
            shape,
            material,
            pos,
            vel: Vec2::ZERO,
            angle: 0.0,
            force: Vec2::ZERO,
            mass: shape.area() * material.density,
            is_static: false,
        }
    }

    /// Create an immovable body
    pub fn new_static(id: BodyId, category: Category, shape: Shape, pos: Vec2) -> Self {
        Self {
            is_static: true,
            ..Self::new(id, category, shape, Material::PLATFORM, pos)
        }
    }

    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        if self.is_static || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    pub fn apply_force(&mut self, force: Vec2) {
        if !self.is_static {
            self.force += force;
        }
    }

    /// Bounding box as (min, max), accounting for rotation
    pub fn aabb(&self) -> (Vec2, Vec2) {
        if let Shape::Circle { radius } = self.shape {
            let h = Vec2::splat(radius);
            return (self.pos - h, self.pos + h);
        }
        self.vertices().into_iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(min, max), v| (min.min(v), max.max(v)),
        )
    }

    /// World-space vertices (empty for circles)
    pub fn vertices(&self) -> Vec<Vec2> {
        let rotation = Vec2::from_angle(self.angle);
        self.shape
            .local_vertices()
            .into_iter()
            .map(|v| rotation.rotate(v) + self.pos)
            .collect()
    }

    /// Lowest point on screen (y-down), ignoring rotation
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.shape.half_extents().y
    }

    /// Highest point on screen (y-down), ignoring rotation
    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.y - self.shape.half_extents().y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_mass_from_density() {
        let body = Body::new(
            BodyId(1),
            Category::Avatar,
            Shape::Circle { radius: 15.0 },
            Material::AVATAR,
            Vec2::ZERO,
        );
        let expected = std::f32::consts::PI * 225.0 * 0.002;
        assert!((body.mass - expected).abs() < 1e-4);
        assert!(body.inverse_mass() > 0.0);
    }

    #[test]
    fn test_static_body_ignores_force() {
        let mut body = Body::new_static(
            BodyId(1),
            Category::Platform,
            Shape::Rect { half_extents: Vec2::new(100.0, 7.5) },
            Vec2::new(200.0, 480.0),
        );
        body.apply_force(Vec2::new(1.0, 1.0));
        assert_eq!(body.force, Vec2::ZERO);
        assert_eq!(body.inverse_mass(), 0.0);
        assert!((body.top() - 472.5).abs() < 1e-4);
    }

    #[test]
    fn test_triangle_vertices() {
        let shape = Shape::Polygon { sides: 3, radius: 15.0 };
        let verts = shape.local_vertices();
        assert_eq!(verts.len(), 3);
        for v in &verts {
            assert!((v.length() - 15.0).abs() < 1e-3);
        }
        // Regular triangle area: (3√3/4) r²
        let expected = 3.0 * 3f32.sqrt() / 4.0 * 225.0;
        assert!((shape.area() - expected).abs() < 1e-2);
    }

    #[test]
    fn test_rotated_rect_aabb() {
        let mut body = Body::new(
            BodyId(1),
            Category::Enemy,
            Shape::Rect { half_extents: Vec2::new(10.0, 2.0) },
            Material::ENEMY,
            Vec2::new(50.0, 50.0),
        );
        body.angle = std::f32::consts::FRAC_PI_2;
        let (min, max) = body.aabb();
        assert!((min - Vec2::new(48.0, 40.0)).length() < 1e-3);
        assert!((max - Vec2::new(52.0, 60.0)).length() < 1e-3);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::Echo.label(), "clone");
        assert_eq!(Category::Pickup.label(), "scroll");
    }
}
