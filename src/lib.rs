//! Echo Hop - a physics platformer where you race your own echoes
//!
//! Core modules:
//! - `sim`: Seeded simulation (physics, echoes, collisions, game state)
//! - `audio`: Audio service consuming per-tick sound cues
//! - `settings`: World, physics, spawn and audio configuration
//! - `session`: Fixed-step tick driver with deterministic teardown

pub mod audio;
pub mod error;
pub mod session;
pub mod settings;
pub mod sim;

pub use audio::{AudioBackend, AudioService, LogBackend, SoundCue};
pub use error::{ConfigError, StateError};
pub use session::Session;
pub use settings::Settings;

/// Simulation clock in milliseconds. Signed so that lookups before the
/// session start (e.g. `now - ECHO_DELAY_MS` early on) stay representable.
pub type Millis = i64;

/// Game configuration constants
pub mod consts {
    use crate::Millis;

    /// Fixed simulation tick (~60 Hz)
    pub const TICK_MS: Millis = 16;
    /// Maximum ticks per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Input history window kept by the recorder
    pub const INPUT_WINDOW_MS: Millis = 5000;
    /// How far behind the live input an echo replays
    pub const ECHO_DELAY_MS: Millis = 1000;
    /// Echo lifetime from creation
    pub const ECHO_LIFETIME_MS: Millis = 5000;

    /// Horizontal force per unit of replayed intent on an echo
    pub const ECHO_FORCE_SCALE: f32 = 0.005;
    /// Vertical velocity override when an echo jumps (y-down)
    pub const ECHO_JUMP_VELOCITY: f32 = -7.0;
    /// Horizontal force per unit of live intent on the avatar
    pub const AVATAR_FORCE_SCALE: f32 = 0.001;
    /// Vertical velocity override when the avatar jumps (y-down)
    pub const AVATAR_JUMP_VELOCITY: f32 = -10.0;
    /// Tolerance band around a platform's top edge for "resting on it"
    pub const PLATFORM_CONTACT_TOLERANCE: f32 = 5.0;

    /// Per-tick Bernoulli spawn chances
    pub const ENEMY_SPAWN_CHANCE: f64 = 0.02;
    pub const PICKUP_SPAWN_CHANCE: f64 = 0.03;

    /// Body sizes
    pub const AVATAR_RADIUS: f32 = 15.0;
    pub const ENEMY_RADIUS: f32 = 15.0;
    pub const PICKUP_RADIUS: f32 = 10.0;

    /// Enemy launch velocity ranges
    pub const ENEMY_VX_RANGE: (f32, f32) = (-2.5, 2.5);
    pub const ENEMY_VY_RANGE: (f32, f32) = (1.0, 3.0);

    /// Score awards
    pub const AVATAR_PICKUP_SCORE: u64 = 10;
    pub const ECHO_PICKUP_SCORE: u64 = 5;
    pub const ECHO_ENEMY_SCORE: u64 = 5;

    /// Starting lives
    pub const STARTING_LIVES: u8 = 3;
    /// How far below the floor the avatar may fall before losing a life
    pub const FALL_MARGIN: f32 = 50.0;

    /// Default playfield size
    pub const DEFAULT_WORLD_WIDTH: f32 = 800.0;
    pub const DEFAULT_WORLD_HEIGHT: f32 = 600.0;
}
