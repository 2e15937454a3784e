//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - No audio, rendering or platform dependencies

pub mod body;
pub mod boundary;
pub mod echo;
pub mod events;
pub mod input;
pub mod lifecycle;
pub mod physics;
pub mod resolve;
pub mod state;
pub mod tick;

pub use body::{Body, BodyId, Category, Material, Shape};
pub use boundary::BoundaryCheck;
pub use echo::{Echo, EchoController};
pub use events::{GameEvent, SoundCue, TickReport};
pub use input::{InputRecorder, InputSample, Intent, TickInput};
pub use lifecycle::{EntityManager, SpawnConfig};
pub use physics::{CollisionPair, PhysicsConfig, PhysicsWorld, WorldConfig};
pub use resolve::{Resolution, classify};
pub use state::{GamePhase, GameState, LifeOutcome};
pub use tick::{BodyView, Command, Simulation, Snapshot};
