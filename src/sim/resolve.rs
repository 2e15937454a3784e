//! Turns newly touching body pairs into gameplay effects
//!
//! Classification is a pure function of the two categories. Application
//! mutates game state and asks the lifecycle manager to remove bodies, but
//! never owns either.

use super::body::{BodyId, Category};
use super::events::{GameEvent, SoundCue, TickReport};
use super::lifecycle::EntityManager;
use super::physics::{CollisionPair, PhysicsWorld};
use super::state::{GameState, LifeOutcome};
use crate::consts::*;
use crate::error::StateError;

/// What a pair of categories means for gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Avatar touched a platform
    Bounce,
    AvatarHitByEnemy { enemy: BodyId },
    AvatarCollects { pickup: BodyId },
    EchoDefeatsEnemy { enemy: BodyId },
    EchoCollects { pickup: BodyId },
    Ignore,
}

/// Classify a pair regardless of which side each body is on
pub fn classify(pair: &CollisionPair) -> Resolution {
    use Category::*;

    let sides = [
        (pair.a_category, pair.b_category, pair.b),
        (pair.b_category, pair.a_category, pair.a),
    ];
    for (this, other, other_id) in sides {
        let resolution = match (this, other) {
            (Avatar, Platform) => Resolution::Bounce,
            (Avatar, Enemy) => Resolution::AvatarHitByEnemy { enemy: other_id },
            (Avatar, Pickup) => Resolution::AvatarCollects { pickup: other_id },
            (Echo, Enemy) => Resolution::EchoDefeatsEnemy { enemy: other_id },
            (Echo, Pickup) => Resolution::EchoCollects { pickup: other_id },
            _ => Resolution::Ignore,
        };
        if resolution != Resolution::Ignore {
            return resolution;
        }
    }
    Resolution::Ignore
}

/// Apply every pair's effect in order. Each qualifying pair applies its
/// effect even when an earlier pair in the same tick already removed the
/// target; only the removal itself happens once.
pub fn resolve_pairs(
    pairs: &[CollisionPair],
    state: &mut GameState,
    entities: &mut EntityManager,
    world: &mut PhysicsWorld,
    report: &mut TickReport,
) {
    for pair in pairs {
        let resolution = classify(pair);
        if let Err(err) = apply(resolution, state, entities, world, report) {
            log::debug!("Skipping {resolution:?}: {err}");
        }
    }
}

fn apply(
    resolution: Resolution,
    state: &mut GameState,
    entities: &mut EntityManager,
    world: &mut PhysicsWorld,
    report: &mut TickReport,
) -> Result<(), StateError> {
    match resolution {
        Resolution::Bounce => report.cue(SoundCue::Bounce),
        Resolution::AvatarHitByEnemy { enemy } => {
            if state.is_game_over() {
                return Err(StateError::SessionOver);
            }
            if !entities.remove_entity(world, Category::Enemy, enemy) {
                log::debug!("Enemy {enemy:?} already removed this tick");
            }
            report.cue(SoundCue::Hit);
            lose_life(state, report)?;
        }
        Resolution::AvatarCollects { pickup } => {
            award(
                state,
                entities,
                world,
                report,
                Category::Pickup,
                pickup,
                AVATAR_PICKUP_SCORE,
                SoundCue::Collect,
            )?;
        }
        Resolution::EchoDefeatsEnemy { enemy } => {
            award(
                state,
                entities,
                world,
                report,
                Category::Enemy,
                enemy,
                ECHO_ENEMY_SCORE,
                SoundCue::EnemyDefeat,
            )?;
        }
        Resolution::EchoCollects { pickup } => {
            award(
                state,
                entities,
                world,
                report,
                Category::Pickup,
                pickup,
                ECHO_PICKUP_SCORE,
                SoundCue::Collect,
            )?;
        }
        Resolution::Ignore => {}
    }
    Ok(())
}

/// Remove the target if it is still live and score it
#[allow(clippy::too_many_arguments)]
fn award(
    state: &mut GameState,
    entities: &mut EntityManager,
    world: &mut PhysicsWorld,
    report: &mut TickReport,
    category: Category,
    target: BodyId,
    points: u64,
    cue: SoundCue,
) -> Result<(), StateError> {
    if state.is_game_over() {
        return Err(StateError::SessionOver);
    }
    if !entities.remove_entity(world, category, target) {
        log::debug!("{} {target:?} already removed this tick", category.label());
    }
    let score = state.add_score(points)?;
    report.cue(cue);
    report.event(GameEvent::ScoreChanged { score });
    Ok(())
}

/// Shared by enemy hits and falls
pub(crate) fn lose_life(state: &mut GameState, report: &mut TickReport) -> Result<(), StateError> {
    match state.remove_life()? {
        LifeOutcome::Remaining(remaining) => report.event(GameEvent::LifeLost { remaining }),
        LifeOutcome::GameOver { final_score } => {
            report.event(GameEvent::LifeLost { remaining: 0 });
            report.event(GameEvent::GameOver { final_score });
        }
    }
    Ok(())
}
