//! Authoritative game state: score, lives, level, pause
//!
//! Fields are private so the invariants hold by construction: score never
//! decreases within a session, lives never drop below zero, and the
//! transition to game-over happens exactly once until `reset_game`.

use serde::{Deserialize, Serialize};

use crate::consts::STARTING_LIVES;
use crate::error::StateError;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Lives remain
    Active,
    /// Lives hit zero; only `reset_game` is accepted
    GameOver,
}

/// Result of losing a life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeOutcome {
    Remaining(u8),
    /// This call ended the session
    GameOver { final_score: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    score: u64,
    lives: u8,
    level: u32,
    paused: bool,
    phase: GamePhase,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            score: 0,
            lives: STARTING_LIVES,
            level: 1,
            paused: false,
            phase: GamePhase::Active,
        }
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn lives(&self) -> u8 {
        self.lives
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    fn ensure_active(&self) -> Result<(), StateError> {
        match self.phase {
            GamePhase::Active => Ok(()),
            GamePhase::GameOver => Err(StateError::SessionOver),
        }
    }

    /// Add points, returning the new score
    pub fn add_score(&mut self, points: u64) -> Result<u64, StateError> {
        self.ensure_active()?;
        self.score = self.score.saturating_add(points);
        Ok(self.score)
    }

    /// Remove one life (floored at zero). Reaching zero ends the session.
    pub fn remove_life(&mut self) -> Result<LifeOutcome, StateError> {
        self.ensure_active()?;
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.phase = GamePhase::GameOver;
            log::info!("Game over with score {}", self.score);
            Ok(LifeOutcome::GameOver {
                final_score: self.score,
            })
        } else {
            Ok(LifeOutcome::Remaining(self.lives))
        }
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_pause(&mut self) -> Result<bool, StateError> {
        self.ensure_active()?;
        self.paused = !self.paused;
        Ok(self.paused)
    }

    /// Set the pause flag. Returns whether it changed.
    pub fn set_paused(&mut self, paused: bool) -> Result<bool, StateError> {
        self.ensure_active()?;
        let changed = self.paused != paused;
        self.paused = paused;
        Ok(changed)
    }

    pub fn increment_level(&mut self) -> Result<u32, StateError> {
        self.ensure_active()?;
        self.level += 1;
        Ok(self.level)
    }

    /// Restore the initial state; valid in any phase
    pub fn reset_game(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_state() {
        let state = GameState::new();
        assert_eq!(
            (state.score(), state.lives(), state.level(), state.paused()),
            (0, 3, 1, false)
        );
        assert_eq!(state.phase(), GamePhase::Active);
    }

    #[test]
    fn test_game_over_exactly_once() {
        let mut state = GameState::new();
        state.add_score(40).unwrap();
        assert_eq!(state.remove_life(), Ok(LifeOutcome::Remaining(2)));
        assert_eq!(state.remove_life(), Ok(LifeOutcome::Remaining(1)));
        assert_eq!(
            state.remove_life(),
            Ok(LifeOutcome::GameOver { final_score: 40 })
        );
        assert!(state.is_game_over());
        assert_eq!(state.remove_life(), Err(StateError::SessionOver));
        assert_eq!(state.lives(), 0);
    }

    #[test]
    fn test_operations_rejected_after_game_over() {
        let mut state = GameState::new();
        for _ in 0..3 {
            state.remove_life().unwrap();
        }
        assert_eq!(state.add_score(10), Err(StateError::SessionOver));
        assert_eq!(state.toggle_pause(), Err(StateError::SessionOver));
        assert_eq!(state.increment_level(), Err(StateError::SessionOver));
        assert_eq!(state.score(), 0);

        state.reset_game();
        assert_eq!(state, GameState::new());
        assert_eq!(state.add_score(10), Ok(10));
    }

    #[test]
    fn test_pause_and_level() {
        let mut state = GameState::new();
        assert_eq!(state.toggle_pause(), Ok(true));
        assert_eq!(state.toggle_pause(), Ok(false));
        assert_eq!(state.set_paused(false), Ok(false));
        assert_eq!(state.set_paused(true), Ok(true));
        assert_eq!(state.increment_level(), Ok(2));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Score(u64),
        Life,
        Pause,
        Level,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..100).prop_map(Op::Score),
            Just(Op::Life),
            Just(Op::Pause),
            Just(Op::Level),
        ]
    }

    proptest! {
        #[test]
        fn prop_score_monotonic_lives_non_increasing(ops in prop::collection::vec(op(), 0..64)) {
            let mut state = GameState::new();
            let mut game_overs = 0;
            for op in ops {
                let (score, lives) = (state.score(), state.lives());
                match op {
                    Op::Score(n) => { let _ = state.add_score(n); }
                    Op::Life => {
                        if let Ok(LifeOutcome::GameOver { .. }) = state.remove_life() {
                            game_overs += 1;
                        }
                    }
                    Op::Pause => { let _ = state.toggle_pause(); }
                    Op::Level => { let _ = state.increment_level(); }
                }
                prop_assert!(state.score() >= score);
                prop_assert!(state.lives() <= lives);
            }
            prop_assert!(game_overs <= 1);
            prop_assert_eq!(game_overs == 1, state.is_game_over());
        }
    }
}
