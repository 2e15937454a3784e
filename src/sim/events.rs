//! Per-tick output consumed by the presentation and audio layers

use serde::{Deserialize, Serialize};

/// Discrete sound cues, fire-and-forget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Avatar jumped off a platform
    Jump,
    /// Avatar touched a platform
    Bounce,
    /// Echo created
    Clone,
    /// Pickup collected by avatar or echo
    Collect,
    /// Avatar hit by an enemy
    Hit,
    /// Avatar fell off the bottom
    Fall,
    /// Echo destroyed an enemy
    EnemyDefeat,
}

/// Game state transitions observed by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    ScoreChanged { score: u64 },
    LifeLost { remaining: u8 },
    /// Terminal transition; emitted exactly once per session
    GameOver { final_score: u64 },
    PauseChanged { paused: bool },
    LevelChanged { level: u32 },
    /// All bodies recreated after a resize or restart
    WorldRebuilt { width: u32, height: u32 },
    /// Game state restored to its initial values
    Reset,
}

/// Everything a single tick produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub cues: Vec<SoundCue>,
    pub events: Vec<GameEvent>,
}

impl TickReport {
    #[inline]
    pub fn cue(&mut self, cue: SoundCue) {
        self.cues.push(cue);
    }

    #[inline]
    pub fn event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Final score if this tick ended the session
    pub fn game_over(&self) -> Option<u64> {
        self.events.iter().find_map(|e| match e {
            GameEvent::GameOver { final_score } => Some(*final_score),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty() && self.events.is_empty()
    }

    /// Append another report, keeping order
    pub fn extend(&mut self, other: TickReport) {
        self.cues.extend(other.cues);
        self.events.extend(other.events);
    }
}
