//! Per-tick input and the rolling input history echoes replay from

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::Millis;

/// Controls reported by the input adapter for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held left
    pub left: bool,
    /// Held right
    pub right: bool,
    /// Jump held
    pub jump_requested: bool,
    /// One-shot: spawn an echo
    pub clone_requested: bool,
    /// One-shot: toggle pause
    pub pause_toggle_requested: bool,
}

impl TickInput {
    pub fn intent(&self) -> Intent {
        Intent::from_controls(self.left, self.right, self.jump_requested)
    }

    /// Clear the edge-triggered flags after they have been consumed
    pub fn clear_one_shots(&mut self) {
        self.clone_requested = false;
        self.pause_toggle_requested = false;
    }
}

/// Discrete movement intent: `x` in {-1, 0, 1}, `y` in {-1, 0} (-1 = jump)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intent {
    pub x: i8,
    pub y: i8,
}

impl Intent {
    pub const NEUTRAL: Intent = Intent { x: 0, y: 0 };

    /// Left wins when both directions are held
    pub fn from_controls(left: bool, right: bool, jump: bool) -> Self {
        let x = if left {
            -1
        } else if right {
            1
        } else {
            0
        };
        Self {
            x,
            y: if jump { -1 } else { 0 },
        }
    }

    #[inline]
    pub fn jump_requested(&self) -> bool {
        self.y < 0
    }
}

/// One recorded tick of input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSample {
    pub timestamp: Millis,
    pub intent: Intent,
}

/// Rolling history of recent input, oldest first
#[derive(Debug, Clone)]
pub struct InputRecorder {
    samples: VecDeque<InputSample>,
    window_ms: Millis,
}

impl InputRecorder {
    pub fn new(window_ms: Millis) -> Self {
        Self {
            samples: VecDeque::new(),
            window_ms,
        }
    }

    #[inline]
    pub fn window_ms(&self) -> Millis {
        self.window_ms
    }

    /// Append the current tick's intent. Timestamps must not go backwards.
    pub fn sample(&mut self, intent: Intent, now: Millis) {
        if let Some(last) = self.samples.back() {
            if now < last.timestamp {
                log::warn!(
                    "Dropping out-of-order input sample at {now} (last {})",
                    last.timestamp
                );
                return;
            }
        }
        self.samples.push_back(InputSample {
            timestamp: now,
            intent,
        });
    }

    /// Keep only samples strictly newer than `cutoff`
    pub fn prune_older_than(&mut self, cutoff: Millis) {
        while self
            .samples
            .front()
            .is_some_and(|s| s.timestamp <= cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// Sample with the greatest timestamp `<= target`
    pub fn closest_at_or_before(&self, target: Millis) -> Option<InputSample> {
        let idx = self.samples.partition_point(|s| s.timestamp <= target);
        idx.checked_sub(1).and_then(|i| self.samples.get(i)).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputSample> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
