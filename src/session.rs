//! Tick driver
//!
//! Turns variable frame times into fixed simulation ticks, forwards each
//! tick's cues to the audio service and owns teardown.

use crate::audio::{AudioBackend, AudioService};
use crate::consts::*;
use crate::error::ConfigError;
use crate::settings::Settings;
use crate::sim::{Command, GameEvent, GameState, Simulation, Snapshot, TickInput};

/// Longest frame the driver will try to catch up on
const MAX_FRAME_MS: f32 = 100.0;

/// A play session: simulation, audio and the fixed-step accumulator
pub struct Session {
    sim: Simulation,
    audio: AudioService,
    accumulator: f32,
    input: TickInput,
    final_score: Option<u64>,
    running: bool,
}

impl Session {
    pub fn new(settings: &Settings, backend: Box<dyn AudioBackend>) -> Result<Self, ConfigError> {
        let sim = Simulation::new(settings)?;
        let mut audio = AudioService::new(&settings.audio);
        audio.init(backend);
        audio.set_music(true);
        log::info!("Session started");

        Ok(Self {
            sim,
            audio,
            accumulator: 0.0,
            input: TickInput::default(),
            final_score: None,
            running: true,
        })
    }

    pub fn set_left(&mut self, held: bool) {
        self.input.left = held;
    }

    pub fn set_right(&mut self, held: bool) {
        self.input.right = held;
    }

    pub fn set_jump(&mut self, held: bool) {
        self.input.jump_requested = held;
    }

    /// One-shot; consumed by the next tick
    pub fn request_clone(&mut self) {
        self.input.clone_requested = true;
    }

    /// One-shot; consumed by the next tick
    pub fn request_pause_toggle(&mut self) {
        self.input.pause_toggle_requested = true;
    }

    pub fn push_command(&mut self, command: Command) {
        self.sim.push_command(command);
    }

    /// Run as many fixed ticks as `frame_ms` covers and return the game
    /// events they produced, in order.
    pub fn advance(&mut self, frame_ms: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }
        if !frame_ms.is_finite() {
            log::warn!("Ignoring non-finite frame time {frame_ms}");
            return events;
        }

        self.accumulator += frame_ms.clamp(0.0, MAX_FRAME_MS);
        let tick_ms = TICK_MS as f32;

        let mut substeps = 0;
        while self.accumulator >= tick_ms && substeps < MAX_SUBSTEPS {
            let report = self.sim.tick(&self.input);
            self.accumulator -= tick_ms;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.clear_one_shots();

            self.audio.dispatch(&report);
            if let Some(final_score) = report.game_over() {
                self.final_score = Some(final_score);
            }
            if report
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::Reset))
            {
                self.final_score = None;
            }
            events.extend(report.events);
        }
        events
    }

    #[inline]
    pub fn state(&self) -> &GameState {
        self.sim.state()
    }

    #[inline]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    #[inline]
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    #[inline]
    pub fn audio(&self) -> &AudioService {
        &self.audio
    }

    #[inline]
    pub fn audio_mut(&mut self) -> &mut AudioService {
        &mut self.audio
    }

    pub fn snapshot(&self) -> Snapshot {
        self.sim.snapshot()
    }

    /// Score reported by the game-over transition, if it happened
    #[inline]
    pub fn final_score(&self) -> Option<u64> {
        self.final_score
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop the driver, clear the world and release audio. Idempotent.
    pub fn end(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.accumulator = 0.0;
        self.input = TickInput::default();
        self.sim.teardown();
        self.audio.dispose();
        log::info!("Session ended");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end();
    }
}
