//! Fixed timestep simulation tick
//!
//! `Simulation` owns every subsystem and advances them in a fixed order:
//! queued commands, input sampling, echo replay, avatar control, physics,
//! collision resolution, spawn/expiry, boundary enforcement.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, Category, Shape};
use super::boundary;
use super::echo::{EchoController, resting_on_platform};
use super::events::{GameEvent, SoundCue, TickReport};
use super::input::{InputRecorder, TickInput};
use super::lifecycle::EntityManager;
use super::physics::{PhysicsConfig, PhysicsWorld, WorldConfig};
use super::resolve::{lose_life, resolve_pairs};
use super::state::GameState;
use crate::Millis;
use crate::consts::*;
use crate::error::ConfigError;
use crate::settings::Settings;

/// Requests consumed at the top of the next tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Spawn an echo at the avatar's position
    CreateEcho,
    TogglePause,
    SetPaused(bool),
    /// Recreate the world at a new size
    Resize { width: f32, height: f32 },
    /// Reset game state and rebuild the world
    Restart,
    NextLevel,
}

/// Read-only view of one body for rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyView {
    pub id: BodyId,
    pub category: Category,
    pub shape: Shape,
    pub pos: Vec2,
    pub vel: Vec2,
    pub angle: f32,
}

/// Everything the presentation layer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time_ms: Millis,
    pub score: u64,
    pub lives: u8,
    pub level: u32,
    pub paused: bool,
    pub game_over: bool,
    pub width: f32,
    pub height: f32,
    pub echoes: usize,
    pub bodies: Vec<BodyView>,
}

/// The simulation core
#[derive(Debug)]
pub struct Simulation {
    physics: PhysicsConfig,
    bounds: WorldConfig,
    /// `None` once torn down
    world: Option<PhysicsWorld>,
    entities: EntityManager,
    recorder: InputRecorder,
    echo_controller: EchoController,
    state: GameState,
    commands: VecDeque<Command>,
    /// Simulation clock; frozen while paused
    now: Millis,
}

impl Simulation {
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let mut world = PhysicsWorld::new(settings.world, settings.physics)?;
        let mut entities = EntityManager::new(settings.seed, settings.spawn);
        entities.populate(&mut world);
        log::info!(
            "Simulation ready: {}x{} world, seed {:#x}",
            settings.world.width,
            settings.world.height,
            settings.seed
        );

        Ok(Self {
            physics: settings.physics,
            bounds: settings.world,
            world: Some(world),
            entities,
            recorder: InputRecorder::new(INPUT_WINDOW_MS),
            echo_controller: EchoController::default(),
            state: GameState::new(),
            commands: VecDeque::new(),
            now: 0,
        })
    }

    #[inline]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[inline]
    pub fn world(&self) -> Option<&PhysicsWorld> {
        self.world.as_ref()
    }

    /// Direct access for tooling; gameplay goes through commands and ticks
    #[inline]
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[inline]
    pub fn world_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.world.as_mut()
    }

    #[inline]
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    #[inline]
    pub fn recorder(&self) -> &InputRecorder {
        &self.recorder
    }

    #[inline]
    pub fn now(&self) -> Millis {
        self.now
    }

    #[inline]
    pub fn is_torn_down(&self) -> bool {
        self.world.is_none()
    }

    /// Queue a command for the next tick
    pub fn push_command(&mut self, command: Command) {
        if self.is_torn_down() {
            log::debug!("Dropping {command:?}: simulation torn down");
            return;
        }
        self.commands.push_back(command);
    }

    /// Advance the simulation by one fixed tick
    pub fn tick(&mut self, input: &TickInput) -> TickReport {
        let mut report = TickReport::default();
        if self.is_torn_down() {
            log::debug!("Tick skipped: world not initialised");
            return report;
        }

        // One-shot inputs go through the same queue as external commands
        if input.clone_requested {
            self.commands.push_back(Command::CreateEcho);
        }
        if input.pause_toggle_requested {
            self.commands.push_back(Command::TogglePause);
        }
        while let Some(command) = self.commands.pop_front() {
            self.apply_command(command, &mut report);
        }

        // Don't tick if paused or game over
        if self.state.paused() || self.state.is_game_over() {
            return report;
        }
        let Some(world) = self.world.as_mut() else {
            return report;
        };

        self.now += TICK_MS;
        let now = self.now;
        let intent = input.intent();

        // Input history
        self.recorder.sample(intent, now);
        self.recorder
            .prune_older_than(now - self.recorder.window_ms());

        // Echo replay
        let replays = self
            .echo_controller
            .apply(self.entities.echoes(), &self.recorder, world, now);
        for replay in replays.iter().filter(|r| r.jumped) {
            log::trace!("Echo {:?} jumped", replay.body);
        }

        // Avatar control
        if let Some(avatar) = self.entities.avatar() {
            world.apply_force(
                avatar,
                Vec2::new(f32::from(intent.x) * AVATAR_FORCE_SCALE, 0.0),
            );
            if intent.jump_requested() && resting_on_platform(world, avatar) {
                if let Some(body) = world.get_mut(avatar) {
                    body.vel.y = AVATAR_JUMP_VELOCITY;
                    report.cue(SoundCue::Jump);
                }
            }
        }

        // Physics and collisions
        let pairs = world.step(TICK_MS as f32);
        resolve_pairs(
            &pairs,
            &mut self.state,
            &mut self.entities,
            world,
            &mut report,
        );
        if self.state.is_game_over() {
            return report;
        }

        // Spawns and expiry
        self.entities.roll_spawns(world);
        self.entities.expire_echoes(world, now);
        self.entities.cull_offscreen(world);

        // Boundary
        if let Some(avatar) = self.entities.avatar() {
            if boundary::enforce(world, avatar).fell {
                report.cue(SoundCue::Fall);
                if let Err(err) = lose_life(&mut self.state, &mut report) {
                    log::debug!("Fall penalty skipped: {err}");
                }
            }
        }

        report
    }

    fn apply_command(&mut self, command: Command, report: &mut TickReport) {
        match command {
            Command::CreateEcho => self.create_echo(report),
            Command::TogglePause => match self.state.toggle_pause() {
                Ok(paused) => report.event(GameEvent::PauseChanged { paused }),
                Err(err) => log::debug!("Ignoring pause toggle: {err}"),
            },
            Command::SetPaused(paused) => match self.state.set_paused(paused) {
                Ok(true) => report.event(GameEvent::PauseChanged { paused }),
                Ok(false) => {}
                Err(err) => log::debug!("Ignoring set paused: {err}"),
            },
            Command::Resize { width, height } => match WorldConfig::new(width, height) {
                Ok(bounds) => self.rebuild(bounds, report),
                Err(err) => log::warn!("Ignoring resize: {err}"),
            },
            Command::Restart => {
                self.state.reset_game();
                self.now = 0;
                report.event(GameEvent::Reset);
                self.rebuild(self.bounds, report);
            }
            Command::NextLevel => match self.state.increment_level() {
                Ok(level) => report.event(GameEvent::LevelChanged { level }),
                Err(err) => log::debug!("Ignoring level change: {err}"),
            },
        }
    }

    fn create_echo(&mut self, report: &mut TickReport) {
        if self.state.paused() || self.state.is_game_over() {
            log::debug!("Echo request ignored while inactive");
            return;
        }
        let Some(world) = self.world.as_mut() else {
            return;
        };
        let Some(at) = self
            .entities
            .avatar()
            .and_then(|id| world.get(id))
            .map(|body| body.pos)
        else {
            log::debug!("Echo request ignored: no avatar");
            return;
        };
        self.entities.create_echo(world, at, self.now);
        report.cue(SoundCue::Clone);
    }

    /// Recreate every body for `bounds`, dropping echoes and input history
    fn rebuild(&mut self, bounds: WorldConfig, report: &mut TickReport) {
        let mut world = match PhysicsWorld::new(bounds, self.physics) {
            Ok(world) => world,
            Err(err) => {
                log::warn!("World rebuild failed: {err}");
                return;
            }
        };
        if let Some(mut old) = self.world.take() {
            self.entities.clear(&mut old);
        }
        self.entities.populate(&mut world);
        self.recorder.clear();
        self.world = Some(world);
        self.bounds = bounds;

        log::info!("World rebuilt at {}x{}", bounds.width, bounds.height);
        report.event(GameEvent::WorldRebuilt {
            width: bounds.width.round() as u32,
            height: bounds.height.round() as u32,
        });
    }

    pub fn snapshot(&self) -> Snapshot {
        let bodies = self
            .world
            .iter()
            .flat_map(|world| world.bodies())
            .map(|body| BodyView {
                id: body.id,
                category: body.category,
                shape: body.shape,
                pos: body.pos,
                vel: body.vel,
                angle: body.angle,
            })
            .collect();

        Snapshot {
            time_ms: self.now,
            score: self.state.score(),
            lives: self.state.lives(),
            level: self.state.level(),
            paused: self.state.paused(),
            game_over: self.state.is_game_over(),
            width: self.bounds.width,
            height: self.bounds.height,
            echoes: self.entities.echoes().len(),
            bodies,
        }
    }

    /// Clear every body and pending command. Later ticks are no-ops.
    pub fn teardown(&mut self) {
        let Some(mut world) = self.world.take() else {
            return;
        };
        self.entities.clear(&mut world);
        self.recorder.clear();
        self.commands.clear();
        log::info!("Simulation torn down at {} ms", self.now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::lifecycle::SpawnConfig;

    fn quiet_settings() -> Settings {
        Settings {
            spawn: SpawnConfig {
                enemy_chance: 0.0,
                pickup_chance: 0.0,
            },
            ..Settings::default()
        }
    }

    /// Simulation with spawns disabled and the avatar parked mid-air
    fn quiet_sim() -> (Simulation, BodyId) {
        let mut sim = Simulation::new(&quiet_settings()).unwrap();
        let avatar = sim.entities.avatar().unwrap();
        sim.world
            .as_mut()
            .unwrap()
            .set_position(avatar, Vec2::new(100.0, 100.0));
        (sim, avatar)
    }

    fn count_cue(report: &TickReport, cue: SoundCue) -> usize {
        report.cues.iter().filter(|&&c| c == cue).count()
    }

    #[test]
    fn test_rejects_invalid_world() {
        let mut settings = Settings::default();
        settings.world.width = -10.0;
        assert!(matches!(
            Simulation::new(&settings),
            Err(ConfigError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_avatar_collects_pickup() {
        let (mut sim, _) = quiet_sim();
        let world = sim.world.as_mut().unwrap();
        let pickup = sim.entities.spawn_pickup(world);
        world.set_position(pickup, Vec2::new(100.0, 120.0));

        let report = sim.tick(&TickInput::default());

        assert_eq!(sim.state().score(), 10);
        assert!(sim.entities().pickups().is_empty());
        assert!(!sim.world().unwrap().contains(pickup));
        assert_eq!(count_cue(&report, SoundCue::Collect), 1);
        assert_eq!(report.events, vec![GameEvent::ScoreChanged { score: 10 }]);
    }

    #[test]
    fn test_enemy_hit_on_last_life_ends_session() {
        let (mut sim, _) = quiet_sim();
        sim.state.add_score(25).unwrap();
        sim.state.remove_life().unwrap();
        sim.state.remove_life().unwrap();
        let world = sim.world.as_mut().unwrap();
        let enemy = sim.entities.spawn_enemy(world);
        world.set_position(enemy, Vec2::new(112.0, 100.0));

        let report = sim.tick(&TickInput::default());

        assert_eq!(sim.state().lives(), 0);
        assert!(sim.state().is_game_over());
        assert!(!sim.world().unwrap().contains(enemy));
        assert_eq!(count_cue(&report, SoundCue::Hit), 1);
        assert_eq!(report.game_over(), Some(25));

        // Nothing further happens once the session is over
        let time = sim.now();
        let next = sim.tick(&TickInput::default());
        assert!(next.is_empty());
        assert_eq!(sim.now(), time);
    }

    #[test]
    fn test_pause_freezes_world() {
        let (mut sim, avatar) = quiet_sim();
        let report = sim.tick(&TickInput {
            pause_toggle_requested: true,
            ..TickInput::default()
        });
        assert_eq!(report.events, vec![GameEvent::PauseChanged { paused: true }]);

        let before = sim.snapshot();
        for _ in 0..30 {
            sim.tick(&TickInput {
                right: true,
                clone_requested: true,
                ..TickInput::default()
            });
        }
        assert_eq!(sim.snapshot(), before);
        assert!(sim.recorder().is_empty());
        assert_eq!(sim.now(), 0);
        assert!(sim.entities().echoes().is_empty());

        sim.push_command(Command::SetPaused(false));
        let report = sim.tick(&TickInput::default());
        assert_eq!(report.events, vec![GameEvent::PauseChanged { paused: false }]);
        assert_ne!(sim.world().unwrap().get(avatar).unwrap().pos, before.bodies[0].pos);
    }

    #[test]
    fn test_clone_creates_echo_at_avatar() {
        let (mut sim, avatar) = quiet_sim();
        let at = sim.world().unwrap().get(avatar).unwrap().pos;
        let report = sim.tick(&TickInput {
            clone_requested: true,
            ..TickInput::default()
        });

        assert_eq!(count_cue(&report, SoundCue::Clone), 1);
        let echo = sim.entities().echoes()[0];
        assert_eq!(echo.created_at, 0);
        assert_eq!(echo.expires_at, ECHO_LIFETIME_MS);
        let body = sim.world().unwrap().get(echo.body).unwrap();
        assert_eq!(body.category, Category::Echo);
        assert_eq!(body.material, sim.world().unwrap().get(avatar).unwrap().material);
        // Spawned on top of the avatar; the overlap pushes them apart
        assert!(body.pos.distance(at) < 2.0 * AVATAR_RADIUS);
    }

    #[test]
    fn test_echo_expires_after_lifetime() {
        let (mut sim, _) = quiet_sim();
        sim.push_command(Command::CreateEcho);
        let ticks = (ECHO_LIFETIME_MS / TICK_MS) as usize;
        for _ in 0..ticks - 1 {
            sim.tick(&TickInput::default());
        }
        assert_eq!(sim.entities().echoes().len(), 1);

        sim.tick(&TickInput::default());
        sim.tick(&TickInput::default());
        assert!(sim.entities().echoes().is_empty());
        assert!(
            sim.world()
                .unwrap()
                .bodies()
                .iter()
                .all(|b| b.category != Category::Echo)
        );
    }

    #[test]
    fn test_input_window_is_bounded() {
        let (mut sim, _) = quiet_sim();
        for _ in 0..400 {
            sim.tick(&TickInput {
                left: true,
                ..TickInput::default()
            });
        }
        let now = sim.now();
        assert!(sim.recorder().iter().all(|s| s.timestamp > now - INPUT_WINDOW_MS));
        assert_eq!(
            sim.recorder().len() as Millis,
            (INPUT_WINDOW_MS + TICK_MS - 1) / TICK_MS
        );
    }

    #[test]
    fn test_fall_costs_a_life() {
        let (mut sim, avatar) = quiet_sim();
        sim.world
            .as_mut()
            .unwrap()
            .set_position(avatar, Vec2::new(100.0, 700.0));

        let report = sim.tick(&TickInput::default());

        assert_eq!(count_cue(&report, SoundCue::Fall), 1);
        assert_eq!(report.events, vec![GameEvent::LifeLost { remaining: 2 }]);
        let body = sim.world().unwrap().get(avatar).unwrap();
        assert_eq!(body.pos, Vec2::new(400.0, 300.0));
        assert_eq!(body.vel, Vec2::ZERO);
    }

    #[test]
    fn test_wrap_through_tick() {
        let (mut sim, avatar) = quiet_sim();
        sim.world
            .as_mut()
            .unwrap()
            .set_position(avatar, Vec2::new(-1.0, 100.0));
        sim.tick(&TickInput::default());
        assert_eq!(sim.world().unwrap().get(avatar).unwrap().pos.x, 800.0);
    }

    #[test]
    fn test_resize_rebuilds_world() {
        let (mut sim, _) = quiet_sim();
        sim.push_command(Command::CreateEcho);
        sim.tick(&TickInput::default());
        assert_eq!(sim.entities().echoes().len(), 1);

        sim.push_command(Command::Resize {
            width: 1024.0,
            height: 768.0,
        });
        let report = sim.tick(&TickInput::default());

        assert!(report.events.contains(&GameEvent::WorldRebuilt {
            width: 1024,
            height: 768
        }));
        let world = sim.world().unwrap();
        assert_eq!(world.bounds().width, 1024.0);
        assert!(sim.entities().echoes().is_empty());
        let ground = world.get(sim.entities().platforms()[0]).unwrap();
        assert_eq!(ground.pos, Vec2::new(512.0, 748.0));
        assert_eq!(sim.snapshot().width, 1024.0);
    }

    #[test]
    fn test_fractional_resize_reports_rounded_size() {
        let (mut sim, _) = quiet_sim();
        sim.push_command(Command::Resize {
            width: 1024.7,
            height: 767.5,
        });
        let report = sim.tick(&TickInput::default());

        assert!(report.events.contains(&GameEvent::WorldRebuilt {
            width: 1025,
            height: 768
        }));
        assert_eq!(sim.world().unwrap().bounds().width, 1024.7);
    }

    #[test]
    fn test_fallen_enemy_culled() {
        let (mut sim, _) = quiet_sim();
        let world = sim.world.as_mut().unwrap();
        let enemy = sim.entities.spawn_enemy(world);
        world.set_position(enemy, Vec2::new(300.0, 900.0));

        sim.tick(&TickInput::default());

        assert!(sim.entities().enemies().is_empty());
        assert!(!sim.world().unwrap().contains(enemy));
        assert_eq!(sim.state().lives(), STARTING_LIVES);
    }

    #[test]
    fn test_invalid_resize_ignored() {
        let (mut sim, _) = quiet_sim();
        sim.push_command(Command::Resize {
            width: 0.0,
            height: 600.0,
        });
        let report = sim.tick(&TickInput::default());
        assert!(report.events.is_empty());
        assert_eq!(sim.world().unwrap().bounds().width, 800.0);
    }

    #[test]
    fn test_restart_after_game_over() {
        let (mut sim, _) = quiet_sim();
        sim.state.add_score(40).unwrap();
        for _ in 0..3 {
            sim.state.remove_life().unwrap();
        }
        assert!(sim.tick(&TickInput::default()).is_empty());

        sim.push_command(Command::Restart);
        let report = sim.tick(&TickInput::default());

        assert_eq!(report.events[0], GameEvent::Reset);
        assert!(matches!(report.events[1], GameEvent::WorldRebuilt { .. }));
        assert_eq!(sim.state().score(), 0);
        assert_eq!(sim.state().lives(), STARTING_LIVES);
        assert!(!sim.state().is_game_over());
        assert_eq!(sim.now(), TICK_MS);
    }

    #[test]
    fn test_next_level() {
        let (mut sim, _) = quiet_sim();
        sim.push_command(Command::NextLevel);
        let report = sim.tick(&TickInput::default());
        assert_eq!(report.events, vec![GameEvent::LevelChanged { level: 2 }]);
        assert_eq!(sim.snapshot().level, 2);
    }

    #[test]
    fn test_same_seed_same_run() {
        let script = |i: usize| TickInput {
            left: i % 120 < 40,
            right: i % 120 >= 80,
            jump_requested: i % 90 == 0,
            clone_requested: i % 150 == 10,
            pause_toggle_requested: false,
        };
        let run = || {
            let mut sim = Simulation::new(&Settings::default()).unwrap();
            let mut reports = Vec::new();
            for i in 0..600 {
                reports.push(sim.tick(&script(i)));
            }
            (sim.snapshot(), reports)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_teardown_stops_everything() {
        let (mut sim, _) = quiet_sim();
        sim.push_command(Command::CreateEcho);
        sim.tick(&TickInput::default());

        sim.teardown();
        assert!(sim.is_torn_down());
        assert!(sim.recorder().is_empty());
        assert!(sim.entities().echoes().is_empty());

        sim.push_command(Command::Restart);
        let report = sim.tick(&TickInput {
            right: true,
            ..TickInput::default()
        });
        assert!(report.is_empty());
        assert!(sim.snapshot().bodies.is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let (sim, _) = quiet_sim();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.bodies.len(), 5);
        assert_eq!(snapshot.bodies[0].category, Category::Avatar);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
