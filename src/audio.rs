//! Audio service
//!
//! Consumes the cues and state changes each tick produces. Playback goes
//! through an injected backend so the service has an explicit lifecycle
//! (`init` / `dispose`) and no process-wide state.

pub use crate::sim::events::SoundCue;
use crate::sim::events::{GameEvent, TickReport};
use crate::settings::AudioSettings;

/// Background music level relative to the music volume setting
const MUSIC_BASE_VOLUME: f32 = 0.3;

impl SoundCue {
    /// Per-cue mix level before master/sfx scaling
    pub fn base_volume(self) -> f32 {
        match self {
            SoundCue::Jump => 0.5,
            SoundCue::Bounce => 0.3,
            SoundCue::Clone => 0.6,
            SoundCue::Collect => 0.5,
            SoundCue::Hit => 0.6,
            SoundCue::Fall => 0.4,
            SoundCue::EnemyDefeat => 0.5,
        }
    }

    /// Asset name a file-based backend would load
    pub fn asset_name(self) -> &'static str {
        match self {
            SoundCue::Jump => "jump",
            SoundCue::Bounce => "bounce",
            SoundCue::Clone => "clone",
            SoundCue::Collect => "collect",
            SoundCue::Hit => "hit",
            SoundCue::Fall => "fall",
            SoundCue::EnemyDefeat => "enemyDefeat",
        }
    }
}

/// Something that can actually make sound
pub trait AudioBackend {
    /// Fire-and-forget playback at `volume` (0.0 - 1.0)
    fn play(&mut self, cue: SoundCue, volume: f32);

    /// Start or stop the background loop
    fn set_music(&mut self, playing: bool, volume: f32);
}

/// Backend that only logs; used by the headless binary
#[derive(Debug, Default)]
pub struct LogBackend;

impl AudioBackend for LogBackend {
    fn play(&mut self, cue: SoundCue, volume: f32) {
        log::debug!("[audio] {} @ {volume:.2}", cue.asset_name());
    }

    fn set_music(&mut self, playing: bool, volume: f32) {
        log::debug!("[audio] music {} @ {volume:.2}", if playing { "on" } else { "off" });
    }
}

/// Audio service for the game
pub struct AudioService {
    backend: Option<Box<dyn AudioBackend>>,
    master_volume: f32,
    sfx_volume: f32,
    music_volume: f32,
    muted: bool,
    /// Whether music should be playing, independent of mute
    music_wanted: bool,
}

impl AudioService {
    /// Create an uninitialised service; nothing plays until [`init`](Self::init)
    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            backend: None,
            master_volume: settings.master_volume.clamp(0.0, 1.0),
            sfx_volume: settings.sfx_volume.clamp(0.0, 1.0),
            music_volume: settings.music_volume.clamp(0.0, 1.0),
            muted: settings.muted,
            music_wanted: false,
        }
    }

    /// Attach a backend, replacing (and silencing) any previous one
    pub fn init(&mut self, backend: Box<dyn AudioBackend>) {
        self.dispose();
        self.backend = Some(backend);
        log::info!("Audio initialised");
    }

    /// Stop music and release the backend
    pub fn dispose(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.set_music(false, 0.0);
            log::info!("Audio disposed");
        }
        self.music_wanted = false;
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.backend.is_some()
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
        self.sync_music();
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Set music volume (0.0 - 1.0)
    pub fn set_music_volume(&mut self, vol: f32) {
        self.music_volume = vol.clamp(0.0, 1.0);
        self.sync_music();
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.sync_music();
    }

    /// Flip mute, returning the new value
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    #[inline]
    pub fn music_playing(&self) -> bool {
        self.music_wanted && !self.muted && self.is_ready()
    }

    /// Get effective volume
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    fn music_level(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.music_volume * MUSIC_BASE_VOLUME
        }
    }

    /// Play a sound effect
    pub fn play(&mut self, cue: SoundCue) {
        let vol = self.effective_volume() * cue.base_volume();
        if vol <= 0.0 {
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            log::debug!("Audio not ready, dropping {cue:?}");
            return;
        };
        backend.play(cue, vol);
    }

    /// Request background music on or off
    pub fn set_music(&mut self, playing: bool) {
        self.music_wanted = playing;
        self.sync_music();
    }

    fn sync_music(&mut self) {
        let playing = self.music_wanted && !self.muted;
        let level = self.music_level();
        if let Some(backend) = self.backend.as_mut() {
            backend.set_music(playing, level);
        }
    }

    /// Play a tick's cues and follow its pause/game-over transitions
    pub fn dispatch(&mut self, report: &TickReport) {
        for &cue in &report.cues {
            self.play(cue);
        }
        for event in &report.events {
            match *event {
                GameEvent::PauseChanged { paused } => self.set_music(!paused),
                GameEvent::GameOver { .. } => self.set_music(false),
                GameEvent::Reset => self.set_music(true),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Played {
        Cue(SoundCue, f32),
        Music(bool, f32),
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Played>>>);

    impl AudioBackend for Recorder {
        fn play(&mut self, cue: SoundCue, volume: f32) {
            self.0.borrow_mut().push(Played::Cue(cue, volume));
        }

        fn set_music(&mut self, playing: bool, volume: f32) {
            self.0.borrow_mut().push(Played::Music(playing, volume));
        }
    }

    fn service() -> (AudioService, Rc<RefCell<Vec<Played>>>) {
        let recorder = Recorder::default();
        let log = recorder.0.clone();
        let mut audio = AudioService::new(&AudioSettings {
            master_volume: 1.0,
            sfx_volume: 1.0,
            music_volume: 1.0,
            muted: false,
        });
        audio.init(Box::new(recorder));
        (audio, log)
    }

    #[test]
    fn test_cue_volume_scaling() {
        let (mut audio, log) = service();
        audio.set_master_volume(0.5);
        log.borrow_mut().clear();

        audio.play(SoundCue::Clone);
        assert_eq!(*log.borrow(), vec![Played::Cue(SoundCue::Clone, 0.3)]);
    }

    #[test]
    fn test_muted_plays_nothing() {
        let (mut audio, log) = service();
        assert!(audio.toggle_mute());
        log.borrow_mut().clear();

        audio.play(SoundCue::Hit);
        assert!(log.borrow().is_empty());
        assert_eq!(audio.effective_volume(), 0.0);
    }

    #[test]
    fn test_uninitialised_is_silent() {
        let mut audio = AudioService::new(&AudioSettings::default());
        assert!(!audio.is_ready());
        audio.play(SoundCue::Jump);
        audio.set_music(true);
        assert!(!audio.music_playing());
    }

    #[test]
    fn test_music_follows_pause() {
        let (mut audio, log) = service();
        audio.set_music(true);
        assert!(audio.music_playing());

        let mut report = TickReport::default();
        report.event(GameEvent::PauseChanged { paused: true });
        audio.dispatch(&report);
        assert!(!audio.music_playing());
        assert_eq!(log.borrow().last(), Some(&Played::Music(false, 0.3)));

        let mut report = TickReport::default();
        report.event(GameEvent::PauseChanged { paused: false });
        audio.dispatch(&report);
        assert!(audio.music_playing());
    }

    #[test]
    fn test_mute_silences_music_but_remembers_it() {
        let (mut audio, log) = service();
        audio.set_music(true);
        audio.set_muted(true);
        assert_eq!(log.borrow().last(), Some(&Played::Music(false, 0.0)));
        audio.set_muted(false);
        assert_eq!(log.borrow().last(), Some(&Played::Music(true, 0.3)));
    }

    #[test]
    fn test_dispatch_plays_cues_in_order() {
        let (mut audio, log) = service();
        log.borrow_mut().clear();
        let mut report = TickReport::default();
        report.cue(SoundCue::Hit);
        report.cue(SoundCue::Collect);
        report.event(GameEvent::GameOver { final_score: 10 });
        audio.dispatch(&report);

        assert_eq!(
            *log.borrow(),
            vec![
                Played::Cue(SoundCue::Hit, 0.6),
                Played::Cue(SoundCue::Collect, 0.5),
                Played::Music(false, 0.3),
            ]
        );
    }

    #[test]
    fn test_dispose_stops_music() {
        let (mut audio, log) = service();
        audio.set_music(true);
        audio.dispose();
        assert!(!audio.is_ready());
        assert_eq!(log.borrow().last(), Some(&Played::Music(false, 0.0)));
        // Idempotent
        let len = log.borrow().len();
        audio.dispose();
        assert_eq!(log.borrow().len(), len);
    }
}
