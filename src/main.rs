//! Echo Hop headless driver
//!
//! Runs a scripted session at a fixed frame rate, logs game events and
//! prints the final snapshot as JSON. Pass a settings file as the first
//! argument to override the defaults.

use echo_hop::sim::GameEvent;
use echo_hop::{LogBackend, Session, Settings};

/// Simulated display refresh
const FRAME_MS: f32 = 1000.0 / 60.0;
/// One minute of play
const MAX_FRAMES: u32 = 60 * 60;

fn load_settings() -> Settings {
    let Some(path) = std::env::args().nth(1) else {
        log::info!("Using default settings");
        return Settings::default();
    };
    match Settings::load(&path) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load settings from {path}: {e}");
            std::process::exit(1);
        }
    }
}

/// Weave back and forth, hop every second, drop an echo every two
fn script(session: &mut Session, frame: u32) {
    let phase = frame % 240;
    session.set_left(phase < 100);
    session.set_right((120..220).contains(&phase));
    session.set_jump(frame % 60 < 3);
    if frame % 120 == 30 {
        session.request_clone();
    }
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    log::info!("Echo Hop (headless) starting...");

    let settings = load_settings();
    let mut session = match Session::new(&settings, Box::new(LogBackend)) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Failed to start session: {e}");
            std::process::exit(1);
        }
    };

    for frame in 0..MAX_FRAMES {
        script(&mut session, frame);
        for event in session.advance(FRAME_MS) {
            match event {
                GameEvent::GameOver { final_score } => {
                    log::info!("Game over at frame {frame}, score {final_score}")
                }
                other => log::info!("{other:?}"),
            }
        }
        if session.final_score().is_some() {
            break;
        }
    }

    let snapshot = session.snapshot();
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to serialize snapshot: {e}"),
    }
    session.end();
}
