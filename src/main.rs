//! Dalgona entry point
//!
//! Headless driver: plays one round with random impacts and prints the
//! outcome as JSON. Usage: `dalgona [shape] [seed] [max_impacts]`.

#[cfg(not(target_arch = "wasm32"))]
use dalgona::{
    Settings,
    sim::{Session, SessionPhase, Silhouette},
};

#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_MAX_IMPACTS: u32 = 400;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Dalgona (native) starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the wasm surface; nothing to drive here
}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);

    let shape = match args.next() {
        Some(name) => name.parse::<Silhouette>().map_err(|e| {
            let known: Vec<_> = Silhouette::builtins().iter().map(|s| s.as_str().to_string()).collect();
            format!("{e}; expected one of: {}", known.join(", "))
        })?,
        None => Silhouette::default(),
    };
    let seed = match args.next() {
        Some(s) => s.parse::<u64>()?,
        None => rand::random(),
    };
    let max_impacts = match args.next() {
        Some(s) => s.parse::<u32>()?,
        None => DEFAULT_MAX_IMPACTS,
    };

    let settings = match std::env::var_os("DALGONA_SETTINGS") {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };

    let mut session = Session::new(settings, shape, seed)?;
    session.start()?;

    let mut last_report = None;
    while session.phase() == SessionPhase::Playing && session.impacts() < max_impacts {
        let Some((x, y)) = session.random_live_cell() else {
            log::warn!("No live cell found; stopping");
            break;
        };
        match session.impact(x, y) {
            Ok(report) => last_report = Some(report),
            Err(e) if e.is_rejection() => log::debug!("{e}"),
            Err(e) => return Err(e.into()),
        }
        // Nothing renders, so acknowledge dirty cells right away
        session.clear_dirty();

        if session.impacts() % 25 == 0 {
            let stats = session.stats();
            log::info!(
                "{} impacts: outline {:.1}%, integrity {:.1}%",
                session.impacts(),
                stats.outline_progress() * 100.0,
                stats.integrity() * 100.0
            );
        }
    }

    if session.phase() == SessionPhase::Playing {
        session.time_up();
    }

    let summary = serde_json::json!({
        "shape": session.silhouette().as_str(),
        "seed": session.seed(),
        "field": session.field_spec(),
        "phase": session.phase(),
        "impacts": session.impacts(),
        "stats": session.stats(),
        "outline_progress": session.stats().outline_progress(),
        "integrity": session.stats().integrity(),
        "last_impact": last_report,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
