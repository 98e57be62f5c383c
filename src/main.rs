use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info};

use scene_actions::engine::{EngineConfig, HostRequest, TickClock};
use scene_actions::game::{credits, CreditsFactory};
use scene_actions::scene::Director;

/// Safety stop for the demo, in ticks
const MAX_TICKS: u64 = 20_000;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting credits playback...");

    // Optional JSON config path as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => EngineConfig::default(),
    };
    config.validate()?;

    let factory = CreditsFactory::new()?;
    let mut director = Director::new(factory, config.clone(), credits::MOTORCYCLE_TRAINING)?;
    let mut clock = TickClock::new(&config);
    let frame_time = Duration::from_secs(1) / 60;
    let started = Instant::now();

    // Headless loop: simulated frames, fixed-rate ticks
    while director.scene().id() != credits::FIRST_DAY && clock.tick_count() < MAX_TICKS {
        let ticks = clock.advance_by(frame_time);
        for _ in 0..ticks {
            director.tick()?;
            if director.scene().id() == credits::FIRST_DAY {
                break;
            }
        }

        for request in director.drain_requests() {
            match request {
                HostRequest::PlaySound(sound) => info!("Host: play sound {}", sound),
                HostRequest::StopSound(sound) => info!("Host: stop sound {}", sound),
                HostRequest::LoadPalette(palette) => info!("Host: load palette {}", palette),
            }
        }

        if clock.frame_count() % 600 == 0 {
            let snapshot = director.scene().snapshot();
            debug!("Save at tick {}: {}", snapshot.tick, snapshot.to_json()?);
        }
    }

    info!(
        "Credits finished in scene {} after {} ticks ({} scene changes, {:.2?} wall time)",
        director.scene().id(),
        clock.tick_count(),
        director.scene_changes(),
        started.elapsed()
    );

    Ok(())
}
