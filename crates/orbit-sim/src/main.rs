//! Orbit Sim
//!
//! Headless host for the orbital core. Physics ticks and render sampling run
//! as two independent intervals on a single-threaded runtime; the rails are
//! seeded with synthetic clicks shortly after start-up.
//!
//! Environment:
//! - `ORBIT_CONFIG`: optional path to a JSON `OrbitConfig`
//! - `ORBIT_RUN_SECS`: stop after this many seconds (runs until Ctrl-C otherwise)
//! - `RUST_LOG`: log filter, `info` by default

use std::time::Duration;

use anyhow::{Context, Result};
use orbit_core::{AutoSeeder, OrbitConfig, OrbitEvent, OrbitalSystem, SeedPlan};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STATUS_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let run_for = run_length()?;
    run(config, run_for).await
}

fn load_config() -> Result<OrbitConfig> {
    let Ok(path) = std::env::var("ORBIT_CONFIG") else {
        return Ok(OrbitConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {path}"))?;
    let config =
        OrbitConfig::from_json(&text).with_context(|| format!("invalid config in {path}"))?;
    info!("[sim] Loaded config from {}", path);
    Ok(config)
}

fn run_length() -> Result<Option<Duration>> {
    match std::env::var("ORBIT_RUN_SECS") {
        Ok(secs) => {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("ORBIT_RUN_SECS must be whole seconds, got {secs:?}"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}

async fn run(config: OrbitConfig, run_for: Option<Duration>) -> Result<()> {
    let mut system = OrbitalSystem::new(config.clone()).context("failed to start orbital system")?;
    system.subscribe(log_event);

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));
    let mut seeder = AutoSeeder::new(&config, &SeedPlan::default(), &mut rng);
    info!("[sim] Seeding {} particles", seeder.remaining());

    let mut physics = tokio::time::interval(config.tick_period());
    physics.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sampler = tokio::time::interval(config.sampler_period());
    sampler.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut status = tokio::time::interval(STATUS_INTERVAL);
    status.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = async {
        match run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last_seed_check = Instant::now();

    loop {
        tokio::select! {
            _ = physics.tick() => {
                system.tick();

                let now = Instant::now();
                for click in seeder.due(now - last_seed_check) {
                    match system.spawn_at_point(click.point) {
                        Ok(id) => debug!("[sim] Seeded {} near path {}", id, click.path_index),
                        Err(e) => warn!("[sim] Seed click rejected: {}", e),
                    }
                }
                last_seed_check = now;
            }
            _ = sampler.tick() => {
                let frame = system.refresh_frame();
                debug!(
                    "[sampler] Frame {} with {} particles",
                    frame.sequence,
                    frame.particles.len()
                );
            }
            _ = status.tick() => {
                info!(
                    "[sim] frame={} particles={} collisions={} hash={:016x}",
                    system.world().current_frame(),
                    system.particle_count(),
                    system.collision_count(),
                    system.state_hash()
                );
            }
            () = &mut deadline => {
                info!("[sim] Run length reached");
                break;
            }
            result = &mut ctrl_c => {
                result.context("failed to listen for Ctrl-C")?;
                info!("[sim] Interrupted");
                break;
            }
        }
    }

    let frame = system.pull_snapshot();
    debug!("[sim] Final frame: {}", serde_json::to_string(&frame)?);
    system.shutdown();
    Ok(())
}

fn log_event(event: &OrbitEvent) {
    match event {
        OrbitEvent::Impact(impact) => {
            info!(
                "[impact] {} beat {} at ({:.0}, {:.0})",
                impact.winner, impact.loser, impact.point[0], impact.point[1]
            );
        }
        OrbitEvent::Milestone { collisions } => {
            info!("[impact] Milestone: {} collisions", collisions);
        }
        OrbitEvent::Invalidated { id } => {
            warn!("[sweep] {} was invalidated", id);
        }
    }
}
