//! Floorsim Runtime
//!
//! Loads a scenario, runs it to completion and reports the verifier verdict.
//!
//! Usage: `floorsim <scenario.json> [--telemetry]`

mod scenario;

use anyhow::{bail, Context, Result};
use floorsim_core::processes::{TelemetrySink, TesterProcess, TesterState, WatcherProcess};
use floorsim_core::systems::ObserverSystem;
use scenario::{Loaded, Scenario};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const TELEMETRY_TAG: &str = "Telemetry";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Floorsim v{}", floorsim_core::VERSION);

    let mut path: Option<PathBuf> = None;
    let mut telemetry = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--telemetry" => telemetry = true,
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument '{arg}'"),
        }
    }
    let path = path.context("usage: floorsim <scenario.json> [--telemetry]")?;

    let scenario = Scenario::load(&path)?;
    let Loaded {
        mut sim,
        tester,
        robots,
    } = scenario.build()?;
    for (name, entity) in &robots {
        tracing::debug!(%name, %entity, "robot");
    }

    if telemetry {
        sim.add_system(ObserverSystem::standard().with_tag(TELEMETRY_TAG))?;
        let sink = TelemetrySink::new().with_consumer(|message, idx| println!("{idx} {message}"));
        sim.add_process(WatcherProcess::new(sink).with_tag(TELEMETRY_TAG));
    }

    let summary = sim.run()?;

    let verdict = sim
        .process::<TesterProcess>(tester)
        .map(TesterProcess::state)
        .unwrap_or(TesterState::Failure);
    tracing::info!(?verdict, frames = summary.frames, end_time = summary.end_time, reason = ?summary.reason, "run complete");

    if verdict != TesterState::Success {
        let pending = sim
            .process::<TesterProcess>(tester)
            .and_then(TesterProcess::pending)
            .unwrap_or("<none>");
        bail!("verification failed at requirement '{pending}'");
    }
    Ok(())
}
