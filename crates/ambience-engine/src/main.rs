//! # Ambience Engine
//!
//! Demo driver for the ambient sound scheduler.
//!
//! Simulates a small world of moving emitters and drives the scheduler once
//! per frame, either against the system audio device (feature `device`) or
//! against the in-memory backend.
//!
//! ```text
//! ambience [CONFIG]          run with CONFIG (default: ambience.toml)
//! ambience --init [CONFIG]   write the default configuration and exit
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod sim;
mod timing;

use std::time::Duration;

use ambience_common::SoundId;
use ambience_kernel::{AmbientScheduler, PlaybackBackend, SoundBank, VirtualBackend};
use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{DemoConfig, CONFIG_FILE};
use crate::sim::Simulation;

/// Length of each generated loop.
const TONE_LENGTH: Duration = Duration::from_secs(2);

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("ambience=info".parse()?))
        .init();

    info!("Project Ambience starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let first = args.next();
    if first.as_deref() == Some("--init") {
        let path = args.next().unwrap_or_else(|| CONFIG_FILE.to_string());
        DemoConfig::default().save_to(path)?;
        return Ok(());
    }

    let config = DemoConfig::load_from(first.unwrap_or_else(|| CONFIG_FILE.to_string()));

    let bank = demo_bank();
    let mut sounds: Vec<SoundId> = bank.ids().collect();
    sounds.sort_unstable();
    if sounds.is_empty() {
        bail!("No sounds to play");
    }

    let mut backend = open_backend(bank);
    let mut scheduler = AmbientScheduler::new(config.scheduler.clone());
    let mut sim = Simulation::new(config, sounds);

    let summary = sim.run(&mut scheduler, backend.as_mut());
    info!(
        "Ran {} frames ({} idle): {} spawned, {} continued, {} reassigned, {} released, {} dropped, peak {} voices",
        summary.frames,
        summary.idle_frames,
        summary.spawned,
        summary.continued,
        summary.reassigned,
        summary.released,
        summary.dropped,
        summary.peak_voices
    );

    info!("Project Ambience shutdown complete");
    Ok(())
}

/// Synthetic loops standing in for ambience assets.
fn demo_bank() -> SoundBank {
    let mut bank = SoundBank::new();
    bank.add_tone("wind", 110.0, TONE_LENGTH);
    bank.add_tone("river", 220.0, TONE_LENGTH);
    bank.add_tone("fire", 330.0, TONE_LENGTH);
    bank.add_tone("crowd", 440.0, TONE_LENGTH);
    bank
}

#[cfg(feature = "device")]
fn open_backend(bank: SoundBank) -> Box<dyn PlaybackBackend> {
    let sounds: Vec<SoundId> = bank.ids().collect();
    let backend = ambience_kernel::RodioBackend::new(bank);
    if backend.is_available() {
        info!("Playing through the default audio device");
        return Box::new(backend);
    }

    tracing::warn!("No audio device; falling back to silent playback");
    Box::new(VirtualBackend::new().with_sounds(sounds))
}

#[cfg(not(feature = "device"))]
fn open_backend(bank: SoundBank) -> Box<dyn PlaybackBackend> {
    info!("Silent playback (build with --features device for sound output)");
    Box::new(VirtualBackend::new().with_sounds(bank.ids()))
}
