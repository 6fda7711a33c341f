//! Headless host for `.ONE` scenes.
//!
//! Drives a [`LoadController`] the way an interactive viewer would: requests
//! a load, keeps ticking while the decode runs in the background, and once
//! the finish event arrives logs the composite the renderer would draw.
//!
//! Run: `cargo run -- <file.ONE> [--single]`

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use glam::Vec3;
use onefile::{CompositeMode, LoadController, LoadEvent, LoaderConfig, SceneModel, composite};

/// Interval between event polls.
const TICK: Duration = Duration::from_millis(16);

struct Args {
    path: PathBuf,
    mode: CompositeMode,
}

fn parse_args() -> Option<Args> {
    let mut path = None;
    let mut mode = CompositeMode::Nested;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--single" => mode = CompositeMode::Single,
            "--nested" => mode = CompositeMode::Nested,
            _ if path.is_none() && !arg.starts_with("--") => path = Some(PathBuf::from(arg)),
            _ => return None,
        }
    }
    Some(Args { path: path?, mode })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let Some(args) = parse_args() else {
        eprintln!("usage: onefile-client <file.ONE> [--single]");
        std::process::exit(2);
    };

    let mut loader = LoadController::new(LoaderConfig::default())?;
    let events = loader.events();
    loader.load(&args.path);

    let success = loop {
        // Drain whatever arrived since the last tick.
        let mut finished = None;
        while let Ok(event) = events.try_recv() {
            match event {
                LoadEvent::Started { path } => {
                    tracing::info!("Load started: {}", path.display());
                }
                LoadEvent::Finished {
                    path,
                    success,
                    error,
                } => {
                    if let Some(e) = error {
                        tracing::error!("Load of {} failed: {}", path.display(), e);
                    }
                    finished = Some(success);
                }
            }
        }
        if let Some(success) = finished {
            break success;
        }
        std::thread::sleep(TICK);
    };

    if !success {
        std::process::exit(1);
    }

    log_composite(&loader.model(), args.mode);
    Ok(())
}

fn log_composite(model: &SceneModel, mode: CompositeMode) {
    let composite = composite(model, mode);
    tracing::info!(
        "Scene '{}' ({:?}): {} active volumes, emission={}, opacity={}",
        model.scene().name,
        mode,
        composite.len(),
        composite.shading.emission,
        composite.shading.opacity
    );

    for (slot, entry) in composite.entries.iter().enumerate() {
        let volume = &model.volumes()[entry.volume_index];
        let texture = &model.textures()[entry.texture_index];
        let center = entry.bounds_transform().transform_point3(Vec3::ZERO);
        tracing::info!(
            "  [{}] volume '{}' -> texture '{}' {}x{}x{} {:?}, center={}, blend={}, replace={}",
            slot,
            volume.name,
            texture.name,
            texture.size_x(),
            texture.size_y(),
            texture.size_z(),
            texture.field.texel_format(),
            center,
            entry.blend,
            entry.replace
        );
    }
}
