#![allow(non_ascii_idents, confusable_idents, mixed_script_confusables)]

//! Bakes a lava flow, and writes the packed playback buffer for the renderer.

use std::{path::PathBuf, process::ExitCode};

use lava_flow::{properties, BakeOutcome, Config, HeightMap, LavaError, SimulationManager};

const SAVE_FILE: &str = "config.lava";
/// A `HeightMap`, bincode-encoded by the terrain generator.
const HEIGHTMAP_FILE: &str = "heightmap.lava";
const DEFAULT_BAKE_FILE: &str = "bake.lava";

// Used when there's no height map on disk.
const FLAT_TERRAIN_SIZE: f64 = 3_000.;

fn load_heightmap(path: &PathBuf) -> Result<HeightMap, LavaError> {
    match HeightMap::load(path) {
        Ok(map) => {
            log::info!(
                "Loaded {}x{} height map from {}",
                map.buffer_width,
                map.buffer_height,
                path.display()
            );
            Ok(map)
        }
        Err(e) if e.is_not_found() => {
            log::warn!("No height map at {}; using flat terrain", path.display());
            Ok(HeightMap::flat(FLAT_TERRAIN_SIZE, FLAT_TERRAIN_SIZE, 0.)?)
        }
        Err(e) => Err(e),
    }
}

fn run() -> Result<(), LavaError> {
    let cfg = Config::load_or_default(&PathBuf::from(SAVE_FILE))?;
    let heightmap = load_heightmap(&PathBuf::from(HEIGHTMAP_FILE))?;

    let crater_center = cfg.volcano.crater_center;
    let mut manager = SimulationManager::new(cfg.sim, cfg.volcano, heightmap)?;

    if let BakeOutcome::Cancelled { steps_done } = manager.bake() {
        log::warn!("Bake stopped after {steps_done} steps");
    }

    let out = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_BAKE_FILE.to_owned()),
    );
    manager.save_buffer(&out)?;
    log::info!("Saved {} snapshots to {}", manager.buffer.len(), out.display());

    let temps = properties::temperature_series(&manager.buffer);
    if let Err(e) = properties::plot_temperature(&temps, "bake") {
        log::warn!("Error plotting temperature: {e}");
    }

    let front = properties::flow_front_series(&manager.buffer, crater_center);
    if let Err(e) = properties::plot_flow_front(&front, "bake") {
        log::warn!("Error plotting flow front: {e}");
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
