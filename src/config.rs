//! Run configuration for the headless driver
//!
//! Every field has a default, so a JSON file only needs the values it changes:
//!
//! ```json
//! { "particle_count": 2000, "solver": { "gravity": -50.0 } }
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};
use sphere_simulation::SolverConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Initial placement of the particle cloud
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Cloud corner as a fraction of the box size
    pub origin_fraction: Vec3,
    /// Edge length of the cube positions are drawn from
    pub spread: f32,
    /// Initial speed
    pub speed: f32,
    /// Phase increment per particle for the initial velocity direction
    pub swirl: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            origin_fraction: Vec3::new(0.48, 0.7, 0.5),
            spread: 100.0,
            speed: 120.0,
            swirl: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub particle_count: usize,
    pub radius: f32,
    /// Box extents (width, height, depth)
    pub bounds: Vec3,
    /// Fixed time step per frame
    pub dt: f32,
    pub frames: u64,
    /// Frames between progress lines; 0 disables them
    pub log_interval: u64,
    /// RNG seed for the initial cloud; random when absent
    pub seed: Option<u64>,
    pub spawn: SpawnConfig,
    pub solver: SolverConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            particle_count: 10_000,
            radius: 12.0,
            bounds: Vec3::new(1280.0, 720.0, 720.0),
            dt: 0.05,
            frames: 1000,
            log_interval: 100,
            seed: None,
            spawn: SpawnConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &text)
    }
}
