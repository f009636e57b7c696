//! Solver parameters for runtime tuning
//!
//! Every tunable of the step pipeline lives here instead of in global
//! constants, so a run can be reconfigured (or loaded from a file) without
//! recompiling.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use sphere_physics::{
    CohesionParams, ContactParams, PhysicsError, DEFAULT_CELL_FACTOR, DEFAULT_DRAG,
    DEFAULT_GRAVITY, DEFAULT_POSITIONAL_CORRECTION, DEFAULT_RESTITUTION,
    DEFAULT_WALL_DAMPENING, MIN_CELL_FACTOR,
};

/// How candidate pairs are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhase {
    /// Uniform hash grid, rebuilt every step
    #[default]
    Grid,
    /// Every unordered pair; quadratic, for reference and tiny populations
    BruteForce,
}

/// Optional weak attraction/repulsion between nearby particles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohesionConfig {
    /// Reach as a multiple of the contact distance; must exceed 1
    pub radius_factor: f32,
    /// Peak velocity change per second
    pub strength: f32,
}

impl Default for CohesionConfig {
    fn default() -> Self {
        Self {
            radius_factor: 1.5,
            strength: 20.0,
        }
    }
}

/// Circular opening in the floor that sends particles back to a spawn box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoleConfig {
    /// Opening centre on the floor plane (x)
    pub center_x: f32,
    /// Opening centre on the floor plane (z)
    pub center_z: f32,
    pub radius: f32,
    /// Length of the open/closed cycle in iterations; 0 keeps the hole open
    pub cycle: u64,
    /// Iterations at the start of each cycle during which the hole is open
    pub open_steps: u64,
    /// Relocated particles are spread over this box
    pub spawn_min: Vec3,
    pub spawn_max: Vec3,
    /// Velocity given to relocated particles
    pub reset_velocity: Vec3,
}

impl Default for HoleConfig {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_z: 0.0,
            radius: 50.0,
            cycle: 0,
            open_steps: 0,
            spawn_min: Vec3::ZERO,
            spawn_max: Vec3::ZERO,
            reset_velocity: Vec3::ZERO,
        }
    }
}

impl HoleConfig {
    pub fn is_open(&self, iteration: u64) -> bool {
        self.cycle == 0 || iteration % self.cycle < self.open_steps
    }

    /// Whether a floor point lies inside the opening.
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let dx = x - self.center_x;
        let dz = z - self.center_z;
        dx * dx + dz * dz < self.radius * self.radius
    }
}

/// Spherical container inside the box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BowlConfig {
    pub center: Vec3,
    pub radius: f32,
}

/// Boundary behaviour besides the six box walls
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Plain box
    #[default]
    Walls,
    /// Box with a reset opening in the floor
    Hole(HoleConfig),
    /// Box with a spherical container inside it
    Bowl(BowlConfig),
}

/// Full solver configuration.
///
/// # Builder Pattern
/// ```
/// use sphere_simulation::SolverConfig;
///
/// let config = SolverConfig::default()
///     .with_gravity(0.0)
///     .with_drag(1.0)
///     .with_restitution(0.5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Vertical acceleration (negative is down). Default: -100.
    pub gravity: f32,
    /// Per-step velocity retention in (0, 1]. Default: 0.998.
    pub drag: f32,
    /// Contact restitution in [0, 1]. Default: 0.8.
    pub restitution: f32,
    /// Speed kept after a wall bounce, in [0, 1]. Default: 0.8.
    pub wall_dampening: f32,
    /// Fraction of overlap removed per step, in [0, 1]. Default: 0.1.
    pub positional_correction: f32,
    /// Grid cell size over the largest radius, at least 2. Default: 2.01.
    pub cell_factor: f32,
    /// Hard-collision response. Default: on.
    pub collisions: bool,
    /// Cohesion response. Default: off.
    pub cohesion: Option<CohesionConfig>,
    pub boundary: BoundaryMode,
    pub broad_phase: BroadPhase,
    /// Reorder particles by grid cell every this many iterations; 0 disables.
    pub reorder_interval: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            drag: DEFAULT_DRAG,
            restitution: DEFAULT_RESTITUTION,
            wall_dampening: DEFAULT_WALL_DAMPENING,
            positional_correction: DEFAULT_POSITIONAL_CORRECTION,
            cell_factor: DEFAULT_CELL_FACTOR,
            collisions: true,
            cohesion: None,
            boundary: BoundaryMode::Walls,
            broad_phase: BroadPhase::Grid,
            reorder_interval: 0,
        }
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), PhysicsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PhysicsError::InvalidParameter { name, value })
    }
}

fn check_finite(name: &'static str, value: f32) -> Result<(), PhysicsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidParameter { name, value })
    }
}

impl SolverConfig {
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_wall_dampening(mut self, wall_dampening: f32) -> Self {
        self.wall_dampening = wall_dampening;
        self
    }

    pub fn with_positional_correction(mut self, positional_correction: f32) -> Self {
        self.positional_correction = positional_correction;
        self
    }

    pub fn with_cell_factor(mut self, cell_factor: f32) -> Self {
        self.cell_factor = cell_factor;
        self
    }

    pub fn with_collisions(mut self, collisions: bool) -> Self {
        self.collisions = collisions;
        self
    }

    pub fn with_cohesion(mut self, cohesion: Option<CohesionConfig>) -> Self {
        self.cohesion = cohesion;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryMode) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_broad_phase(mut self, broad_phase: BroadPhase) -> Self {
        self.broad_phase = broad_phase;
        self
    }

    pub fn with_reorder_interval(mut self, reorder_interval: u64) -> Self {
        self.reorder_interval = reorder_interval;
        self
    }

    /// Check every field's range.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        check_finite("gravity", self.gravity)?;
        if !(self.drag > 0.0 && self.drag <= 1.0) {
            return Err(PhysicsError::InvalidParameter {
                name: "drag",
                value: self.drag,
            });
        }
        check_unit("restitution", self.restitution)?;
        check_unit("wall_dampening", self.wall_dampening)?;
        check_unit("positional_correction", self.positional_correction)?;
        if !(self.cell_factor.is_finite() && self.cell_factor >= MIN_CELL_FACTOR) {
            return Err(PhysicsError::InvalidCellFactor {
                value: self.cell_factor,
                min: MIN_CELL_FACTOR,
            });
        }

        if let Some(cohesion) = &self.cohesion {
            if !(cohesion.radius_factor.is_finite() && cohesion.radius_factor > 1.0) {
                return Err(PhysicsError::InvalidParameter {
                    name: "cohesion.radius_factor",
                    value: cohesion.radius_factor,
                });
            }
            check_finite("cohesion.strength", cohesion.strength)?;
        }

        match &self.boundary {
            BoundaryMode::Walls => {}
            BoundaryMode::Hole(hole) => {
                check_finite("hole.center_x", hole.center_x)?;
                check_finite("hole.center_z", hole.center_z)?;
                if !(hole.radius.is_finite() && hole.radius > 0.0) {
                    return Err(PhysicsError::InvalidParameter {
                        name: "hole.radius",
                        value: hole.radius,
                    });
                }
                if !(hole.spawn_min.is_finite()
                    && hole.spawn_max.is_finite()
                    && hole.reset_velocity.is_finite())
                {
                    return Err(PhysicsError::InvalidParameter {
                        name: "hole.spawn",
                        value: f32::NAN,
                    });
                }
            }
            BoundaryMode::Bowl(bowl) => {
                if !bowl.center.is_finite() {
                    return Err(PhysicsError::InvalidParameter {
                        name: "bowl.center",
                        value: f32::NAN,
                    });
                }
                if !(bowl.radius.is_finite() && bowl.radius > 0.0) {
                    return Err(PhysicsError::InvalidParameter {
                        name: "bowl.radius",
                        value: bowl.radius,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn contact_params(&self) -> ContactParams {
        ContactParams {
            restitution: self.restitution,
            positional_correction: self.positional_correction,
        }
    }

    pub fn cohesion_params(&self) -> Option<CohesionParams> {
        self.cohesion.map(|c| CohesionParams {
            radius_factor: c.radius_factor,
            strength: c.strength,
        })
    }

    /// Cell factor actually used for the grid: widened so the cohesion reach
    /// also stays within adjacent cells.
    pub fn effective_cell_factor(&self) -> f32 {
        match &self.cohesion {
            Some(cohesion) => self.cell_factor.max(2.0 * cohesion.radius_factor),
            None => self.cell_factor,
        }
    }
}
