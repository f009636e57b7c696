//! Default physical parameters
//!
//! Values are in scene units (roughly pixels) and seconds, tuned so a few
//! thousand spheres settle visibly within a few seconds.

/// Vertical gravitational acceleration (negative is down)
pub const DEFAULT_GRAVITY: f32 = -100.0;

/// Per-step velocity retention factor (1.0 = no drag)
pub const DEFAULT_DRAG: f32 = 0.998;

/// Fraction of approach speed returned as separation speed after a contact
pub const DEFAULT_RESTITUTION: f32 = 0.8;

/// Fraction of speed kept when bouncing off a wall
pub const DEFAULT_WALL_DAMPENING: f32 = 0.8;

/// Fraction of the overlap depth removed per step by positional correction
pub const DEFAULT_POSITIONAL_CORRECTION: f32 = 0.1;

/// Grid cell size as a multiple of the largest particle radius
pub const DEFAULT_CELL_FACTOR: f32 = 2.01;

/// Smallest cell factor that still guarantees every touching pair lands in
/// the same or an adjacent cell
pub const MIN_CELL_FACTOR: f32 = 2.0;

/// Pairs closer than this have no usable contact normal and are skipped
pub const DEGENERATE_DISTANCE: f32 = 1.0e-6;

/// Inverse mass of every particle (uniform radius implies uniform mass)
pub const INV_MASS: f32 = 1.0;
