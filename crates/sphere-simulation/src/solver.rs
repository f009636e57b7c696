//! Step pipeline
//!
//! One step is a fixed sequence of full passes over the population:
//! integrate, boundary constraints, broad phase, pair resolution. Each pass
//! completes before the next one starts. The solver keeps no state between
//! steps besides its bounds and configuration; the caller supplies `dt` and
//! a monotonically increasing iteration counter that only drives periodic
//! behaviour (hole cycle, locality reordering).

use crate::boundary::{apply_boundary_constraints, BoundaryStats};
use crate::params::{BroadPhase, SolverConfig};
use glam::Vec3;
use sphere_physics::{
    apply_cohesion, for_each_pair, resolve_collision, ContactOutcome, ParticleStore,
    PhysicsError, SpatialGrid,
};

/// Counters for one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Candidate pairs produced by the broad phase
    pub candidate_pairs: usize,
    /// Candidate pairs that actually overlapped
    pub contacts: usize,
    /// Contacts that received a restitution impulse
    pub impulses: usize,
    /// Contacts skipped for impulse because the pair was already separating
    pub separating: usize,
    /// Pairs skipped because no contact normal existed or the result was non-finite
    pub degenerate: usize,
    /// Pairs that received a cohesion impulse
    pub cohesion_impulses: usize,
    /// Occupied grid cells (0 with the brute-force broad phase)
    pub occupied_cells: usize,
    /// Largest grid cell population
    pub max_cell_occupancy: usize,
    pub wall_hits: usize,
    pub resets: usize,
    pub sanitized: usize,
    /// Whether the population was reordered for locality this step
    pub reordered: bool,
}

impl StepStats {
    fn record_contact(&mut self, outcome: ContactOutcome) {
        if outcome.is_contact() {
            self.contacts += 1;
        }
        match outcome {
            ContactOutcome::Apart => {}
            ContactOutcome::Separating => self.separating += 1,
            ContactOutcome::Impulse => self.impulses += 1,
            ContactOutcome::Degenerate | ContactOutcome::NonFinite => self.degenerate += 1,
        }
    }

    fn record_boundary(&mut self, boundary: BoundaryStats) {
        self.wall_hits = boundary.wall_hits;
        self.resets = boundary.resets;
        self.sanitized = boundary.sanitized;
    }
}

/// Advances a [`ParticleStore`] inside an axis-aligned box `[0, bounds]`
pub struct Solver {
    store: ParticleStore,
    bounds: Vec3,
    config: SolverConfig,
}

impl Solver {
    /// Create a solver owning `store`. `bounds` are the box extents
    /// (width, height, depth).
    pub fn new(
        store: ParticleStore,
        bounds: Vec3,
        config: SolverConfig,
    ) -> Result<Self, PhysicsError> {
        config.validate()?;
        Self::check_bounds(&store, bounds)?;

        log::info!(
            "Solver initialized: {} particles, radius {}, bounds {:?}",
            store.count(),
            store.radius(0),
            bounds
        );

        Ok(Self {
            store,
            bounds,
            config,
        })
    }

    /// Create a solver with the default configuration.
    pub fn with_dimensions(
        store: ParticleStore,
        width: f32,
        height: f32,
        depth: f32,
    ) -> Result<Self, PhysicsError> {
        Self::new(store, Vec3::new(width, height, depth), SolverConfig::default())
    }

    fn check_bounds(store: &ParticleStore, bounds: Vec3) -> Result<(), PhysicsError> {
        let min = 2.0 * store.radius(0);
        if !(bounds.is_finite() && bounds.cmpge(Vec3::splat(min)).all()) {
            return Err(PhysicsError::InvalidBounds {
                width: bounds.x,
                height: bounds.y,
                depth: bounds.z,
                min,
            });
        }
        Ok(())
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ParticleStore {
        &mut self.store
    }

    pub fn bounds(&self) -> Vec3 {
        self.bounds
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Swap in a new configuration; rejected (and the old one kept) if invalid.
    pub fn set_config(&mut self, config: SolverConfig) -> Result<(), PhysicsError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Advance the simulation by `dt`.
    ///
    /// A non-finite or non-positive `dt` leaves the state untouched.
    pub fn step(&mut self, dt: f32, iteration: u64) -> StepStats {
        if !(dt.is_finite() && dt > 0.0) {
            log::warn!("Ignoring step {} with invalid dt {}", iteration, dt);
            return StepStats::default();
        }

        let mut stats = StepStats::default();

        self.store.integrate(dt, self.config.gravity, self.config.drag);

        let boundary = self.apply_boundary_constraints(dt, iteration);
        stats.record_boundary(boundary);

        let grid = self.resolve_pairs(dt, &mut stats);

        if self.reorder_due(iteration) {
            let grid = grid.unwrap_or_else(|| {
                SpatialGrid::build(&self.store, self.config.effective_cell_factor())
            });
            stats.reordered = self.reorder_for_locality(&grid);
        }

        log::debug!("step {}: {:?}", iteration, stats);
        stats
    }

    /// Run only the boundary pass.
    pub fn apply_boundary_constraints(&mut self, dt: f32, iteration: u64) -> BoundaryStats {
        apply_boundary_constraints(&mut self.store, self.bounds, &self.config, dt, iteration)
    }

    /// Enumerate candidate pairs and apply the enabled responses. Returns the
    /// grid when one was built.
    fn resolve_pairs(&mut self, dt: f32, stats: &mut StepStats) -> Option<SpatialGrid> {
        let collisions = self.config.collisions.then(|| self.config.contact_params());
        let cohesion = self.config.cohesion_params();
        if collisions.is_none() && cohesion.is_none() {
            return None;
        }

        let grid = match self.config.broad_phase {
            BroadPhase::Grid => Some(SpatialGrid::build(
                &self.store,
                self.config.effective_cell_factor(),
            )),
            BroadPhase::BruteForce => None,
        };

        let count = self.store.count();
        let store = &mut self.store;
        let mut resolve = |i: usize, j: usize| {
            stats.candidate_pairs += 1;
            if let Some(params) = &collisions {
                stats.record_contact(resolve_collision(store, i, j, params));
            }
            if let Some(params) = &cohesion {
                if apply_cohesion(store, i, j, params, dt) {
                    stats.cohesion_impulses += 1;
                }
            }
        };

        match &grid {
            Some(grid) => grid.for_each_candidate_pair(&mut resolve),
            None => for_each_pair(count, &mut resolve),
        }

        if let Some(grid) = &grid {
            stats.occupied_cells = grid.occupied_cells();
            stats.max_cell_occupancy = grid.max_occupancy();
        }
        grid
    }

    fn reorder_due(&self, iteration: u64) -> bool {
        let interval = self.config.reorder_interval;
        interval > 0 && iteration % interval == 0 && !self.store.is_empty()
    }

    /// Lay particles out in memory cell by cell.
    fn reorder_for_locality(&mut self, grid: &SpatialGrid) -> bool {
        match self.store.reorder(&grid.locality_order()) {
            Ok(()) => {
                log::info!(
                    "Reordered {} particles across {} cells",
                    self.store.count(),
                    grid.occupied_cells()
                );
                true
            }
            Err(err) => {
                log::warn!("Skipping locality reorder: {}", err);
                false
            }
        }
    }
}
