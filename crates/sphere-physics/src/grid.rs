//! Uniform hash grid for broad-phase contact detection
//!
//! The grid is rebuilt from scratch every step. Each particle index goes into
//! the cell containing its centre; only occupied cells exist as map entries.
//! With a cell size of at least twice the largest radius, any two touching
//! spheres sit in the same cell or in one of the 26 surrounding cells, so
//! candidate pairs come from the cell itself plus a fixed half of its
//! neighbourhood. The other half is covered when the neighbour's own turn
//! comes, which makes every neighbouring relationship count exactly once.
//!
//! Cost is proportional to `count * occupancy`. If most particles collapse
//! into a handful of cells it degrades towards O(count²); that case is not
//! handled specially.

use crate::store::ParticleStore;
use glam::{IVec3, Vec3};
use std::collections::HashMap;

/// Anything the grid can be built from.
pub trait ParticleSource {
    fn count(&self) -> usize;
    fn radius(&self, index: usize) -> f32;
    fn position(&self, index: usize) -> Vec3;
}

impl ParticleSource for ParticleStore {
    fn count(&self) -> usize {
        ParticleStore::count(self)
    }

    fn radius(&self, index: usize) -> f32 {
        ParticleStore::radius(self, index)
    }

    fn position(&self, index: usize) -> Vec3 {
        ParticleStore::position(self, index)
    }
}

/// Neighbour cells paired with each occupied cell: four in the same z-layer
/// and all nine in the layer above. No offset appears together with its
/// negation, and together with their negations they form the full 26-cell
/// neighbourhood.
pub const NEIGHBOR_OFFSETS: [IVec3; 13] = [
    IVec3::new(0, 1, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(1, 1, 0),
    IVec3::new(1, -1, 0),
    IVec3::new(-1, -1, 1),
    IVec3::new(-1, 0, 1),
    IVec3::new(-1, 1, 1),
    IVec3::new(0, -1, 1),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 1, 1),
    IVec3::new(1, -1, 1),
    IVec3::new(1, 0, 1),
    IVec3::new(1, 1, 1),
];

/// Sparse map from cell coordinate to the particle indices inside it
#[derive(Debug, Clone, Default)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<usize>>,
    /// Occupied cells in the order they were first touched, so pair
    /// enumeration does not depend on hash map iteration order.
    occupied: Vec<IVec3>,
    particle_count: usize,
}

impl SpatialGrid {
    /// Bucket every particle of `source` into cells of size
    /// `max_radius * cell_factor`.
    pub fn build<S: ParticleSource + ?Sized>(source: &S, cell_factor: f32) -> Self {
        let count = source.count();
        let max_radius = (0..count)
            .map(|i| source.radius(i))
            .fold(0.0_f32, f32::max);

        let mut grid = Self {
            cell_size: max_radius * cell_factor,
            cells: HashMap::with_capacity(count),
            occupied: Vec::with_capacity(count),
            particle_count: count,
        };

        for index in 0..count {
            let key = grid.cell_of(source.position(index));
            match grid.cells.get_mut(&key) {
                Some(members) => members.push(index),
                None => {
                    grid.cells.insert(key, vec![index]);
                    grid.occupied.push(key);
                }
            }
        }

        grid
    }

    /// Cell coordinate containing `position`.
    ///
    /// A degenerate cell size (zero radius, zero factor, non-finite values)
    /// puts everything in a single cell, which stays correct but quadratic.
    pub fn cell_of(&self, position: Vec3) -> IVec3 {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return IVec3::ZERO;
        }
        (position / self.cell_size).floor().as_ivec3()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of particles the grid was built from
    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Number of non-empty cells
    pub fn occupied_cells(&self) -> usize {
        self.occupied.len()
    }

    /// Particle indices in `cell`, in source order. Empty if the cell is unoccupied.
    pub fn cell(&self, cell: IVec3) -> &[usize] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Largest number of particles sharing one cell
    pub fn max_occupancy(&self) -> usize {
        self.cells.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Call `f(i, j)` once for every candidate pair.
    ///
    /// Pairs inside a cell come from the cell's own pass; pairs across cells
    /// come from whichever side holds the offset in [`NEIGHBOR_OFFSETS`].
    /// `i != j` always holds and no unordered pair is produced twice.
    pub fn for_each_candidate_pair<F: FnMut(usize, usize)>(&self, mut f: F) {
        for key in &self.occupied {
            let members = &self.cells[key];

            for (a, &i) in members.iter().enumerate() {
                for &j in &members[a + 1..] {
                    f(i, j);
                }
            }

            for offset in NEIGHBOR_OFFSETS {
                let Some(neighbors) = self.cells.get(&key.wrapping_add(offset)) else {
                    continue;
                };
                for &i in members {
                    for &j in neighbors {
                        f(i, j);
                    }
                }
            }
        }
    }

    /// All candidate pairs, collected.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        self.for_each_candidate_pair(|i, j| pairs.push((i, j)));
        pairs
    }

    /// Particle indices grouped cell by cell, cells in first-touched order.
    ///
    /// Feeding this to [`ParticleStore::reorder`] places particles that share
    /// a cell next to each other in memory.
    pub fn locality_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.particle_count);
        for key in &self.occupied {
            order.extend_from_slice(&self.cells[key]);
        }
        order
    }
}

/// Call `f(i, j)` for every unordered pair `i < j` of a population of
/// `count` particles. Quadratic reference enumeration.
pub fn for_each_pair<F: FnMut(usize, usize)>(count: usize, mut f: F) {
    for i in 0..count {
        for j in i + 1..count {
            f(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    /// Spheres with individual radii
    struct Spheres {
        centers: Vec<Vec3>,
        radii: Vec<f32>,
    }

    impl ParticleSource for Spheres {
        fn count(&self) -> usize {
            self.centers.len()
        }

        fn radius(&self, index: usize) -> f32 {
            self.radii[index]
        }

        fn position(&self, index: usize) -> Vec3 {
            self.centers[index]
        }
    }

    fn unordered(i: usize, j: usize) -> (usize, usize) {
        (i.min(j), i.max(j))
    }

    fn touching<S: ParticleSource>(source: &S) -> HashSet<(usize, usize)> {
        let mut pairs = HashSet::new();
        for_each_pair(source.count(), |i, j| {
            let d = source.position(i).distance(source.position(j));
            if d < source.radius(i) + source.radius(j) {
                pairs.insert((i, j));
            }
        });
        pairs
    }

    /// Every touching pair shows up exactly once, nothing is paired with itself.
    fn assert_complete<S: ParticleSource>(source: &S, cell_factor: f32) {
        let grid = SpatialGrid::build(source, cell_factor);
        let mut emitted = HashSet::new();
        grid.for_each_candidate_pair(|i, j| {
            assert_ne!(i, j, "self pair emitted");
            assert!(
                emitted.insert(unordered(i, j)),
                "pair ({}, {}) emitted twice",
                i,
                j
            );
        });

        for pair in touching(source) {
            assert!(emitted.contains(&pair), "touching pair {:?} missed", pair);
        }
    }

    #[test]
    fn test_neighbor_offsets_cover_half_the_neighbourhood() {
        let offsets: HashSet<IVec3> = NEIGHBOR_OFFSETS.iter().copied().collect();
        assert_eq!(offsets.len(), 13);

        let mut all = HashSet::new();
        for offset in NEIGHBOR_OFFSETS {
            assert_ne!(offset, IVec3::ZERO);
            assert!(!offsets.contains(&-offset));
            all.insert(offset);
            all.insert(-offset);
        }
        assert_eq!(all.len(), 26);
    }

    #[test]
    fn test_cell_of_uses_floor() {
        let store = ParticleStore::new(1, 1.0).unwrap();
        let grid = SpatialGrid::build(&store, 2.0);
        assert_eq!(grid.cell_size(), 2.0);
        assert_eq!(grid.cell_of(Vec3::new(0.5, 1.99, 2.0)), IVec3::new(0, 0, 1));
        assert_eq!(grid.cell_of(Vec3::new(-0.1, -2.0, -2.1)), IVec3::new(-1, -1, -2));
    }

    #[test]
    fn test_empty_source() {
        let store = ParticleStore::new(0, 1.0).unwrap();
        let grid = SpatialGrid::build(&store, 2.01);
        assert_eq!(grid.occupied_cells(), 0);
        assert!(grid.candidate_pairs().is_empty());
        assert!(grid.locality_order().is_empty());
    }

    #[test]
    fn test_same_cell_pairs_emitted_once() {
        let positions = vec![Vec3::splat(0.1), Vec3::splat(0.2), Vec3::splat(0.3)];
        let store = ParticleStore::from_parts(1.0, positions, vec![Vec3::ZERO; 3]).unwrap();
        let grid = SpatialGrid::build(&store, 2.01);

        assert_eq!(grid.occupied_cells(), 1);
        assert_eq!(grid.cell(IVec3::ZERO), &[0, 1, 2]);
        assert_eq!(grid.candidate_pairs(), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_negative_coordinates_neighbour_across_origin() {
        let positions = vec![Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5)];
        let store = ParticleStore::from_parts(1.0, positions, vec![Vec3::ZERO; 2]).unwrap();
        let grid = SpatialGrid::build(&store, 2.01);

        assert_eq!(grid.occupied_cells(), 2);
        let pairs: Vec<_> = grid
            .candidate_pairs()
            .into_iter()
            .map(|(i, j)| unordered(i, j))
            .collect();
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_far_apart_cells_are_not_paired() {
        let positions = vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -10.0)];
        let store = ParticleStore::from_parts(1.0, positions, vec![Vec3::ZERO; 3]).unwrap();
        let grid = SpatialGrid::build(&store, 2.01);
        assert!(grid.candidate_pairs().is_empty());
    }

    #[test]
    fn test_chain_straddling_cell_boundaries() {
        // Spacing just under one diameter, offset so consecutive spheres
        // fall on opposite sides of cell faces, edges and corners.
        let radius = 1.0;
        let step = 1.99;
        let mut centers = Vec::new();
        for k in 0..40 {
            let t = k as f32 * step;
            centers.push(Vec3::new(t - 0.005, 0.0, 0.0));
            centers.push(Vec3::new(0.0, t - 0.005, 0.0));
            centers.push(Vec3::new(0.0, 0.0, t - 0.005));
            let d = t / 3f32.sqrt();
            centers.push(Vec3::new(-d, d, -d));
        }
        let radii = vec![radius; centers.len()];
        let spheres = Spheres { centers, radii };

        assert!(!touching(&spheres).is_empty());
        assert_complete(&spheres, 2.0);
        assert_complete(&spheres, 2.01);
    }

    #[test]
    fn test_random_cloud_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let centers: Vec<Vec3> = (0..600)
            .map(|_| {
                Vec3::new(
                    rng.random_range(-12.0..12.0),
                    rng.random_range(-12.0..12.0),
                    rng.random_range(-12.0..12.0),
                )
            })
            .collect();
        let radii = vec![1.0; centers.len()];
        let spheres = Spheres { centers, radii };

        assert_complete(&spheres, 2.01);
    }

    #[test]
    fn test_mixed_radii_use_largest_radius() {
        let mut rng = StdRng::seed_from_u64(11);
        let centers: Vec<Vec3> = (0..300)
            .map(|_| Vec3::new(rng.random::<f32>(), rng.random::<f32>(), rng.random::<f32>()) * 15.0)
            .collect();
        let radii: Vec<f32> = (0..centers.len())
            .map(|_| rng.random_range(0.25..1.5))
            .collect();
        let spheres = Spheres { centers, radii };

        let grid = SpatialGrid::build(&spheres, 2.01);
        assert!(grid.cell_size() <= 1.5 * 2.01);
        assert_complete(&spheres, 2.01);
    }

    #[test]
    fn test_degenerate_cell_size_falls_back_to_one_cell() {
        let spheres = Spheres {
            centers: vec![Vec3::ZERO, Vec3::splat(100.0), Vec3::splat(-3.0)],
            radii: vec![0.0; 3],
        };
        let grid = SpatialGrid::build(&spheres, 2.01);
        assert_eq!(grid.occupied_cells(), 1);
        assert_eq!(grid.candidate_pairs().len(), 3);
    }

    #[test]
    fn test_locality_order_is_a_permutation_grouped_by_cell() {
        let positions = vec![
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(10.5, 0.5, 0.5),
            Vec3::new(0.7, 0.5, 0.5),
            Vec3::new(10.7, 0.5, 0.5),
        ];
        let store = ParticleStore::from_parts(1.0, positions, vec![Vec3::ZERO; 4]).unwrap();
        let grid = SpatialGrid::build(&store, 2.01);

        assert_eq!(grid.locality_order(), vec![0, 2, 1, 3]);
        assert_eq!(grid.max_occupancy(), 2);
    }

    #[test]
    fn test_brute_force_pairs() {
        let mut pairs = Vec::new();
        for_each_pair(4, |i, j| pairs.push((i, j)));
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);

        let mut none = 0;
        for_each_pair(1, |_, _| none += 1);
        for_each_pair(0, |_, _| none += 1);
        assert_eq!(none, 0);
    }
}
