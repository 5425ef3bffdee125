/// Grid engine - square toroidal cell grid and its step
/// Cells are indexed `[x][y]` and hold a vitality, either `{0, 1}` or continuous
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GridError;

pub mod rule;

pub use rule::{Rule, RuleKind};

/// Canonical glider offsets, relative to the origin.
pub const GLIDER: [(usize, usize); 5] = [(0, 1), (1, 0), (2, 0), (2, 1), (2, 2)];

/// Starting state for a fresh grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Pattern {
    /// Bernoulli fill with the configured probability.
    #[default]
    Random,
    /// Continuous vitalities.
    Uniform,
    Glider,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: Vec<Vec<f64>>,
    size: usize,
}

impl Grid {
    /// Empty (all-dead) grid.
    pub fn new(size: usize) -> Result<Self, GridError> {
        if size == 0 {
            return Err(GridError::ZeroSize);
        }

        Ok(Self {
            cells: vec![vec![0.0; size]; size],
            size,
        })
    }

    /// Each cell is independently alive with probability `p`.
    pub fn random<R: Rng + ?Sized>(size: usize, p: f64, rng: &mut R) -> Result<Self, GridError> {
        let mut grid = Self::new(size)?;
        grid.randomize(p, rng);
        Ok(grid)
    }

    /// Each cell gets an independent uniform vitality in `[0, 1)`.
    pub fn uniform_random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Self, GridError> {
        let mut grid = Self::new(size)?;
        grid.randomize_uniform(rng);
        Ok(grid)
    }

    /// Empty grid with a glider at the origin. Needs `size >= 3`.
    pub fn glider(size: usize) -> Result<Self, GridError> {
        let mut grid = Self::new(size)?;
        grid.load_glider()?;
        Ok(grid)
    }

    pub fn from_pattern<R: Rng + ?Sized>(
        pattern: Pattern,
        size: usize,
        fill: f64,
        rng: &mut R,
    ) -> Result<Self, GridError> {
        match pattern {
            Pattern::Random => Self::random(size, fill, rng),
            Pattern::Uniform => Self::uniform_random(size, rng),
            Pattern::Glider => Self::glider(size),
            Pattern::Empty => Self::new(size),
        }
    }

    pub fn from_cells(cells: Vec<Vec<f64>>) -> Result<Self, GridError> {
        let size = cells.len();
        if size == 0 {
            return Err(GridError::ZeroSize);
        }
        check_square(&cells, size)?;

        Ok(Self { cells, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Read-only view of the current state.
    pub fn cells(&self) -> &[Vec<f64>] {
        &self.cells
    }

    /// Vitality at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        self.cells.get(x).and_then(|row| row.get(y)).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) -> Result<(), GridError> {
        let size = self.size;
        let cell = self
            .cells
            .get_mut(x)
            .and_then(|row| row.get_mut(y))
            .ok_or(GridError::OutOfBounds { x, y, size })?;
        *cell = value;
        Ok(())
    }

    pub fn revive(&mut self, x: usize, y: usize) -> Result<(), GridError> {
        self.set(x, y, 1.0)
    }

    pub fn kill(&mut self, x: usize, y: usize) -> Result<(), GridError> {
        self.set(x, y, 0.0)
    }

    /// Strict flip: a mostly-alive cell dies, anything else comes alive.
    pub fn toggle(&mut self, x: usize, y: usize) -> Result<(), GridError> {
        let size = self.size;
        let current = self.get(x, y).ok_or(GridError::OutOfBounds { x, y, size })?;
        let next = if current >= 0.5 { 0.0 } else { 1.0 };
        self.set(x, y, next)
    }

    pub fn clear(&mut self) {
        self.cells = vec![vec![0.0; self.size]; self.size];
    }

    pub fn fill(&mut self) {
        self.cells = vec![vec![1.0; self.size]; self.size];
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, p: f64, rng: &mut R) {
        self.cells = (0..self.size)
            .map(|_| {
                (0..self.size)
                    .map(|_| if rng.gen::<f64>() < p { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect();
    }

    pub fn randomize_uniform<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cells = (0..self.size)
            .map(|_| (0..self.size).map(|_| rng.gen::<f64>()).collect())
            .collect();
    }

    /// Clear the grid and place a glider at the origin.
    pub fn load_glider(&mut self) -> Result<(), GridError> {
        if self.size < 3 {
            return Err(GridError::OutOfBounds {
                x: 2,
                y: 2,
                size: self.size,
            });
        }

        let mut cells = vec![vec![0.0; self.size]; self.size];
        for (x, y) in GLIDER {
            cells[x][y] = 1.0;
        }
        self.cells = cells;
        Ok(())
    }

    /// Replace the whole state with a same-sized pattern.
    pub fn load_cells(&mut self, cells: Vec<Vec<f64>>) -> Result<(), GridError> {
        check_square(&cells, self.size)?;
        self.cells = cells;
        Ok(())
    }

    /// Sum of the 8 Moore neighbors, wrapping around both edges.
    pub fn neighbor_sum(&self, x: usize, y: usize) -> f64 {
        let n = self.size as isize;
        let mut sum = 0.0;
        for dx in -1..=1_isize {
            for dy in -1..=1_isize {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = (x as isize + dx).rem_euclid(n) as usize;
                let ny = (y as isize + dy).rem_euclid(n) as usize;
                sum += self.cells[nx][ny];
            }
        }
        sum
    }

    /// Apply `rule` to every cell against the pre-step state, then swap the
    /// new state in whole.
    pub fn step<R: Rng + ?Sized>(&mut self, rule: &Rule, rng: &mut R) {
        let mut next = Vec::with_capacity(self.size);
        for x in 0..self.size {
            let mut row = Vec::with_capacity(self.size);
            for y in 0..self.size {
                row.push(rule.apply(self.neighbor_sum(x, y), self.cells[x][y], rng));
            }
            next.push(row);
        }
        self.cells = next;
    }

    /// Number of cells with any vitality.
    pub fn live_count(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|v| **v > 0.0)
            .count()
    }

    pub fn total_vitality(&self) -> f64 {
        self.cells.iter().flat_map(|row| row.iter()).sum()
    }
}

fn check_square(cells: &[Vec<f64>], expected: usize) -> Result<(), GridError> {
    if cells.len() != expected {
        return Err(GridError::SizeMismatch {
            got: cells.len(),
            expected,
        });
    }
    match cells.iter().position(|row| row.len() != expected) {
        Some(row) => Err(GridError::NotSquare {
            row,
            len: cells[row].len(),
            expected,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(420)
    }

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(8).unwrap();
        assert_eq!(grid.size(), 8);
        assert_eq!(grid.cells().len(), 8);
        assert!(grid.cells().iter().all(|row| row.len() == 8));
    }

    #[test]
    fn test_zero_size_rejected() {
        assert_eq!(Grid::new(0), Err(GridError::ZeroSize));
        assert_eq!(Grid::random(0, 0.5, &mut rng()), Err(GridError::ZeroSize));
        assert_eq!(Grid::from_cells(vec![]), Err(GridError::ZeroSize));
    }

    #[test]
    fn test_zero_probability_is_empty() {
        let mut rng = rng();
        for size in 1..10 {
            let grid = Grid::random(size, 0.0, &mut rng).unwrap();
            assert!(grid.cells().iter().flatten().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn test_full_probability_is_full() {
        let grid = Grid::random(5, 1.0, &mut rng()).unwrap();
        assert_eq!(grid.live_count(), 25);
    }

    #[test]
    fn test_random_is_binary() {
        let grid = Grid::random(12, 0.3, &mut rng()).unwrap();
        assert!(grid.cells().iter().flatten().all(|v| *v == 0.0 || *v == 1.0));
    }

    #[test]
    fn test_uniform_in_unit_interval() {
        let grid = Grid::uniform_random(12, &mut rng()).unwrap();
        assert!(grid
            .cells()
            .iter()
            .flatten()
            .all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_from_pattern() {
        let mut rng = rng();
        let glider = Grid::from_pattern(Pattern::Glider, 6, 0.9, &mut rng).unwrap();
        assert_eq!(glider, Grid::glider(6).unwrap());
        let empty = Grid::from_pattern(Pattern::Empty, 6, 0.9, &mut rng).unwrap();
        assert_eq!(empty.live_count(), 0);
        assert!(Grid::from_pattern(Pattern::Uniform, 0, 0.0, &mut rng).is_err());
    }

    #[test]
    fn test_from_cells_rejects_ragged() {
        let err = Grid::from_cells(vec![vec![0.0, 1.0], vec![0.0]]).unwrap_err();
        assert_eq!(
            err,
            GridError::NotSquare {
                row: 1,
                len: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn test_glider_needs_room() {
        assert!(Grid::glider(2).is_err());
        let grid = Grid::glider(3).unwrap();
        assert_eq!(grid.live_count(), 5);
        assert_eq!(grid.get(0, 1), Some(1.0));
        assert_eq!(grid.get(0, 0), Some(0.0));
    }

    #[test]
    fn test_cell_edits() {
        let mut grid = Grid::new(4).unwrap();
        grid.revive(1, 2).unwrap();
        assert_eq!(grid.get(1, 2), Some(1.0));
        grid.toggle(1, 2).unwrap();
        assert_eq!(grid.get(1, 2), Some(0.0));
        grid.set(3, 3, 0.25).unwrap();
        grid.toggle(3, 3).unwrap();
        assert_eq!(grid.get(3, 3), Some(1.0));
        grid.kill(3, 3).unwrap();
        assert_eq!(grid.get(3, 3), Some(0.0));
        assert_eq!(
            grid.set(4, 0, 1.0),
            Err(GridError::OutOfBounds { x: 4, y: 0, size: 4 })
        );
        assert_eq!(grid.get(9, 9), None);
        assert_eq!(
            grid.toggle(0, 4),
            Err(GridError::OutOfBounds { x: 0, y: 4, size: 4 })
        );
    }

    #[test]
    fn test_clear_and_fill() {
        let mut grid = Grid::new(3).unwrap();
        grid.fill();
        assert_eq!(grid.live_count(), 9);
        assert_eq!(grid.total_vitality(), 9.0);
        grid.clear();
        assert_eq!(grid.live_count(), 0);
    }

    #[test]
    fn test_load_cells_keeps_size() {
        let mut grid = Grid::new(2).unwrap();
        assert_eq!(
            grid.load_cells(vec![vec![1.0; 3]; 3]),
            Err(GridError::SizeMismatch {
                got: 3,
                expected: 2
            })
        );
        grid.load_cells(vec![vec![0.5, 0.0], vec![0.0, 0.5]]).unwrap();
        assert_eq!(grid.total_vitality(), 1.0);
    }

    #[test]
    fn test_neighbor_sum_wraps_diagonally() {
        let mut grid = Grid::new(3).unwrap();
        grid.set(2, 2, 1.0).unwrap();
        assert_eq!(grid.neighbor_sum(0, 0), 1.0);
    }

    #[test]
    fn test_neighbor_sum_excludes_self() {
        let mut grid = Grid::new(5).unwrap();
        grid.fill();
        assert_eq!(grid.neighbor_sum(2, 2), 8.0);
        assert_eq!(grid.neighbor_sum(0, 4), 8.0);
        grid.kill(2, 2).unwrap();
        assert_eq!(grid.neighbor_sum(2, 2), 8.0);
        assert_eq!(grid.neighbor_sum(1, 1), 7.0);
    }

    #[test]
    fn test_neighbor_sum_on_single_cell() {
        // every neighbor wraps onto the cell itself
        let grid = Grid::from_cells(vec![vec![1.0]]).unwrap();
        assert_eq!(grid.neighbor_sum(0, 0), 8.0);
    }

    #[test]
    fn test_step_reads_old_state() {
        // blinker: a sweep that wrote in place would not oscillate
        let mut grid = Grid::new(5).unwrap();
        for y in 1..4 {
            grid.revive(2, y).unwrap();
        }
        let start = grid.clone();
        let mut rng = rng();
        grid.step(&Rule::conway(), &mut rng);
        assert_eq!(grid.live_count(), 3);
        assert_eq!(grid.get(1, 2), Some(1.0));
        assert_eq!(grid.get(3, 2), Some(1.0));
        grid.step(&Rule::conway(), &mut rng);
        assert_eq!(grid, start);
    }

    #[test]
    fn test_soft_step_stays_square() {
        let mut rng = rng();
        let mut grid = Grid::uniform_random(7, &mut rng).unwrap();
        for _ in 0..5 {
            grid.step(&Rule::soft_conway(2.0, 0.1), &mut rng);
        }
        assert_eq!(grid.cells().len(), 7);
        assert!(grid.cells().iter().all(|row| row.len() == 7));
        assert!(grid.cells().iter().flatten().all(|v| v.is_finite()));
    }
}
