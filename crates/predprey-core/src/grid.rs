//! Toroidal occupancy matrix and wall layout.

use crate::Position;
use crate::error::{PlacementTarget, WorldError};
use crate::registry::AgentHandle;
use predprey_index::Torus;
use rand::{Rng, RngCore};

/// Content of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Wall,
    Agent(AgentHandle),
}

/// Row-major cell matrix. Walls are fixed between resets.
#[derive(Debug, Clone)]
pub struct GridWorld {
    torus: Torus,
    cells: Vec<Cell>,
    walls: Vec<Position>,
}

impl GridWorld {
    /// Construct an empty grid of `width * height` cells.
    pub fn new(width: usize, height: usize) -> Result<Self, WorldError> {
        let torus = Torus::new(width, height)?;
        Ok(Self {
            torus,
            cells: vec![Cell::Empty; torus.area()],
            walls: Vec::new(),
        })
    }

    #[must_use]
    pub const fn torus(&self) -> &Torus {
        &self.torus
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.torus.width()
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.torus.height()
    }

    /// Clear every cell and scatter `wall_count` walls by rejection sampling.
    pub fn reset(
        &mut self,
        wall_count: usize,
        rng: &mut dyn RngCore,
        attempts: u32,
    ) -> Result<(), WorldError> {
        self.cells.fill(Cell::Empty);
        self.walls.clear();
        self.walls.reserve(wall_count);
        for _ in 0..wall_count {
            let position = self.random_empty_cell(rng, attempts, PlacementTarget::Wall)?;
            self.cells[self.torus.flat(position)] = Cell::Wall;
            self.walls.push(position);
        }
        Ok(())
    }

    /// Wrapped read; any signed coordinate is valid.
    #[must_use]
    pub fn cell_at(&self, x: i64, y: i64) -> Cell {
        self.cell(self.torus.wrap(x, y))
    }

    /// Read an in-range coordinate.
    #[inline]
    #[must_use]
    pub fn cell(&self, position: Position) -> Cell {
        self.cells[self.torus.flat(position)]
    }

    #[must_use]
    pub fn is_empty_at(&self, position: Position) -> bool {
        self.cell(position) == Cell::Empty
    }

    /// Write `handle` into a cell. The caller keeps the registry in sync.
    pub fn place(&mut self, handle: AgentHandle, position: Position) {
        let index = self.torus.flat(position);
        debug_assert_eq!(
            self.cells[index],
            Cell::Empty,
            "placing agent on occupied cell {position:?}"
        );
        self.cells[index] = Cell::Agent(handle);
    }

    /// Empty an agent cell. Walls are never cleared.
    pub fn clear(&mut self, position: Position) {
        let index = self.torus.flat(position);
        debug_assert_ne!(self.cells[index], Cell::Wall, "clearing wall at {position:?}");
        self.cells[index] = Cell::Empty;
    }

    /// Fresh matrix holding only the walls.
    pub fn rebuild_walls_only(&mut self) {
        self.cells.fill(Cell::Empty);
        for &wall in &self.walls {
            self.cells[self.torus.flat(wall)] = Cell::Wall;
        }
    }

    /// Wall positions in placement order.
    #[must_use]
    pub fn walls(&self) -> &[Position] {
        &self.walls
    }

    /// Uniformly sample cells until an empty one turns up, giving up after
    /// `attempts` draws.
    pub fn random_empty_cell(
        &self,
        rng: &mut dyn RngCore,
        attempts: u32,
        target: PlacementTarget,
    ) -> Result<Position, WorldError> {
        for _ in 0..attempts {
            let position = (
                rng.random_range(0..self.width()),
                rng.random_range(0..self.height()),
            );
            if self.is_empty_at(position) {
                return Ok(position);
            }
        }
        tracing::warn!(placement = %target, attempts, "random placement exhausted");
        Err(WorldError::PlacementExhausted { target, attempts })
    }

    /// Occupied agent cells with their coordinates, row-major.
    pub fn agent_cells(&self) -> impl Iterator<Item = (Position, AgentHandle)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| match cell {
                Cell::Agent(handle) => Some((self.torus.unflat(index), *handle)),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use slotmap::SlotMap;

    fn handle() -> AgentHandle {
        let mut slots: SlotMap<AgentHandle, ()> = SlotMap::with_key();
        slots.insert(())
    }

    #[test]
    fn reset_places_requested_walls() {
        let mut grid = GridWorld::new(6, 4).expect("grid");
        let mut rng = SmallRng::seed_from_u64(3);
        grid.reset(10, &mut rng, 1_000).expect("walls");
        assert_eq!(grid.walls().len(), 10);
        let mut walls = grid.walls().to_vec();
        walls.sort();
        walls.dedup();
        assert_eq!(walls.len(), 10, "walls must occupy distinct cells");
        assert!(walls.iter().all(|&w| grid.cell(w) == Cell::Wall));
    }

    #[test]
    fn reset_fails_when_grid_is_full() {
        let mut grid = GridWorld::new(2, 2).expect("grid");
        let mut rng = SmallRng::seed_from_u64(1);
        let err = grid.reset(5, &mut rng, 64).expect_err("fifth wall cannot fit");
        assert_eq!(
            err,
            WorldError::PlacementExhausted {
                target: PlacementTarget::Wall,
                attempts: 64
            }
        );
    }

    #[test]
    fn cell_at_wraps_signed_coordinates() {
        let mut grid = GridWorld::new(3, 5).expect("grid");
        let h = handle();
        grid.place(h, (2, 4));
        assert_eq!(grid.cell_at(-1, -1), Cell::Agent(h));
        assert_eq!(grid.cell_at(5, 9), Cell::Agent(h));
        assert_eq!(grid.cell_at(0, 0), Cell::Empty);
        grid.clear((2, 4));
        assert_eq!(grid.cell_at(2, 4), Cell::Empty);
    }

    #[test]
    fn rebuild_keeps_only_walls() {
        let mut grid = GridWorld::new(4, 4).expect("grid");
        let mut rng = SmallRng::seed_from_u64(9);
        grid.reset(3, &mut rng, 100).expect("walls");
        let free = grid
            .random_empty_cell(&mut rng, 100, PlacementTarget::Wall)
            .expect("free cell");
        grid.place(handle(), free);
        assert_eq!(grid.agent_cells().count(), 1);
        grid.rebuild_walls_only();
        assert_eq!(grid.agent_cells().count(), 0);
        assert!(grid.walls().iter().all(|&w| grid.cell(w) == Cell::Wall));
    }
}
