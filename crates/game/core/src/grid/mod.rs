//! Tactical grid: terrain, occupancy, movement costs.
//!
//! The grid is the single source of truth for unit placement. Units record a
//! position for convenience, but every write goes through [`Grid::occupy`],
//! [`Grid::free`], or [`Grid::move_unit`]; higher layers keep the two views in
//! sync by routing placement through the battle context.
//!
//! Movement costs are fixed-point milli-units (`1000` = one movement point)
//! so the pathfinder orders candidates with total integer comparisons.

mod los;
mod path;

pub use los::has_line_of_sight;
pub use path::{PathError, PathResult, Pathfinder, Neighborhood, ReachableCache};

use crate::error::{CoreError, ErrorSeverity};
use crate::types::{Position, UnitId};

/// Fixed-point movement cost, 1000 per movement point.
pub type CostMilli = u32;

/// Multiplier applied to diagonal steps in 8-neighborhood mode (×1.414).
pub const DIAGONAL_MILLI: u64 = 1414;

/// Canonical terrain classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TerrainKind {
    Normal,
    Difficult,
    Wall,
    Water,
    Hazard,
}

impl TerrainKind {
    /// Base cost of entering a tile of this terrain, or `None` for impassable.
    pub fn move_cost(self) -> Option<CostMilli> {
        match self {
            TerrainKind::Normal => Some(1000),
            TerrainKind::Difficult => Some(2000),
            TerrainKind::Water => Some(3000),
            TerrainKind::Hazard => Some(1000),
            TerrainKind::Wall => None,
        }
    }

    pub fn is_passable(self) -> bool {
        self.move_cost().is_some()
    }
}

/// One tile: static terrain plus at most one occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub terrain: TerrainKind,
    pub occupant: Option<UnitId>,
}

impl Cell {
    pub const fn new(terrain: TerrainKind) -> Self {
        Self {
            terrain,
            occupant: None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

/// Errors raised by grid mutations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GridError {
    #[error("position {0} outside the grid")]
    OutOfBounds(Position),

    #[error("cell {0} is occupied by {1}")]
    Occupied(Position, UnitId),

    #[error("cell {0} is impassable")]
    Impassable(Position),

    #[error("cell {0} is empty")]
    Vacant(Position),

    #[error("cell {position} is occupied by {actual}, not {expected}")]
    WrongOccupant {
        position: Position,
        expected: UnitId,
        actual: UnitId,
    },
}

impl CoreError for GridError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfBounds(_) => ErrorSeverity::Validation,
            Self::Occupied(..) | Self::Impassable(_) | Self::Vacant(_) => {
                ErrorSeverity::Recoverable
            }
            Self::WrongOccupant { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfBounds(_) => "GRID_OUT_OF_BOUNDS",
            Self::Occupied(..) => "GRID_OCCUPIED",
            Self::Impassable(_) => "GRID_IMPASSABLE",
            Self::Vacant(_) => "GRID_VACANT",
            Self::WrongOccupant { .. } => "GRID_WRONG_OCCUPANT",
        }
    }
}

/// Rectangular battlefield of `width × height` cells.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    /// Bumped on every mutation; pathfinding caches compare against it.
    generation: u64,
}

impl Grid {
    /// Creates a grid of uniform terrain.
    pub fn new(width: u32, height: u32, terrain: TerrainKind) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::new(terrain); (width * height) as usize],
            generation: 0,
        }
    }

    /// Creates an all-`Normal` grid.
    pub fn open(width: u32, height: u32) -> Self {
        Self::new(width, height, TerrainKind::Normal)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && position.x < self.width as i32
            && position.y < self.height as i32
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| (position.y as u32 * self.width + position.x as u32) as usize)
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.index(position).map(|i| &self.cells[i])
    }

    pub fn occupant(&self, position: Position) -> Option<UnitId> {
        self.cell(position).and_then(|c| c.occupant)
    }

    /// Cost of entering `position`, ignoring occupancy.
    pub fn entry_cost(&self, position: Position) -> Option<CostMilli> {
        self.cell(position).and_then(|c| c.terrain.move_cost())
    }

    /// Places `unit` on `position`. Fails on occupied or impassable cells.
    pub fn occupy(&mut self, position: Position, unit: UnitId) -> Result<(), GridError> {
        let index = self
            .index(position)
            .ok_or(GridError::OutOfBounds(position))?;
        let cell = &mut self.cells[index];
        if !cell.terrain.is_passable() {
            return Err(GridError::Impassable(position));
        }
        if let Some(existing) = cell.occupant {
            return Err(GridError::Occupied(position, existing));
        }
        cell.occupant = Some(unit);
        self.generation += 1;
        tracing::debug!(%unit, %position, "cell occupied");
        Ok(())
    }

    /// Clears `position`, returning the evicted occupant.
    pub fn free(&mut self, position: Position) -> Result<UnitId, GridError> {
        let index = self
            .index(position)
            .ok_or(GridError::OutOfBounds(position))?;
        let cell = &mut self.cells[index];
        let unit = cell.occupant.take().ok_or(GridError::Vacant(position))?;
        self.generation += 1;
        tracing::debug!(%unit, %position, "cell freed");
        Ok(unit)
    }

    /// Moves `unit` from `from` to `to` atomically.
    ///
    /// The source must hold exactly `unit` and the destination must be free
    /// and passable; on any failure nothing changes.
    pub fn move_unit(
        &mut self,
        unit: UnitId,
        from: Position,
        to: Position,
    ) -> Result<(), GridError> {
        match self.occupant(from) {
            Some(actual) if actual == unit => {}
            Some(actual) => {
                return Err(GridError::WrongOccupant {
                    position: from,
                    expected: unit,
                    actual,
                });
            }
            None => return Err(GridError::Vacant(from)),
        }
        // Validate destination before touching the source.
        let dest = self.cell(to).ok_or(GridError::OutOfBounds(to))?;
        if !dest.terrain.is_passable() {
            return Err(GridError::Impassable(to));
        }
        if let Some(existing) = dest.occupant {
            return Err(GridError::Occupied(to, existing));
        }

        self.free(from)?;
        self.occupy(to, unit)?;
        Ok(())
    }

    /// Rewrites the terrain of one cell. An occupant stays in place even if
    /// the new terrain is impassable; movement rules apply from then on.
    pub fn set_terrain(&mut self, position: Position, terrain: TerrainKind) -> Result<(), GridError> {
        let index = self
            .index(position)
            .ok_or(GridError::OutOfBounds(position))?;
        self.cells[index].terrain = terrain;
        self.generation += 1;
        tracing::debug!(%position, %terrain, "terrain changed");
        Ok(())
    }

    /// A copy of this grid with every cell vacated. Used as the static
    /// terrain layout when rebuilding occupancy from a save.
    pub fn terrain_only(&self) -> Grid {
        Grid {
            width: self.width,
            height: self.height,
            cells: self
                .cells
                .iter()
                .map(|cell| Cell::new(cell.terrain))
                .collect(),
            generation: 0,
        }
    }

    /// Iterates all occupied cells in row-major order.
    pub fn occupants(&self) -> impl Iterator<Item = (Position, UnitId)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            let unit = cell.occupant?;
            let x = (i as u32 % self.width) as i32;
            let y = (i as u32 / self.width) as i32;
            Some((Position::new(x, y), unit))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupy_rejects_double_booking() {
        let mut grid = Grid::open(4, 4);
        let pos = Position::new(1, 1);
        grid.occupy(pos, UnitId(1)).unwrap();
        assert_eq!(
            grid.occupy(pos, UnitId(2)),
            Err(GridError::Occupied(pos, UnitId(1)))
        );
    }

    #[test]
    fn occupy_rejects_walls() {
        let mut grid = Grid::open(4, 4);
        grid.set_terrain(Position::new(2, 2), TerrainKind::Wall).unwrap();
        assert_eq!(
            grid.occupy(Position::new(2, 2), UnitId(1)),
            Err(GridError::Impassable(Position::new(2, 2)))
        );
    }

    #[test]
    fn move_unit_is_atomic_on_failure() {
        let mut grid = Grid::open(4, 4);
        grid.occupy(Position::new(0, 0), UnitId(1)).unwrap();
        grid.occupy(Position::new(1, 0), UnitId(2)).unwrap();

        let err = grid.move_unit(UnitId(1), Position::new(0, 0), Position::new(1, 0));
        assert!(err.is_err());
        assert_eq!(grid.occupant(Position::new(0, 0)), Some(UnitId(1)));
        assert_eq!(grid.occupant(Position::new(1, 0)), Some(UnitId(2)));
    }

    #[test]
    fn mutations_bump_generation() {
        let mut grid = Grid::open(4, 4);
        let g0 = grid.generation();
        grid.occupy(Position::new(0, 0), UnitId(1)).unwrap();
        grid.set_terrain(Position::new(3, 3), TerrainKind::Water).unwrap();
        grid.free(Position::new(0, 0)).unwrap();
        assert_eq!(grid.generation(), g0 + 3);
    }
}
