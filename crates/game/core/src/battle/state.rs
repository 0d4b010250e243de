//! Battlefield data: grid plus unit table.
//!
//! The grid is authoritative for placement. [`BattleState::place`],
//! [`BattleState::relocate`], and [`BattleState::remove_from_board`] are the
//! only paths that write `Unit::position`, keeping the two views in sync.

use std::collections::BTreeMap;

use crate::error::InvariantError;
use crate::grid::{Grid, GridError};
use crate::types::{Faction, Position, UnitId};
use crate::units::Unit;

/// Mutable battlefield: every unit and every tile.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleState {
    pub grid: Grid,
    units: BTreeMap<UnitId, Unit>,
    next_unit_id: u32,
}

impl BattleState {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            units: BTreeMap::new(),
            next_unit_id: 0,
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.units.keys().copied()
    }

    pub fn living_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|u| u.is_alive())
    }

    /// Living factions, deduplicated, in stable order.
    pub fn living_factions(&self) -> Vec<Faction> {
        let mut factions: Vec<Faction> = self.living_units().map(|u| u.faction).collect();
        factions.sort();
        factions.dedup();
        factions
    }

    /// Living units whose position falls within `radius` of `center`.
    pub fn units_within(&self, center: Position, radius: u32) -> impl Iterator<Item = &Unit> {
        self.living_units().filter(move |unit| {
            unit.position
                .is_some_and(|p| p.manhattan(center) <= radius)
        })
    }

    // ========================================================================
    // Placement (the only writers of Unit::position)
    // ========================================================================

    /// Registers a new unit and places it on the board.
    pub fn spawn(&mut self, mut unit: Unit, position: Position) -> Result<UnitId, GridError> {
        let id = unit.id;
        self.grid.occupy(position, id)?;
        unit.position = Some(position);
        self.units.insert(id, unit);
        Ok(id)
    }

    /// Allocates the next free unit identifier.
    pub fn allocate_id(&mut self) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        id
    }

    /// Re-inserts a saved unit, re-occupying its cell when it is on-board.
    /// Keeps the id allocator ahead of every restored id.
    pub fn restore_unit(&mut self, unit: Unit) -> Result<(), GridError> {
        if let Some(position) = unit.position {
            self.grid.occupy(position, unit.id)?;
        }
        self.next_unit_id = self.next_unit_id.max(unit.id.0 + 1);
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// Moves a living unit to a new cell, grid first.
    pub fn relocate(&mut self, id: UnitId, to: Position) -> Result<Position, GridError> {
        let from = self
            .units
            .get(&id)
            .and_then(|u| u.position)
            .ok_or(GridError::Vacant(to))?;
        self.grid.move_unit(id, from, to)?;
        if let Some(unit) = self.units.get_mut(&id) {
            unit.position = Some(to);
        }
        Ok(from)
    }

    /// Takes a dead (or retreating) unit off the board, freeing its cell.
    /// The unit record itself stays in the table.
    pub fn remove_from_board(&mut self, id: UnitId) {
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };
        if let Some(position) = unit.position.take()
            && self.grid.free(position).is_err()
        {
            tracing::error!(%id, %position, "board desync while removing unit");
        }
    }

    // ========================================================================
    // Invariants
    // ========================================================================

    /// Verifies grid occupancy and unit positions agree. Cheap enough to run
    /// after every facade call in debug builds and tests.
    pub fn check_occupancy(&self) -> Result<(), InvariantError> {
        for (cell, id) in self.grid.occupants() {
            let reported = self.units.get(&id).and_then(|u| u.position);
            if reported != Some(cell) {
                return Err(InvariantError::OccupancyDesync {
                    unit: id,
                    cell,
                    reported,
                });
            }
        }
        for unit in self.units.values() {
            if let Some(position) = unit.position
                && self.grid.occupant(position) != Some(unit.id)
            {
                return Err(InvariantError::OccupancyDesync {
                    unit: unit.id,
                    cell: position,
                    reported: Some(position),
                });
            }
        }
        Ok(())
    }
}
