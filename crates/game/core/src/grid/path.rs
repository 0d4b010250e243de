//! A* pathfinding and bounded-Dijkstra reachability.
//!
//! Costs are fixed-point milli-units so candidate ordering is total and the
//! search is bit-for-bit deterministic. Ties resolve by lower f, then lower
//! h, then lower x+y; remaining collisions fall back on insertion order via
//! the binary heap's sequence counter.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use std::sync::Arc;

use crate::error::{CoreError, ErrorSeverity};
use crate::types::{Position, UnitId};

use super::{CostMilli, DIAGONAL_MILLI, Grid};

/// Which neighbours a step may reach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Neighborhood {
    #[default]
    Four,
    /// Diagonal steps cost 1.414 × the destination terrain cost.
    Eight,
}

/// Errors raised at the pathfinding API boundary.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathError {
    #[error("movement budget {0} is negative or not finite")]
    BadBudget(f32),

    #[error("position {0} outside the grid")]
    OutOfBounds(Position),
}

impl CoreError for PathError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadBudget(_) => "PATH_BAD_BUDGET",
            Self::OutOfBounds(_) => "PATH_OUT_OF_BOUNDS",
        }
    }
}

/// Outcome of a path query.
///
/// `success == false` means the goal was unreachable within the budget; the
/// path is then empty and callers fall back on [`Pathfinder::closest_reachable`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathResult {
    pub success: bool,
    /// Contiguous neighbour sequence from start to goal, inclusive of both.
    pub path: Vec<Position>,
    pub cost: CostMilli,
}

impl PathResult {
    fn unreachable() -> Self {
        Self {
            success: false,
            path: Vec::new(),
            cost: 0,
        }
    }

    /// Cost in movement points.
    pub fn cost_points(&self) -> f32 {
        self.cost as f32 / 1000.0
    }
}

/// Read-only path queries over a grid.
///
/// `exclude` treats one occupant as empty, used when recomputing a moving
/// unit's own path.
#[derive(Clone, Copy, Debug)]
pub struct Pathfinder<'a> {
    grid: &'a Grid,
    neighborhood: Neighborhood,
    exclude: Option<UnitId>,
}

impl<'a> Pathfinder<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self {
            grid,
            neighborhood: Neighborhood::Four,
            exclude: None,
        }
    }

    pub fn with_neighborhood(mut self, neighborhood: Neighborhood) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    pub fn excluding(mut self, unit: UnitId) -> Self {
        self.exclude = Some(unit);
        self
    }

    /// A* from `start` to `goal` under an optional movement-point budget.
    pub fn find_path(
        &self,
        start: Position,
        goal: Position,
        budget: Option<f32>,
    ) -> Result<PathResult, PathError> {
        let budget_milli = convert_budget(budget)?;
        if !self.grid.contains(start) {
            return Err(PathError::OutOfBounds(start));
        }
        if !self.grid.contains(goal) {
            return Err(PathError::OutOfBounds(goal));
        }
        if start == goal {
            return Ok(PathResult {
                success: true,
                path: vec![start],
                cost: 0,
            });
        }
        if self.is_blocked(goal, start) {
            return Ok(PathResult::unreachable());
        }

        let mut open = BinaryHeap::new();
        let mut best_g: BTreeMap<Position, CostMilli> = BTreeMap::new();
        let mut came_from: BTreeMap<Position, Position> = BTreeMap::new();
        let mut sequence = 0u64;

        best_g.insert(start, 0);
        open.push(Node {
            f: heuristic(start, goal),
            h: heuristic(start, goal),
            position: start,
            g: 0,
            sequence,
        });

        while let Some(node) = open.pop() {
            if node.position == goal {
                return Ok(PathResult {
                    success: true,
                    path: reconstruct(&came_from, goal),
                    cost: node.g,
                });
            }
            // Stale heap entry for an already-improved cell.
            if best_g.get(&node.position).is_some_and(|&g| g < node.g) {
                continue;
            }

            for (next, step_cost) in self.steps(node.position, start) {
                let g = node.g + step_cost;
                if let Some(limit) = budget_milli
                    && g > limit
                {
                    continue;
                }
                if best_g.get(&next).is_some_and(|&known| known <= g) {
                    continue;
                }
                best_g.insert(next, g);
                came_from.insert(next, node.position);
                sequence += 1;
                let h = heuristic(next, goal);
                open.push(Node {
                    f: g + h,
                    h,
                    position: next,
                    g,
                    sequence,
                });
            }
        }

        Ok(PathResult::unreachable())
    }

    /// Every cell whose cheapest path cost from `start` is within the budget.
    ///
    /// Bounded Dijkstra; the start cell itself is included.
    pub fn reachable_positions(
        &self,
        start: Position,
        budget: f32,
    ) -> Result<BTreeSet<Position>, PathError> {
        let limit = convert_points(budget)?;
        if !self.grid.contains(start) {
            return Err(PathError::OutOfBounds(start));
        }

        let mut open = BinaryHeap::new();
        let mut best_g: BTreeMap<Position, CostMilli> = BTreeMap::new();
        let mut sequence = 0u64;

        best_g.insert(start, 0);
        open.push(Node {
            f: 0,
            h: 0,
            position: start,
            g: 0,
            sequence,
        });

        while let Some(node) = open.pop() {
            if best_g.get(&node.position).is_some_and(|&g| g < node.g) {
                continue;
            }
            for (next, step_cost) in self.steps(node.position, start) {
                let g = node.g + step_cost;
                if g > limit {
                    continue;
                }
                if best_g.get(&next).is_some_and(|&known| known <= g) {
                    continue;
                }
                best_g.insert(next, g);
                sequence += 1;
                open.push(Node {
                    f: g,
                    h: 0,
                    position: next,
                    g,
                    sequence,
                });
            }
        }

        Ok(best_g.into_keys().collect())
    }

    /// The reachable cell nearest the goal by Manhattan distance.
    ///
    /// Used when a requested destination is out of reach and the caller wants
    /// a best-effort approach path instead of a hard failure.
    pub fn closest_reachable(
        &self,
        start: Position,
        goal: Position,
        budget: f32,
    ) -> Result<Option<Position>, PathError> {
        let reachable = self.reachable_positions(start, budget)?;
        Ok(reachable
            .into_iter()
            .filter(|&p| p != start && !self.is_blocked(p, start))
            .min_by_key(|&p| (p.manhattan(goal), p.x + p.y)))
    }

    /// Passable, in-bounds neighbour steps with their entry costs.
    fn steps(
        &self,
        from: Position,
        start: Position,
    ) -> impl Iterator<Item = (Position, CostMilli)> + '_ {
        let cardinal = from
            .cardinal_neighbors()
            .into_iter()
            .map(|p| (p, 1000u64));
        let diagonal = match self.neighborhood {
            Neighborhood::Four => Vec::new(),
            Neighborhood::Eight => from.diagonal_neighbors().to_vec(),
        };
        let diagonal = diagonal.into_iter().map(|p| (p, DIAGONAL_MILLI));

        cardinal
            .chain(diagonal)
            .filter(move |&(p, _)| !self.is_blocked(p, start))
            .filter_map(move |(p, factor)| {
                let base = self.grid.entry_cost(p)? as u64;
                Some((p, (base * factor / 1000) as CostMilli))
            })
    }

    /// Walls and foreign occupants block; the start cell never does.
    fn is_blocked(&self, position: Position, start: Position) -> bool {
        let Some(cell) = self.grid.cell(position) else {
            return true;
        };
        if !cell.terrain.is_passable() {
            return true;
        }
        if position == start {
            return false;
        }
        match cell.occupant {
            Some(unit) => self.exclude != Some(unit),
            None => false,
        }
    }
}

fn convert_budget(budget: Option<f32>) -> Result<Option<CostMilli>, PathError> {
    budget.map(convert_points).transpose()
}

fn convert_points(points: f32) -> Result<CostMilli, PathError> {
    if !points.is_finite() || points < 0.0 {
        return Err(PathError::BadBudget(points));
    }
    Ok((points * 1000.0).round() as CostMilli)
}

/// Manhattan distance in milli-units. Admissible for the 4-neighborhood.
fn heuristic(from: Position, to: Position) -> CostMilli {
    from.manhattan(to) * 1000
}

fn reconstruct(came_from: &BTreeMap<Position, Position>, goal: Position) -> Vec<Position> {
    let mut path = vec![goal];
    let mut cursor = goal;
    while let Some(&previous) = came_from.get(&cursor) {
        path.push(previous);
        cursor = previous;
    }
    path.reverse();
    path
}

/// Heap node ordered for min-first popping: lower f, then lower h, then lower
/// x+y, then earlier insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    f: CostMilli,
    h: CostMilli,
    position: Position,
    g: CostMilli,
    sequence: u64,
}

impl Node {
    fn key(&self) -> (CostMilli, CostMilli, i32, u64) {
        (self.f, self.h, self.position.x + self.position.y, self.sequence)
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert for min-first.
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// Reachability cache
// ============================================================================

/// Memoized `reachable_positions` results keyed on
/// `(unit, position, budget-milli)`.
///
/// Entries carry the grid generation they were computed against; a stale
/// generation is a miss, so grid mutations and unit moves invalidate without
/// any explicit notification.
#[derive(Clone, Debug, Default)]
pub struct ReachableCache {
    entries: HashMap<(UnitId, Position, CostMilli), (u64, Arc<BTreeSet<Position>>)>,
}

impl ReachableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reachable(
        &mut self,
        grid: &Grid,
        unit: UnitId,
        start: Position,
        budget: f32,
    ) -> Result<Arc<BTreeSet<Position>>, PathError> {
        let key = (unit, start, convert_points(budget)?);
        if let Some((generation, cached)) = self.entries.get(&key)
            && *generation == grid.generation()
        {
            return Ok(Arc::clone(cached));
        }

        let computed = Arc::new(
            Pathfinder::new(grid)
                .excluding(unit)
                .reachable_positions(start, budget)?,
        );
        self.entries
            .insert(key, (grid.generation(), Arc::clone(&computed)));
        Ok(computed)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
