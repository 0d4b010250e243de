//! Line-of-sight checks.
//!
//! Integer Bresenham walk between two tiles. Walls block sight; units and
//! other terrain do not.

use crate::types::Position;

use super::{Grid, TerrainKind};

/// True when no wall lies strictly between `from` and `to`.
///
/// The endpoints themselves never block: an attacker in a doorway can always
/// see the tile it stands on and the tile it targets.
pub fn has_line_of_sight(grid: &Grid, from: Position, to: Position) -> bool {
    bresenham(from, to)
        .filter(|&p| p != from && p != to)
        .all(|p| {
            grid.cell(p)
                .is_none_or(|cell| cell.terrain != TerrainKind::Wall)
        })
}

/// All tiles on the discrete line from `from` to `to`, inclusive.
fn bresenham(from: Position, to: Position) -> impl Iterator<Item = Position> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut x = from.x;
    let mut y = from.y;
    let mut err = dx + dy;
    let mut done = false;

    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let current = Position::new(x, y);
        if current == to {
            done = true;
            return Some(current);
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
        Some(current)
    })
}
