//! Grid model and the pure geometry used to reason about tile movement.
//!
//! Nothing in here performs I/O or touches shared state. Coordinates are
//! signed so that a walk can step one cell past the edge of the board, which
//! is how [`find_farthest_position`] reports that the border stopped it.

use crate::protocol::{GridSnapshot, ProtocolError};
use std::fmt;

/// One of the four directions a move can take, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Integer code sent to the server.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Direction> {
        match code {
            0 => Some(Direction::Up),
            1 => Some(Direction::Right),
            2 => Some(Direction::Down),
            3 => Some(Direction::Left),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Direction::from_code(code).ok_or(ProtocolError::InvalidDirection(code))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vector {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, vector: Vector) -> Self {
        Self {
            x: self.x + vector.x,
            y: self.y + vector.y,
        }
    }
}

/// A single valued piece on the board.
///
/// `merged_from` only records where the two source tiles sat before a
/// merge so a renderer can animate it; reconciliation never reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub value: u32,
    pub position: Position,
    pub merged_from: Option<[Position; 2]>,
}

impl Tile {
    pub fn new(position: Position, value: u32) -> Self {
        Self {
            value,
            position,
            merged_from: None,
        }
    }
}

/// Square board of optional tiles, stored column-major as `cells[x][y]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Vec<Option<Tile>>>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![vec![None; size]; size],
        }
    }

    /// Builds a grid from a server snapshot laid out as `snapshot[y][x]`,
    /// where zero marks an empty cell.
    pub fn from_snapshot(size: usize, snapshot: &GridSnapshot) -> Result<Self, ProtocolError> {
        if snapshot.len() != size {
            return Err(ProtocolError::GridDimension {
                expected: size,
                found: snapshot.len(),
            });
        }

        let mut grid = Grid::new(size);
        for (y, row) in snapshot.iter().enumerate() {
            if row.len() != size {
                return Err(ProtocolError::GridDimension {
                    expected: size,
                    found: row.len(),
                });
            }
            for (x, &value) in row.iter().enumerate() {
                if value != 0 {
                    grid.cells[x][y] = Some(Tile::new(Position::new(x as i32, y as i32), value));
                }
            }
        }

        Ok(grid)
    }

    pub fn to_snapshot(&self) -> GridSnapshot {
        (0..self.size)
            .map(|y| {
                (0..self.size)
                    .map(|x| self.cells[x][y].as_ref().map_or(0, |tile| tile.value))
                    .collect()
            })
            .collect()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn within_bounds(&self, position: Position) -> bool {
        let size = self.size as i32;
        position.x >= 0 && position.x < size && position.y >= 0 && position.y < size
    }

    pub fn cell_content(&self, position: Position) -> Option<&Tile> {
        if !self.within_bounds(position) {
            return None;
        }
        self.cells[position.x as usize][position.y as usize].as_ref()
    }

    pub fn cell_occupied(&self, position: Position) -> bool {
        self.cell_content(position).is_some()
    }

    /// True for an in-bounds cell without a tile.
    pub fn cell_available(&self, position: Position) -> bool {
        self.within_bounds(position) && !self.cell_occupied(position)
    }

    pub fn available_cells(&self) -> Vec<Position> {
        let mut cells = Vec::new();
        self.each_cell(|position, tile| {
            if tile.is_none() {
                cells.push(position);
            }
        });
        cells
    }

    pub fn cells_available(&self) -> bool {
        self.cells.iter().flatten().any(Option::is_none)
    }

    /// Visits every cell, column by column.
    pub fn each_cell<F>(&self, mut visit: F)
    where
        F: FnMut(Position, Option<&Tile>),
    {
        for (x, column) in self.cells.iter().enumerate() {
            for (y, cell) in column.iter().enumerate() {
                visit(Position::new(x as i32, y as i32), cell.as_ref());
            }
        }
    }

    /// Places `tile` at its own position. Out-of-bounds tiles are ignored.
    pub fn insert_tile(&mut self, tile: Tile) {
        if self.within_bounds(tile.position) {
            let Position { x, y } = tile.position;
            self.cells[x as usize][y as usize] = Some(tile);
        }
    }

    pub fn remove_tile(&mut self, position: Position) -> Option<Tile> {
        if !self.within_bounds(position) {
            return None;
        }
        self.cells[position.x as usize][position.y as usize].take()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_none)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.to_snapshot() {
            for value in row {
                write!(f, "{}\t", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Per-axis scan order for a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversals {
    pub x: Vec<usize>,
    pub y: Vec<usize>,
}

/// Result of walking from a cell until something blocks the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarthestPosition {
    /// Last free cell reached (the start cell if the first step is blocked).
    pub farthest: Position,
    /// Cell that stopped the walk; either out of bounds or occupied.
    pub next: Position,
}

pub fn vector_for(direction: Direction) -> Vector {
    match direction {
        Direction::Up => Vector { x: 0, y: -1 },
        Direction::Right => Vector { x: 1, y: 0 },
        Direction::Down => Vector { x: 0, y: 1 },
        Direction::Left => Vector { x: -1, y: 0 },
    }
}

/// Scan order visiting the cells farthest along `vector` first.
pub fn traversal_order(size: usize, vector: Vector) -> Traversals {
    let mut traversals = Traversals {
        x: (0..size).collect(),
        y: (0..size).collect(),
    };

    if vector.x == 1 {
        traversals.x.reverse();
    }
    if vector.y == 1 {
        traversals.y.reverse();
    }

    traversals
}

pub fn find_farthest_position(grid: &Grid, cell: Position, vector: Vector) -> FarthestPosition {
    let mut previous = cell;
    let mut next = cell.offset(vector);

    while grid.cell_available(next) {
        previous = next;
        next = next.offset(vector);
    }

    FarthestPosition {
        farthest: previous,
        next,
    }
}

/// Short-circuits on the first pair of equal neighbouring tiles.
pub fn tile_matches_available(grid: &Grid) -> bool {
    let size = grid.size() as i32;

    for y in 0..size {
        for x in 0..size {
            let position = Position::new(x, y);
            let Some(tile) = grid.cell_content(position) else {
                continue;
            };

            for direction in Direction::ALL {
                let neighbour = position.offset(vector_for(direction));
                if let Some(other) = grid.cell_content(neighbour) {
                    if other.value == tile.value {
                        return true;
                    }
                }
            }
        }
    }

    false
}

pub fn moves_available(grid: &Grid) -> bool {
    grid.cells_available() || tile_matches_available(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from_rows(rows: &[[u32; 4]; 4]) -> Grid {
        let snapshot: GridSnapshot = rows.iter().map(|row| row.to_vec()).collect();
        Grid::from_snapshot(4, &snapshot).unwrap()
    }

    #[test]
    fn test_vectors_for_each_direction() {
        assert_eq!(vector_for(Direction::Up), Vector { x: 0, y: -1 });
        assert_eq!(vector_for(Direction::Right), Vector { x: 1, y: 0 });
        assert_eq!(vector_for(Direction::Down), Vector { x: 0, y: 1 });
        assert_eq!(vector_for(Direction::Left), Vector { x: -1, y: 0 });
    }

    #[test]
    fn test_direction_codes() {
        for direction in Direction::ALL {
            assert_eq!(Direction::from_code(direction.code()), Some(direction));
        }
        assert_eq!(Direction::from_code(4), None);
        assert!(Direction::try_from(7).is_err());
    }

    #[test]
    fn test_traversal_order_right() {
        let traversals = traversal_order(4, Vector { x: 1, y: 0 });
        assert_eq!(traversals.x, vec![3, 2, 1, 0]);
        assert_eq!(traversals.y, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_traversal_order_down_and_left() {
        let down = traversal_order(4, vector_for(Direction::Down));
        assert_eq!(down.x, vec![0, 1, 2, 3]);
        assert_eq!(down.y, vec![3, 2, 1, 0]);

        let left = traversal_order(4, vector_for(Direction::Left));
        assert_eq!(left.x, vec![0, 1, 2, 3]);
        assert_eq!(left.y, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_farthest_position_on_empty_grid() {
        let grid = Grid::new(4);
        let result = find_farthest_position(&grid, Position::new(0, 0), Vector { x: 1, y: 0 });
        assert_eq!(result.farthest, Position::new(3, 0));
        assert_eq!(result.next, Position::new(4, 0));
    }

    #[test]
    fn test_farthest_position_stops_before_tile() {
        let mut grid = Grid::new(4);
        grid.insert_tile(Tile::new(Position::new(0, 3), 8));

        let result = find_farthest_position(&grid, Position::new(0, 0), vector_for(Direction::Down));
        assert_eq!(result.farthest, Position::new(0, 2));
        assert_eq!(result.next, Position::new(0, 3));
        assert!(grid.cell_occupied(result.next));
    }

    #[test]
    fn test_farthest_position_blocked_immediately() {
        let grid = Grid::new(4);
        let result = find_farthest_position(&grid, Position::new(0, 0), vector_for(Direction::Up));
        assert_eq!(result.farthest, Position::new(0, 0));
        assert_eq!(result.next, Position::new(0, -1));
        assert!(!grid.within_bounds(result.next));
    }

    #[test]
    fn test_tile_matches_available() {
        let no_matches = grid_from_rows(&[
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        assert!(!tile_matches_available(&no_matches));
        assert!(!moves_available(&no_matches));

        let vertical_match = grid_from_rows(&[
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 8, 4],
            [4, 2, 8, 2],
        ]);
        assert!(tile_matches_available(&vertical_match));
        assert!(moves_available(&vertical_match));
    }

    #[test]
    fn test_moves_available_with_free_cell() {
        let grid = grid_from_rows(&[
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 0],
        ]);
        assert!(!tile_matches_available(&grid));
        assert!(grid.cells_available());
        assert!(moves_available(&grid));
        assert_eq!(grid.available_cells(), vec![Position::new(3, 3)]);
    }

    #[test]
    fn test_snapshot_layout_is_row_major() {
        let grid = grid_from_rows(&[
            [0, 2, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 16],
            [0, 0, 0, 0],
        ]);
        assert_eq!(grid.cell_content(Position::new(1, 0)).map(|t| t.value), Some(2));
        assert_eq!(grid.cell_content(Position::new(3, 2)).map(|t| t.value), Some(16));
        assert_eq!(grid.cell_content(Position::new(0, 1)), None);
        assert_eq!(grid.to_snapshot()[2], vec![0, 0, 0, 16]);
    }

    #[test]
    fn test_snapshot_dimension_mismatch() {
        let snapshot: GridSnapshot = vec![vec![0; 4]; 3];
        assert!(matches!(
            Grid::from_snapshot(4, &snapshot),
            Err(ProtocolError::GridDimension { expected: 4, found: 3 })
        ));

        let ragged: GridSnapshot = vec![vec![0; 4], vec![0; 4], vec![0; 2], vec![0; 4]];
        assert!(Grid::from_snapshot(4, &ragged).is_err());
    }

    #[test]
    fn test_insert_and_remove_tile() {
        let mut grid = Grid::new(4);
        assert!(grid.is_empty());

        grid.insert_tile(Tile::new(Position::new(2, 1), 4));
        assert!(!grid.cell_available(Position::new(2, 1)));
        assert!(!grid.cell_available(Position::new(9, 9)));

        let removed = grid.remove_tile(Position::new(2, 1));
        assert_eq!(removed.map(|t| t.value), Some(4));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_display_matches_board_format() {
        let grid = grid_from_rows(&[
            [2, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 4],
        ]);
        let text = grid.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "2\t0\t0\t0\t");
        assert_eq!(lines[3], "0\t0\t0\t4\t");
    }
}
