//! Cell storage: the whole board held by the coordinator, and the padded
//! per-partition grid each worker steps.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LifeError, Result};
use crate::geometry::Partition;

pub const DEAD: u8 = 0;
pub const ALIVE: u8 = 1;

/// The Game of Life rule for one cell.
pub fn next_cell(former_cell: u8, neighbors: u32) -> u8 {
    match (former_cell, neighbors) {
        (ALIVE, 2) | (ALIVE, 3) => ALIVE,
        (DEAD, 3) => ALIVE,
        _ => DEAD,
    }
}

/// Sum of the live cells around `(x, y)` on a `width` x `height` field.
/// Anything outside the field counts as dead.
fn live_neighbors(width: usize, height: usize, x: usize, y: usize, cells: &[u8]) -> u32 {
    let mut neighbors = 0;
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (nx, ny) = (x as isize + dx, y as isize + dy);
            if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                continue;
            }
            neighbors += cells[nx as usize + ny as usize * width] as u32;
        }
    }
    neighbors
}

fn step_field(width: usize, height: usize, from: &[u8], to: &mut [u8]) {
    for y in 0..height {
        for x in 0..width {
            let index = x + y * width;
            to[index] = next_cell(from[index], live_neighbors(width, height, x, y, from));
        }
    }
}

/// `width * height`, or a config error when the product overflows.
pub fn cell_count(width: usize, height: usize) -> Result<usize> {
    width.checked_mul(height).ok_or_else(|| {
        LifeError::Config(format!("a {}x{} board has too many cells", width, height))
    })
}

/// The whole board, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            width,
            height,
            cells: vec![DEAD; cell_count(width, height)?],
        })
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Result<Self> {
        if cells.len() != cell_count(width, height)? {
            return Err(LifeError::Config(format!(
                "{} cells do not fill a {}x{} board",
                cells.len(),
                width,
                height
            )));
        }
        if let Some(bad) = cells.iter().find(|&&c| c != DEAD && c != ALIVE) {
            return Err(LifeError::Config(format!("invalid cell value {}", bad)));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width && y < self.height, "({}, {}) is off the board", x, y);
        self.cells[x + y * self.width]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        assert!(x < self.width && y < self.height, "({}, {}) is off the board", x, y);
        self.cells[x + y * self.width] = value;
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&c| c == ALIVE).count()
    }

    /// One generation computed on the whole board in a single process.
    pub fn step(&self) -> Board {
        let mut next = Board {
            width: self.width,
            height: self.height,
            cells: vec![DEAD; self.cells.len()],
        };
        step_field(self.width, self.height, &self.cells, &mut next.cells);
        next
    }

    pub fn advance(&self, generations: u32) -> Board {
        (0..generations).fold(self.clone(), |board, _| board.step())
    }

    /// The padded slice a worker starts from: the partition plus a one-cell
    /// ring, dead wherever the ring leaves the board.
    pub fn padded_slice(&self, partition: &Partition) -> LocalGrid {
        let mut grid = LocalGrid::new(partition.length_x, partition.length_y);
        for ly in 0..grid.padded_height() {
            for lx in 0..grid.padded_width() {
                let gx = (partition.start_x + lx) as isize - 1;
                let gy = (partition.start_y + ly) as isize - 1;
                if gx >= 0 && gy >= 0 && (gx as usize) < self.width && (gy as usize) < self.height {
                    grid.set(lx, ly, self.get(gx as usize, gy as usize));
                }
            }
        }
        grid
    }

    /// Copy the interior of `grid` back to where `partition` sits.
    pub fn paste_interior(&mut self, partition: &Partition, grid: &LocalGrid) {
        for y in 0..partition.length_y {
            for x in 0..partition.length_x {
                self.set(partition.start_x + x, partition.start_y + y, grid.get(x + 1, y + 1));
            }
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1)) {
            for &cell in row {
                f.write_str(if cell == ALIVE { "*" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A partition's cells surrounded by a one-cell halo ring.
///
/// Coordinates are local: the interior is `[1, length_x] x [1, length_y]`,
/// the ring is column `0`, column `length_x + 1`, row `0` and row
/// `length_y + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalGrid {
    length_x: usize,
    length_y: usize,
    cells: Vec<u8>,
}

impl LocalGrid {
    pub fn new(length_x: usize, length_y: usize) -> Self {
        Self {
            length_x,
            length_y,
            cells: vec![DEAD; (length_x + 2) * (length_y + 2)],
        }
    }

    pub fn length_x(&self) -> usize {
        self.length_x
    }

    pub fn length_y(&self) -> usize {
        self.length_y
    }

    pub fn padded_width(&self) -> usize {
        self.length_x + 2
    }

    pub fn padded_height(&self) -> usize {
        self.length_y + 2
    }

    /// True when the buffer matches the partition it claims to hold.
    pub fn fits(&self, partition: &Partition) -> bool {
        self.length_x == partition.length_x
            && self.length_y == partition.length_y
            && self.cells.len() == self.padded_width() * self.padded_height()
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.padded_width() && y < self.padded_height(),
            "({}, {}) is outside a {}x{} padded grid",
            x,
            y,
            self.padded_width(),
            self.padded_height()
        );
        x + y * self.padded_width()
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        let index = self.index(x, y);
        self.cells[index] = value;
    }

    /// Whether `(x, y)` lives in the next generation, counting only the
    /// neighbors inside the padded buffer.
    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        let neighbors = live_neighbors(self.padded_width(), self.padded_height(), x, y, &self.cells);
        next_cell(self.get(x, y), neighbors) == ALIVE
    }

    /// Apply the rule to every position, halo included, writing into `next`.
    pub fn step_into(&self, next: &mut LocalGrid) {
        assert_eq!(
            (self.length_x, self.length_y),
            (next.length_x, next.length_y),
            "double buffers must have the same shape"
        );
        for y in 0..self.padded_height() {
            for x in 0..self.padded_width() {
                next.set(x, y, if self.is_alive(x, y) { ALIVE } else { DEAD });
            }
        }
    }

    /// Map every nonzero cell to [`ALIVE`].
    pub fn normalize(&mut self) {
        for cell in &mut self.cells {
            *cell = (*cell != DEAD) as u8;
        }
    }

    pub fn interior_population(&self) -> usize {
        let mut count = 0;
        for y in 1..=self.length_y {
            for x in 1..=self.length_x {
                count += self.get(x, y) as usize;
            }
        }
        count
    }
}

/// Current and next generation, swapped after every step.
#[derive(Debug, Clone)]
pub struct DoubleBuffer {
    current: LocalGrid,
    next: LocalGrid,
}

impl DoubleBuffer {
    pub fn new(initial: LocalGrid) -> Self {
        let next = LocalGrid::new(initial.length_x, initial.length_y);
        Self {
            current: initial,
            next,
        }
    }

    pub fn current(&self) -> &LocalGrid {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut LocalGrid {
        &mut self.current
    }

    pub fn step(&mut self) {
        self.current.step_into(&mut self.next);
        std::mem::swap(&mut self.current, &mut self.next);
    }

    pub fn into_current(self) -> LocalGrid {
        self.current
    }
}
