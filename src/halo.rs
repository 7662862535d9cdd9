//! Per-generation exchange of border strips between neighboring workers.

use tracing::{trace, warn};

use crate::comm::{Communicator, Envelope, Rank, Tag};
use crate::error::Result;
use crate::grid::{LocalGrid, DEAD};
use crate::topology::{Direction, NeighborList};

/// Local coordinates of the strip on side `direction`, `inset` cells in from
/// the padded edge. `inset == 1` is the outermost interior strip, `inset == 0`
/// the halo ring itself.
fn strip_coords(grid: &LocalGrid, direction: Direction, inset: usize) -> Vec<(usize, usize)> {
    let (lx, ly) = (grid.length_x(), grid.length_y());
    let low = inset;
    let high_x = lx + 1 - inset;
    let high_y = ly + 1 - inset;
    match direction {
        Direction::NorthWest => vec![(low, low)],
        Direction::North => (1..=lx).map(|x| (x, low)).collect(),
        Direction::NorthEast => vec![(high_x, low)],
        Direction::West => (1..=ly).map(|y| (low, y)).collect(),
        Direction::East => (1..=ly).map(|y| (high_x, y)).collect(),
        Direction::SouthWest => vec![(low, high_y)],
        Direction::South => (1..=lx).map(|x| (x, high_y)).collect(),
        Direction::SouthEast => vec![(high_x, high_y)],
    }
}

/// The interior border cells on side `direction`, as sent to the neighbor
/// lying that way.
pub fn border_strip(grid: &LocalGrid, direction: Direction) -> Vec<u8> {
    strip_coords(grid, direction, 1)
        .into_iter()
        .map(|(x, y)| grid.get(x, y))
        .collect()
}

/// Number of cells in the halo slot on side `direction`.
pub fn halo_len(grid: &LocalGrid, direction: Direction) -> usize {
    match direction {
        Direction::North | Direction::South => grid.length_x(),
        Direction::West | Direction::East => grid.length_y(),
        _ => 1,
    }
}

/// Copy a received strip into the halo slot on side `direction`.
/// A strip of the wrong length fills what it can.
pub fn fill_halo(grid: &mut LocalGrid, direction: Direction, strip: &[u8]) {
    let expected = halo_len(grid, direction);
    if strip.len() != expected {
        warn!(
            ?direction,
            expected,
            got = strip.len(),
            "halo strip has the wrong length"
        );
    }
    for ((x, y), &cell) in strip_coords(grid, direction, 0).into_iter().zip(strip) {
        grid.set(x, y, (cell != DEAD) as u8);
    }
}

/// Reset the halo slot on side `direction` to dead.
pub fn clear_halo(grid: &mut LocalGrid, direction: Direction) {
    for (x, y) in strip_coords(grid, direction, 0) {
        grid.set(x, y, DEAD);
    }
}

/// Fills one worker's halo ring from its neighbors.
pub struct HaloExchange<'c, C> {
    comm: &'c C,
    neighbors: NeighborList,
}

impl<'c, C: Communicator> HaloExchange<'c, C> {
    /// Partition indices double as ranks.
    pub fn new(comm: &'c C, neighbors: NeighborList) -> Self {
        Self { comm, neighbors }
    }

    /// Send every border strip, receive every halo strip, and reset the
    /// halo slots that have no neighbor behind them.
    pub fn exchange(&self, grid: &mut LocalGrid) -> Result<()> {
        let sends: Vec<Envelope> = self
            .neighbors
            .present()
            .map(|(direction, neighbor)| {
                // What is my north border is my neighbor's south halo.
                Envelope::new(
                    neighbor,
                    Tag::Halo(direction.opposite()),
                    border_strip(grid, direction),
                )
            })
            .collect();
        let expected: Vec<(Rank, Tag)> = self
            .neighbors
            .present()
            .map(|(direction, neighbor)| (neighbor, Tag::Halo(direction)))
            .collect();

        let received = self.comm.exchange(sends, &expected)?;

        for (&(source, tag), strip) in expected.iter().zip(&received) {
            if let Tag::Halo(direction) = tag {
                trace!(rank = self.comm.rank(), source, ?direction, cells = strip.len(), "halo received");
                fill_halo(grid, direction, strip);
            }
        }
        for direction in Direction::ALL {
            if self.neighbors.get(direction).is_none() {
                clear_halo(grid, direction);
            }
        }
        Ok(())
    }
}
