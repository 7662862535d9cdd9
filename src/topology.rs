//! Compass neighbors of a partition inside the partition grid.

use serde::{Deserialize, Serialize};

use crate::geometry::Divisions;

/// One of the eight compass directions, in the fixed slot order
/// `NW, N, NE, W, E, SW, S, SE`. North is towards row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    NorthWest,
    North,
    NorthEast,
    West,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
        Direction::West,
        Direction::East,
        Direction::SouthWest,
        Direction::South,
        Direction::SouthEast,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::NorthWest => Direction::SouthEast,
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::SouthWest => Direction::NorthEast,
            Direction::South => Direction::North,
            Direction::SouthEast => Direction::NorthWest,
        }
    }

    /// `(dx, dy)` step towards this direction.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::NorthWest => (-1, -1),
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::SouthWest => (-1, 1),
            Direction::South => (0, 1),
            Direction::SouthEast => (1, 1),
        }
    }

    /// Slot of this direction in a [`NeighborList`].
    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn is_corner(self) -> bool {
        let (dx, dy) = self.offset();
        dx != 0 && dy != 0
    }
}

/// Neighbor partition indices, one slot per [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NeighborList([Option<usize>; 8]);

impl NeighborList {
    pub fn get(&self, direction: Direction) -> Option<usize> {
        self.0[direction.slot()]
    }

    pub fn slots(&self) -> &[Option<usize>; 8] {
        &self.0
    }

    /// Directions that have a neighbor, in slot order.
    pub fn present(&self) -> impl Iterator<Item = (Direction, usize)> + '_ {
        Direction::ALL
            .iter()
            .filter_map(move |&d| self.get(d).map(|index| (d, index)))
    }
}

pub fn neighbor_list(index: usize, divisions: Divisions) -> NeighborList {
    let col = (index % divisions.x) as isize;
    let row = (index / divisions.x) as isize;
    let mut slots = [None; 8];
    for direction in Direction::ALL {
        let (dx, dy) = direction.offset();
        let (x, y) = (col + dx, row + dy);
        if x >= 0 && y >= 0 && (x as usize) < divisions.x && (y as usize) < divisions.y {
            slots[direction.slot()] = Some(x as usize + y as usize * divisions.x);
        }
    }
    NeighborList(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_BY_TWO: Divisions = Divisions { x: 3, y: 2 };

    #[test]
    fn bottom_middle_of_three_by_two() {
        let list = neighbor_list(4, THREE_BY_TWO);
        assert_eq!(
            list.slots(),
            &[Some(0), Some(1), Some(2), Some(3), Some(5), None, None, None]
        );
    }

    #[test]
    fn interior_partition_has_all_eight() {
        let list = neighbor_list(4, Divisions { x: 3, y: 3 });
        assert_eq!(
            list.slots(),
            &[Some(0), Some(1), Some(2), Some(3), Some(5), Some(6), Some(7), Some(8)]
        );
        assert_eq!(list.present().count(), 8);
    }

    #[test]
    fn top_right_corner_has_no_east_side() {
        let list = neighbor_list(2, THREE_BY_TWO);
        assert_eq!(list.get(Direction::NorthEast), None);
        assert_eq!(list.get(Direction::East), None);
        assert_eq!(list.get(Direction::SouthEast), None);
        assert_eq!(list.get(Direction::West), Some(1));
        assert_eq!(list.get(Direction::SouthWest), Some(4));
        assert_eq!(list.get(Direction::South), Some(5));
    }

    #[test]
    fn single_partition_is_alone() {
        let list = neighbor_list(0, Divisions { x: 1, y: 1 });
        assert_eq!(list.present().count(), 0);
    }

    #[test]
    fn opposite_is_an_involution() {
        for d in Direction::ALL {
            assert_ne!(d, d.opposite());
            assert_eq!(d, d.opposite().opposite());
            let (dx, dy) = d.offset();
            assert_eq!(d.opposite().offset(), (-dx, -dy));
        }
    }

    #[test]
    fn neighbors_are_symmetric() {
        for x in 1..=5 {
            for y in 1..=5 {
                let divisions = Divisions { x, y };
                for a in 0..divisions.count() {
                    for (d, b) in neighbor_list(a, divisions).present() {
                        assert_eq!(
                            neighbor_list(b, divisions).get(d.opposite()),
                            Some(a),
                            "{} -> {} ({:?}) in {}x{}",
                            a,
                            b,
                            d,
                            x,
                            y
                        );
                    }
                }
            }
        }
    }
}
