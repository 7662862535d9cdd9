//! Splits a board into a near-square grid of rectangular partitions.
//!
//! The steps are:
//! 1. Work out which board side is the smaller one (and whether it is the vertical one).
//! 2. Clamp the requested partition count so that a degenerate 1xN layout always exists.
//! 3. Factor the count into two divisions as close to a square as possible.
//! 4. Decide which factor runs along the X axis.
//! 5. Hand out widths and heights, giving remainders to the lowest columns and rows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LifeError, Result};
use crate::topology::{neighbor_list, NeighborList};

/// A rectangle of the board owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub start_x: usize,
    pub start_y: usize,
    pub length_x: usize,
    pub length_y: usize,
}

impl Partition {
    /// One past the last column of this partition.
    pub fn end_x(&self) -> usize {
        self.start_x + self.length_x
    }

    /// One past the last row of this partition.
    pub fn end_y(&self) -> usize {
        self.start_y + self.length_y
    }

    pub fn cell_count(&self) -> usize {
        self.length_x * self.length_y
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        (self.start_x..self.end_x()).contains(&x) && (self.start_y..self.end_y()).contains(&y)
    }
}

/// Number of partitions along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divisions {
    pub x: usize,
    pub y: usize,
}

impl Divisions {
    pub fn count(&self) -> usize {
        self.x * self.y
    }
}

/// The board sides ordered by size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSides {
    pub smaller: usize,
    pub larger: usize,
    /// True when the smaller side is the height of the board.
    /// Square boards count as vertical.
    pub smaller_is_vertical: bool,
}

pub fn compare_sides(width: usize, height: usize) -> BoardSides {
    if width < height {
        BoardSides {
            smaller: width,
            larger: height,
            smaller_is_vertical: false,
        }
    } else {
        BoardSides {
            smaller: height,
            larger: width,
            smaller_is_vertical: true,
        }
    }
}

impl BoardSides {
    /// Clamp `requested` to the number of cells, then walk it down until it
    /// divides one of the sides whenever it exceeds the larger side.
    pub fn clamp_partition_count(&self, requested: usize) -> usize {
        let mut count = requested.min(self.smaller * self.larger);
        if count > self.larger {
            while count % self.smaller != 0 && count % self.larger != 0 {
                count -= 1;
            }
        }
        count
    }

    /// Pick the two divisions for `count` partitions.
    pub fn determine_factors(&self, count: usize) -> Divisions {
        let highest = largest_divisor_below_root(count);
        let other = count / highest;

        if !self.fits(highest, other) && !self.fits_swapped(highest, other) {
            // Anchor on the smaller side; this may drop a few partitions.
            let across = count / self.smaller;
            if self.smaller > across {
                self.set_divisions(self.smaller, across)
            } else {
                self.set_divisions(across, self.smaller)
            }
        } else if other > count {
            self.set_divisions(count, 1)
        } else {
            self.set_divisions(highest, other)
        }
    }

    /// Turn a factor pair into X/Y divisions. `first` is laid along the
    /// larger side when the pair is kept "in place".
    pub fn set_divisions(&self, first: usize, second: usize) -> Divisions {
        let in_place_fits = self.fits(first, second);
        let swapped_fits = self.fits_swapped(first, second);

        // An even split along one side is preferred.
        let in_place = if in_place_fits
            && (self.larger % first == 0 || self.smaller % second == 0)
        {
            true
        } else if swapped_fits && (self.smaller % first == 0 || self.larger % second == 0) {
            false
        } else {
            in_place_fits || !swapped_fits
        };

        let (x, y) = if self.smaller_is_vertical == in_place {
            (first, second)
        } else {
            (second, first)
        };
        Divisions { x, y }
    }

    /// `first` along the larger side, `second` along the smaller one.
    fn fits(&self, first: usize, second: usize) -> bool {
        first <= self.larger && second <= self.smaller
    }

    fn fits_swapped(&self, first: usize, second: usize) -> bool {
        first <= self.smaller && second <= self.larger
    }
}

fn largest_divisor_below_root(count: usize) -> usize {
    (1..)
        .take_while(|i| i * i <= count)
        .filter(|i| count % i == 0)
        .last()
        .unwrap_or(1)
}

/// Split `total` into `parts` lengths, the first `total % parts` one unit longer.
fn spread(total: usize, parts: usize) -> Vec<usize> {
    let base = total / parts;
    let extra = total % parts;
    (0..parts)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// The full decomposition of a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    width: usize,
    height: usize,
    divisions: Divisions,
    partitions: Vec<Partition>,
}

impl PartitionLayout {
    /// Decompose a `width` x `height` board into at most `requested` partitions.
    pub fn generate(width: usize, height: usize, requested: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LifeError::Config(format!(
                "board must be at least 1x1, got {}x{}",
                width, height
            )));
        }
        if requested == 0 {
            return Err(LifeError::Config(
                "at least one partition must be requested".into(),
            ));
        }

        let sides = compare_sides(width, height);
        let count = sides.clamp_partition_count(requested);
        let divisions = sides.determine_factors(count);

        let widths = spread(width, divisions.x);
        let heights = spread(height, divisions.y);

        let mut partitions = Vec::with_capacity(divisions.count());
        let mut start_y = 0;
        for &length_y in &heights {
            let mut start_x = 0;
            for &length_x in &widths {
                partitions.push(Partition {
                    start_x,
                    start_y,
                    length_x,
                    length_y,
                });
                start_x += length_x;
            }
            start_y += length_y;
        }

        debug!(
            width,
            height,
            requested,
            clamped = count,
            x_divisions = divisions.x,
            y_divisions = divisions.y,
            "board partitioned"
        );

        Ok(Self {
            width,
            height,
            divisions,
            partitions,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn divisions(&self) -> Divisions {
        self.divisions
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// The actual number of partitions, which may be lower than requested.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn partition(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }

    pub fn neighbors(&self, index: usize) -> NeighborList {
        neighbor_list(index, self.divisions)
    }

    /// Index of the partition holding board cell `(x, y)`.
    pub fn owner_of(&self, x: usize, y: usize) -> Option<usize> {
        self.partitions.iter().position(|p| p.contains(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(layout: &PartitionLayout) {
        let (w, h) = (layout.width(), layout.height());
        let mut covered = vec![0u32; w * h];
        for p in layout.partitions() {
            assert!(p.length_x >= 1 && p.length_y >= 1, "empty partition {:?}", p);
            assert!(p.end_x() <= w && p.end_y() <= h, "{:?} leaves {}x{}", p, w, h);
            for y in p.start_y..p.end_y() {
                for x in p.start_x..p.end_x() {
                    covered[y * w + x] += 1;
                }
            }
        }
        assert!(
            covered.iter().all(|&c| c == 1),
            "{}x{} into {} partitions is not an exact tiling",
            w,
            h,
            layout.len()
        );
    }

    #[test]
    fn three_by_three_into_nine() {
        let layout = PartitionLayout::generate(3, 3, 9).unwrap();
        assert_eq!(layout.len(), 9);
        assert_eq!(layout.divisions(), Divisions { x: 3, y: 3 });
        for (i, p) in layout.partitions().iter().enumerate() {
            assert_eq!((p.length_x, p.length_y), (1, 1));
            assert_eq!((p.start_x, p.start_y), (i % 3, i / 3));
        }
    }

    #[test]
    fn four_by_three_into_five_is_reduced() {
        let layout = PartitionLayout::generate(4, 3, 5).unwrap();
        // 5 exceeds the larger side and divides neither, so it walks down to 4.
        assert_eq!(layout.len(), 4);
        assert_eq!(layout.divisions(), Divisions { x: 2, y: 2 });
        let expected = [
            Partition { start_x: 0, start_y: 0, length_x: 2, length_y: 2 },
            Partition { start_x: 2, start_y: 0, length_x: 2, length_y: 2 },
            Partition { start_x: 0, start_y: 2, length_x: 2, length_y: 1 },
            Partition { start_x: 2, start_y: 2, length_x: 2, length_y: 1 },
        ];
        assert_eq!(layout.partitions(), &expected[..]);
        let cells: usize = layout.partitions().iter().map(Partition::cell_count).sum();
        assert_eq!(cells, 12);
        assert_tiles(&layout);
    }

    #[test]
    fn remainders_go_to_lowest_columns_and_rows() {
        let layout = PartitionLayout::generate(11, 7, 6).unwrap();
        // The smaller factor runs along the larger side.
        assert_eq!(layout.divisions(), Divisions { x: 2, y: 3 });
        let widths: Vec<usize> = layout.partitions()[..2].iter().map(|p| p.length_x).collect();
        let heights: Vec<usize> = layout.partitions().iter().step_by(2).map(|p| p.length_y).collect();
        assert_eq!(widths, vec![6, 5]);
        assert_eq!(heights, vec![3, 2, 2]);
        assert_tiles(&layout);
    }

    #[test]
    fn clamp_to_cell_count_and_side_divisor() {
        let sides = compare_sides(4, 3);
        assert_eq!(sides.clamp_partition_count(100), 12);
        assert_eq!(sides.clamp_partition_count(11), 9);
        assert_eq!(sides.clamp_partition_count(7), 6);
        assert_eq!(sides.clamp_partition_count(3), 3);
    }

    #[test]
    fn compare_sides_records_orientation() {
        assert_eq!(
            compare_sides(10, 2),
            BoardSides { smaller: 2, larger: 10, smaller_is_vertical: true }
        );
        assert_eq!(
            compare_sides(2, 10),
            BoardSides { smaller: 2, larger: 10, smaller_is_vertical: false }
        );
        assert!(compare_sides(5, 5).smaller_is_vertical);
    }

    #[test]
    fn bounds_fallback_runs_before_strip_fallback() {
        // 9 factors as 3x3, which fits neither way on a 10x2 board.
        let sides = compare_sides(10, 2);
        assert_eq!(sides.determine_factors(9), Divisions { x: 4, y: 2 });

        let layout = PartitionLayout::generate(10, 2, 9).unwrap();
        assert_eq!(layout.len(), 8);
        assert_tiles(&layout);
    }

    #[test]
    fn bounds_fallback_on_a_tall_board() {
        let sides = compare_sides(2, 10);
        assert_eq!(sides.determine_factors(9), Divisions { x: 2, y: 4 });
    }

    #[test]
    fn prime_counts_become_strips() {
        let layout = PartitionLayout::generate(10, 4, 7).unwrap();
        assert_eq!(layout.divisions(), Divisions { x: 7, y: 1 });
        assert_tiles(&layout);

        let layout = PartitionLayout::generate(4, 10, 7).unwrap();
        assert_eq!(layout.divisions(), Divisions { x: 1, y: 7 });
        assert_tiles(&layout);
    }

    #[test]
    fn set_divisions_prefers_an_even_split() {
        let sides = compare_sides(12, 5);
        // 12 % 3 == 0, so the 3 runs along the larger (horizontal) side.
        assert_eq!(sides.set_divisions(3, 2), Divisions { x: 3, y: 2 });
        // 5 % 5 == 0 with the pair swapped, and 5 is the vertical side.
        assert_eq!(sides.set_divisions(5, 2), Divisions { x: 2, y: 5 });
    }

    #[test]
    fn single_partition_is_the_whole_board() {
        let layout = PartitionLayout::generate(6, 4, 1).unwrap();
        assert_eq!(
            layout.partitions(),
            &[Partition { start_x: 0, start_y: 0, length_x: 6, length_y: 4 }][..]
        );
    }

    #[test]
    fn every_request_tiles_every_small_board() {
        for width in 1..=12 {
            for height in 1..=12 {
                for requested in 1..=width * height {
                    let layout = PartitionLayout::generate(width, height, requested).unwrap();
                    assert!(layout.len() >= 1 && layout.len() <= requested);
                    assert_eq!(layout.len(), layout.divisions().count());
                    assert_tiles(&layout);
                }
            }
        }
    }

    #[test]
    fn owner_of_finds_the_containing_partition() {
        let layout = PartitionLayout::generate(8, 8, 4).unwrap();
        assert_eq!(layout.owner_of(0, 0), Some(0));
        assert_eq!(layout.owner_of(7, 0), Some(1));
        assert_eq!(layout.owner_of(3, 4), Some(2));
        assert_eq!(layout.owner_of(4, 7), Some(3));
        assert_eq!(layout.owner_of(8, 0), None);
    }

    #[test]
    fn zero_sized_requests_are_rejected() {
        assert!(matches!(PartitionLayout::generate(0, 4, 1), Err(LifeError::Config(_))));
        assert!(matches!(PartitionLayout::generate(4, 4, 0), Err(LifeError::Config(_))));
    }
}
