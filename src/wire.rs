//! Encoding of the setup and gather messages.
//!
//! Messages are serialized with bincode (standard config). Halo strips do
//! not go through here; they travel as raw cell bytes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::comm::Rank;
use crate::error::{LifeError, Result};
use crate::geometry::Partition;
use crate::grid::LocalGrid;
use crate::topology::NeighborList;

/// Sent to every rank, idle ones included, so all of them know how many
/// barriers to attend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParameters {
    pub generations: u32,
    pub active_workers: usize,
}

/// Everything an active worker needs to run its partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub partition: Partition,
    pub neighbors: NeighborList,
    pub generations: u32,
    pub grid: LocalGrid,
}

pub fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
        LifeError::Encode {
            what,
            reason: e.to_string(),
        }
    })
}

pub fn decode<T: DeserializeOwned>(what: &'static str, rank: Rank, data: &[u8]) -> Result<T> {
    let (value, _) = bincode::serde::decode_from_slice(data, bincode::config::standard())
        .map_err(|e| LifeError::Decode {
            what,
            rank,
            reason: e.to_string(),
        })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Divisions;
    use crate::grid::ALIVE;
    use crate::topology::neighbor_list;

    #[test]
    fn assignment_survives_the_wire() {
        let mut grid = LocalGrid::new(2, 3);
        grid.set(1, 2, ALIVE);
        let assignment = Assignment {
            partition: Partition { start_x: 2, start_y: 0, length_x: 2, length_y: 3 },
            neighbors: neighbor_list(1, Divisions { x: 2, y: 2 }),
            generations: 12,
            grid,
        };
        let bytes = encode("assignment", &assignment).unwrap();
        let decoded: Assignment = decode("assignment", 0, &bytes).unwrap();
        assert_eq!(decoded, assignment);
    }

    #[test]
    fn truncated_parameters_are_a_decode_error() {
        let bytes = encode("parameters", &RunParameters { generations: 300, active_workers: 4 }).unwrap();
        let err = decode::<RunParameters>("parameters", 3, &bytes[..1]).unwrap_err();
        assert!(matches!(err, LifeError::Decode { rank: 3, .. }));
    }
}
