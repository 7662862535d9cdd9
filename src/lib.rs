//! Conway's Game of Life split into rectangular tiles across a fixed pool of
//! workers that trade border cells every generation.
//!
//! - [`geometry`] decomposes the board into partitions.
//! - [`topology`] finds each partition's compass neighbors.
//! - [`grid`] holds the cells and the Life rule.
//! - [`halo`] fills each worker's halo ring from its neighbors.
//! - [`coordinator`] runs distribution, the generation loop and the gather.
//! - [`comm`] is the message-passing contract, implemented by [`local`]
//!   (threads) and `mpi_comm` (MPI, behind the `mpi` feature).

pub mod board_file;
pub mod comm;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod halo;
pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi_comm;
pub mod topology;
pub mod wire;

pub use coordinator::{run, SimulationInput, SimulationOutcome};
pub use error::{LifeError, Result};
pub use geometry::{Partition, PartitionLayout};
pub use grid::Board;
