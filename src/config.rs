//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::{LifeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One thread per rank inside this process.
    Local,
    /// One process per rank, launched with `mpirun`. Needs the `mpi` feature.
    Mpi,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "game_of_life_tiles",
    version = env!("CARGO_PKG_VERSION"),
    about = "Conway's Game of Life split into tiles across a pool of workers"
)]
pub struct Cli {
    /// Board file: `GENERATIONS COLUMNS ROWS` followed by `*`/`.` cells.
    pub input: PathBuf,

    /// Number of partitions to ask for. Defaults to the pool size.
    #[arg(short, long)]
    pub partitions: Option<usize>,

    #[arg(long, value_enum, default_value_t = Backend::Local)]
    pub backend: Backend,

    /// Pool size for the local backend. Under MPI the world size is used.
    #[arg(short, long, default_value_t = 4)]
    pub workers: usize,

    /// Write the initial and final boards here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    pub fn validate(&self) -> Result<()> {
        if self.partitions == Some(0) {
            return Err(LifeError::Config("--partitions must be at least 1".into()));
        }
        if self.backend == Backend::Local && self.workers == 0 {
            return Err(LifeError::Config("--workers must be at least 1".into()));
        }
        Ok(())
    }
}
