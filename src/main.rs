//! Runs a board file across a pool of workers and prints the initial and
//! final boards.
//!
//! ```bash
//! # Four threads in this process
//! RUST_LOG=info cargo run -- input1 --workers 4
//!
//! # Eight MPI processes
//! cargo build --release --features mpi
//! mpirun -n 8 target/release/game_of_life_tiles --backend mpi input1
//! ```

use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use game_of_life_tiles::board_file::BoardFile;
use game_of_life_tiles::comm::Communicator;
use game_of_life_tiles::config::{Backend, Cli};
use game_of_life_tiles::coordinator::COORDINATOR;
use game_of_life_tiles::local::LocalPool;
use game_of_life_tiles::{run, Board, SimulationInput, SimulationOutcome};

fn main() -> Result<()> {
    // Default log level: INFO. Override with RUST_LOG=game_of_life_tiles=debug etc.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.validate()?;

    match cli.backend {
        Backend::Local => run_local(&cli),
        Backend::Mpi => run_mpi(&cli),
    }
}

fn load(cli: &Cli) -> Result<SimulationInput> {
    let file = BoardFile::read(&cli.input)
        .with_context(|| format!("could not load {}", cli.input.display()))?;
    Ok(SimulationInput {
        board: file.board,
        generations: file.generations,
        partitions: cli.partitions,
    })
}

fn run_local(cli: &Cli) -> Result<()> {
    let input = load(cli)?;
    let initial = input.board.clone();

    let results = LocalPool::run(cli.workers, |comm| {
        let input = if comm.rank() == COORDINATOR { Some(input.clone()) } else { None };
        run(&comm, input)
    })?;

    let mut outcome = None;
    for (rank, result) in results.into_iter().enumerate() {
        if let Some(finished) = result.with_context(|| format!("rank {} failed", rank))? {
            outcome = Some(finished);
        }
    }
    let outcome = outcome.context("the coordinator returned no board")?;
    report(cli, &initial, &outcome)
}

#[cfg(feature = "mpi")]
fn run_mpi(cli: &Cli) -> Result<()> {
    use game_of_life_tiles::mpi_comm::MpiComm;
    use tracing::error;

    let universe = mpi::initialize().context("MPI was already initialized")?;
    let comm = MpiComm::new(universe.world());

    // Only rank 0 reads the file. If that fails it takes the whole world
    // down, otherwise the other ranks would wait for their parameters forever.
    let input = if comm.rank() == COORDINATOR {
        match load(cli) {
            Ok(input) => Some(input),
            Err(e) => {
                error!("{:#}", e);
                comm.abort(1);
            }
        }
    } else {
        None
    };
    let initial = input.as_ref().map(|i| i.board.clone());

    match run(&comm, input) {
        Ok(Some(outcome)) => {
            let initial = initial.context("rank 0 lost its initial board")?;
            report(cli, &initial, &outcome)
        }
        Ok(None) => Ok(()),
        Err(e) => {
            error!(rank = comm.rank(), "{}", e);
            comm.abort(2);
        }
    }
}

#[cfg(not(feature = "mpi"))]
fn run_mpi(_cli: &Cli) -> Result<()> {
    anyhow::bail!("built without MPI support; rebuild with `--features mpi` and launch with mpirun")
}

fn report(cli: &Cli, initial: &Board, outcome: &SimulationOutcome) -> Result<()> {
    let mut text = String::new();
    writeln!(text, "Forcing {} partitions", outcome.layout.len())?;
    writeln!(text, "\nInitial board:")?;
    write!(text, "{}", initial)?;
    writeln!(
        text,
        "\nFinal board configuration after {} generations:",
        outcome.generations
    )?;
    write!(text, "{}", outcome.board)?;

    match &cli.output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("could not write {}", path.display()))?,
        None => print!("{}", text),
    }
    Ok(())
}
