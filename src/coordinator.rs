//! Drives a run across the pool.
//!
//! Rank 0 is the coordinator: it owns the board, decomposes it, ships each
//! active worker its assignment, works partition 0 itself and gathers the
//! result. Ranks below the active partition count are workers; the rest are
//! idle and only attend barriers.
//!
//! ```text
//! INIT -> DISTRIBUTE -> (SEND -> RECV -> COMPUTE -> BARRIER)* -> GATHER -> DONE
//! ```

use tracing::{debug, info};

use crate::comm::{Communicator, Envelope, Rank, Tag};
use crate::error::{LifeError, Result};
use crate::geometry::{Partition, PartitionLayout};
use crate::grid::{Board, DoubleBuffer, LocalGrid};
use crate::halo::HaloExchange;
use crate::topology::NeighborList;
use crate::wire::{self, Assignment, RunParameters};

pub const COORDINATOR: Rank = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker,
    Idle,
}

impl Role {
    pub fn of(rank: Rank, active_workers: usize) -> Role {
        if rank == COORDINATOR {
            Role::Coordinator
        } else if rank < active_workers {
            Role::Worker
        } else {
            Role::Idle
        }
    }
}

/// What rank 0 is handed to start a run.
#[derive(Debug, Clone)]
pub struct SimulationInput {
    pub board: Board,
    pub generations: u32,
    /// Requested partition count; the pool size when `None`.
    pub partitions: Option<usize>,
}

/// What rank 0 holds once the run is over.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub board: Board,
    pub layout: PartitionLayout,
    pub generations: u32,
}

/// State only the coordinator has.
struct CoordinatorContext {
    board: Board,
    layout: PartitionLayout,
    generations: u32,
}

/// State of one active partition.
struct WorkerContext {
    index: usize,
    partition: Partition,
    neighbors: NeighborList,
    buffers: DoubleBuffer,
}

impl WorkerContext {
    /// Rejects a grid whose shape does not match its partition.
    fn from_assignment(index: usize, assignment: Assignment) -> Result<Self> {
        let Assignment {
            partition,
            neighbors,
            mut grid,
            ..
        } = assignment;
        if !grid.fits(&partition) {
            return Err(LifeError::Protocol {
                rank: COORDINATOR,
                reason: format!(
                    "sent a {}x{} grid for a {}x{} partition",
                    grid.length_x(),
                    grid.length_y(),
                    partition.length_x,
                    partition.length_y
                ),
            });
        }
        grid.normalize();
        Ok(Self {
            index,
            partition,
            neighbors,
            buffers: DoubleBuffer::new(grid),
        })
    }
}

/// Run as rank 0. Blocks until every rank has finished the generation loop.
pub fn run_coordinator<C: Communicator>(comm: &C, input: SimulationInput) -> Result<SimulationOutcome> {
    let context = distribute(comm, input)?;
    let worker = local_assignment(&context);
    let active_workers = context.layout.len();

    let final_grid = generation_loop(comm, Some(worker), context.generations, active_workers)?;
    gather(comm, context, final_grid)
}

/// Run as any rank other than 0.
pub fn run_member<C: Communicator>(comm: &C) -> Result<()> {
    let rank = comm.rank();
    let data = comm.receive(COORDINATOR, Tag::Parameters)?;
    let params: RunParameters = wire::decode("run parameters", COORDINATOR, &data)?;

    let worker = match Role::of(rank, params.active_workers) {
        Role::Worker => {
            let data = comm.receive(COORDINATOR, Tag::Assignment)?;
            let assignment: Assignment = wire::decode("assignment", COORDINATOR, &data)?;
            debug!(rank, partition = ?assignment.partition, "assignment received");
            Some(WorkerContext::from_assignment(rank, assignment)?)
        }
        _ => {
            debug!(rank, "idle for this run");
            None
        }
    };

    if let Some(grid) = generation_loop(comm, worker, params.generations, params.active_workers)? {
        let payload = wire::encode("final grid", &grid)?;
        comm.send_all(vec![Envelope::new(COORDINATOR, Tag::FinalGrid, payload)])?;
    }
    Ok(())
}

/// Dispatch on this process's rank. Rank 0 must be handed the input.
pub fn run<C: Communicator>(comm: &C, input: Option<SimulationInput>) -> Result<Option<SimulationOutcome>> {
    if comm.rank() == COORDINATOR {
        let input = input.ok_or_else(|| {
            LifeError::Config("the coordinator needs a board to distribute".into())
        })?;
        run_coordinator(comm, input).map(Some)
    } else {
        run_member(comm).map(|()| None)
    }
}

fn distribute<C: Communicator>(comm: &C, input: SimulationInput) -> Result<CoordinatorContext> {
    let pool_size = comm.size();
    let requested = input.partitions.unwrap_or(pool_size).min(pool_size);
    let layout = PartitionLayout::generate(input.board.width(), input.board.height(), requested)?;

    info!(
        "Forcing {} partitions ({}x{}) over {} processes",
        layout.len(),
        layout.divisions().x,
        layout.divisions().y,
        pool_size
    );

    let params = RunParameters {
        generations: input.generations,
        active_workers: layout.len(),
    };
    let params_payload = wire::encode("run parameters", &params)?;

    let mut sends = Vec::with_capacity(pool_size + layout.len());
    for rank in 1..pool_size {
        sends.push(Envelope::new(rank, Tag::Parameters, params_payload.clone()));
    }
    for (index, partition) in layout.partitions().iter().enumerate().skip(1) {
        let assignment = Assignment {
            partition: *partition,
            neighbors: layout.neighbors(index),
            generations: input.generations,
            grid: input.board.padded_slice(partition),
        };
        sends.push(Envelope::new(index, Tag::Assignment, wire::encode("assignment", &assignment)?));
    }
    comm.send_all(sends)?;

    Ok(CoordinatorContext {
        board: input.board,
        layout,
        generations: input.generations,
    })
}

/// The coordinator works partition 0 without messaging itself.
fn local_assignment(context: &CoordinatorContext) -> WorkerContext {
    let partition = context.layout.partitions()[0];
    WorkerContext {
        index: 0,
        partition,
        neighbors: context.layout.neighbors(0),
        buffers: DoubleBuffer::new(context.board.padded_slice(&partition)),
    }
}

/// The barrier schedule every rank follows: one before the loop, one per
/// generation and one after, whether or not the rank has work.
fn generation_loop<C: Communicator>(
    comm: &C,
    mut worker: Option<WorkerContext>,
    generations: u32,
    active_workers: usize,
) -> Result<Option<LocalGrid>> {
    let halo = worker.as_ref().map(|w| HaloExchange::new(comm, w.neighbors));
    comm.barrier();

    for generation in 0..generations {
        if let (Some(worker), Some(halo)) = (worker.as_mut(), halo.as_ref()) {
            halo.exchange(worker.buffers.current_mut())?;
            worker.buffers.step();
            if comm.rank() == COORDINATOR {
                debug!(generation, active_workers, "generation computed");
            }
        }
        comm.barrier();
    }

    comm.barrier();

    Ok(worker.map(|w| {
        debug!(
            partition = w.index,
            start_x = w.partition.start_x,
            start_y = w.partition.start_y,
            cells = w.partition.cell_count(),
            population = w.buffers.current().interior_population(),
            "generation loop finished"
        );
        w.buffers.into_current()
    }))
}

fn gather<C: Communicator>(
    comm: &C,
    mut context: CoordinatorContext,
    own_grid: Option<LocalGrid>,
) -> Result<SimulationOutcome> {
    let own_grid = own_grid.ok_or_else(|| {
        LifeError::Protocol {
            rank: COORDINATOR,
            reason: "the coordinator finished without its own partition".into(),
        }
    })?;
    let first = context.layout.partitions()[0];
    context.board.paste_interior(&first, &own_grid);

    let expected: Vec<(Rank, Tag)> = (1..context.layout.len())
        .map(|rank| (rank, Tag::FinalGrid))
        .collect();
    let received = comm.exchange(Vec::new(), &expected)?;

    for ((rank, _), data) in expected.into_iter().zip(received) {
        let grid: LocalGrid = wire::decode("final grid", rank, &data)?;
        let partition = context.layout.partitions()[rank];
        debug_assert_eq!(
            context.layout.owner_of(partition.start_x, partition.start_y),
            Some(rank),
            "partition {} does not own its own origin",
            rank
        );
        if !grid.fits(&partition) {
            return Err(LifeError::Protocol {
                rank,
                reason: format!(
                    "returned a {}x{} grid for a {}x{} partition",
                    grid.length_x(),
                    grid.length_y(),
                    partition.length_x,
                    partition.length_y
                ),
            });
        }
        context.board.paste_interior(&partition, &grid);
    }

    info!(
        generations = context.generations,
        population = context.board.population(),
        "board gathered"
    );

    Ok(SimulationOutcome {
        board: context.board,
        layout: context.layout,
        generations: context.generations,
    })
}
