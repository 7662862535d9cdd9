//! The MPI substrate, one process per rank.
//!
//! Sends are started with `immediate_send_with_tag` inside a request scope,
//! receives block with `receive_vec_with_tag`, and the scope is only left
//! once every send has completed, so the send buffers can be dropped.

use mpi::topology::SystemCommunicator;
use mpi::traits::{
    Communicator as MpiCommunicator, CommunicatorCollectives, Destination, Source,
};
use tracing::trace;

use crate::comm::{Communicator, Envelope, Rank, Tag};
use crate::error::Result;

pub struct MpiComm {
    world: SystemCommunicator,
}

impl MpiComm {
    pub fn new(world: SystemCommunicator) -> Self {
        Self { world }
    }

    /// Tear down every process in the world. Used for fatal configuration
    /// errors found by rank 0, so that the other ranks do not wait forever.
    pub fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> Rank {
        self.world.rank() as Rank
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn exchange(&self, sends: Vec<Envelope>, receives: &[(Rank, Tag)]) -> Result<Vec<Vec<u8>>> {
        let world = &self.world;
        mpi::request::scope(|scope| {
            let requests: Vec<_> = sends
                .iter()
                .map(|envelope| {
                    trace!(to = envelope.dest, tag = envelope.tag.code(), bytes = envelope.payload.len(), "send");
                    world
                        .process_at_rank(envelope.dest as i32)
                        .immediate_send_with_tag(scope, &envelope.payload[..], envelope.tag.code())
                })
                .collect();

            let received = receives
                .iter()
                .map(|&(source, tag)| {
                    world
                        .process_at_rank(source as i32)
                        .receive_vec_with_tag::<u8>(tag.code())
                        .0
                })
                .collect();

            for request in requests {
                request.wait_without_status();
            }
            Ok(received)
        })
    }

    fn barrier(&self) {
        self.world.barrier();
    }
}
