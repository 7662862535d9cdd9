//! The message-passing substrate the simulation runs on.
//!
//! Everything the core needs from a pool of processes fits in three calls:
//! rank/size discovery, a batched exchange of tagged byte buffers, and a
//! collective barrier. [`crate::local::LocalComm`] implements it with
//! threads and channels, `MpiComm` (feature `mpi`) with MPI.

use crate::error::Result;
use crate::topology::Direction;

/// Position of a process in the pool.
pub type Rank = usize;

/// Message tags. Halo updates are tagged with the border of the *receiver*
/// they fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Halo(Direction),
    Parameters,
    Assignment,
    FinalGrid,
}

impl Tag {
    pub fn code(self) -> i32 {
        match self {
            Tag::Halo(direction) => direction.slot() as i32,
            Tag::Parameters => 8,
            Tag::Assignment => 9,
            Tag::FinalGrid => 10,
        }
    }
}

/// An outgoing message. The payload is owned by the envelope and released
/// once the send completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub dest: Rank,
    pub tag: Tag,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(dest: Rank, tag: Tag, payload: Vec<u8>) -> Self {
        Self { dest, tag, payload }
    }
}

pub trait Communicator {
    fn rank(&self) -> Rank;

    fn size(&self) -> usize;

    /// Dispatch every send without waiting for it, then block on each
    /// `(source, tag)` receive in order, then wait for the sends to
    /// complete. Returns the received payloads in the order requested.
    ///
    /// There is no timeout: a receive that is never matched blocks forever.
    fn exchange(&self, sends: Vec<Envelope>, receives: &[(Rank, Tag)]) -> Result<Vec<Vec<u8>>>;

    /// Wait until every rank in the pool has called `barrier`.
    fn barrier(&self);

    fn send_all(&self, sends: Vec<Envelope>) -> Result<()> {
        self.exchange(sends, &[]).map(|_| ())
    }

    fn receive(&self, source: Rank, tag: Tag) -> Result<Vec<u8>> {
        let mut received = self.exchange(Vec::new(), &[(source, tag)])?;
        Ok(received.pop().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_codes_are_distinct() {
        let mut codes: Vec<i32> = Direction::ALL.iter().map(|&d| Tag::Halo(d).code()).collect();
        codes.extend([Tag::Parameters.code(), Tag::Assignment.code(), Tag::FinalGrid.code()]);
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert_eq!(Tag::Halo(Direction::NorthWest).code(), 0);
        assert_eq!(Tag::Halo(Direction::SouthEast).code(), 7);
    }
}
