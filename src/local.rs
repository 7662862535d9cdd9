//! An in-process pool: one thread per rank, channels for messages and a
//! shared barrier for the collective.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::thread;

use tracing::trace;

use crate::comm::{Communicator, Envelope, Rank, Tag};
use crate::error::{LifeError, Result};

struct Delivery {
    source: Rank,
    tag: Tag,
    payload: Vec<u8>,
}

/// One rank's endpoint of a [`LocalPool`].
pub struct LocalComm {
    rank: Rank,
    outboxes: Vec<Sender<Delivery>>,
    inbox: Receiver<Delivery>,
    // Messages that arrived before anyone asked for them, oldest first.
    stash: RefCell<VecDeque<Delivery>>,
    barrier: Arc<Barrier>,
    barrier_calls: Cell<usize>,
}

impl LocalComm {
    /// Number of times this rank has entered the barrier.
    pub fn barrier_calls(&self) -> usize {
        self.barrier_calls.get()
    }

    fn take_stashed(&self, source: Rank, tag: Tag) -> Option<Vec<u8>> {
        let mut stash = self.stash.borrow_mut();
        let position = stash
            .iter()
            .position(|d| d.source == source && d.tag == tag)?;
        stash.remove(position).map(|d| d.payload)
    }

    fn receive_matching(&self, source: Rank, tag: Tag) -> Result<Vec<u8>> {
        if let Some(payload) = self.take_stashed(source, tag) {
            return Ok(payload);
        }
        loop {
            let delivery = self.inbox.recv().map_err(|_| {
                LifeError::Transport(format!("rank {} lost its inbox", self.rank))
            })?;
            if delivery.source == source && delivery.tag == tag {
                return Ok(delivery.payload);
            }
            self.stash.borrow_mut().push_back(delivery);
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn exchange(&self, sends: Vec<Envelope>, receives: &[(Rank, Tag)]) -> Result<Vec<Vec<u8>>> {
        for envelope in sends {
            let outbox = self.outboxes.get(envelope.dest).ok_or_else(|| {
                LifeError::Transport(format!(
                    "rank {} sent to rank {} in a pool of {}",
                    self.rank,
                    envelope.dest,
                    self.outboxes.len()
                ))
            })?;
            trace!(from = self.rank, to = envelope.dest, tag = envelope.tag.code(), bytes = envelope.payload.len(), "send");
            outbox
                .send(Delivery {
                    source: self.rank,
                    tag: envelope.tag,
                    payload: envelope.payload,
                })
                .map_err(|_| {
                    LifeError::Transport(format!("rank {} has shut down", envelope.dest))
                })?;
        }

        receives
            .iter()
            .map(|&(source, tag)| self.receive_matching(source, tag))
            .collect()
    }

    fn barrier(&self) {
        self.barrier_calls.set(self.barrier_calls.get() + 1);
        self.barrier.wait();
    }
}

/// A fixed-size pool of ranks living in this process.
pub struct LocalPool;

impl LocalPool {
    /// Build the endpoints of a pool of `size` ranks, ordered by rank.
    pub fn endpoints(size: usize) -> Vec<LocalComm> {
        let (outboxes, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel()).unzip();
        let barrier = Arc::new(Barrier::new(size));
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalComm {
                rank,
                outboxes: outboxes.clone(),
                inbox,
                stash: RefCell::new(VecDeque::new()),
                barrier: Arc::clone(&barrier),
                barrier_calls: Cell::new(0),
            })
            .collect()
    }

    /// Run `body` once per rank, each on its own thread, and collect the
    /// results in rank order.
    pub fn run<T, F>(size: usize, body: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(LocalComm) -> T + Sync,
    {
        if size == 0 {
            return Err(LifeError::Config("a pool needs at least one rank".into()));
        }
        let body = &body;
        thread::scope(|scope| {
            let handles: Vec<_> = Self::endpoints(size)
                .into_iter()
                .map(|comm| scope.spawn(move || body(comm)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle
                        .join()
                        .map_err(|_| LifeError::Transport(format!("rank {} panicked", rank)))
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Direction;

    #[test]
    fn receives_match_source_and_tag_out_of_order() {
        let results = LocalPool::run(3, |comm| match comm.rank() {
            0 => {
                comm.send_all(vec![
                    Envelope::new(2, Tag::Halo(Direction::East), vec![1]),
                    Envelope::new(2, Tag::Halo(Direction::West), vec![2]),
                ])
                .unwrap();
                Vec::new()
            }
            1 => {
                comm.send_all(vec![Envelope::new(2, Tag::Halo(Direction::West), vec![3])])
                    .unwrap();
                Vec::new()
            }
            _ => comm
                .exchange(
                    Vec::new(),
                    &[
                        (1, Tag::Halo(Direction::West)),
                        (0, Tag::Halo(Direction::West)),
                        (0, Tag::Halo(Direction::East)),
                    ],
                )
                .unwrap()
                .concat(),
        })
        .unwrap();
        assert_eq!(results[2], vec![3, 2, 1]);
    }

    #[test]
    fn same_source_and_tag_keeps_fifo_order() {
        let results = LocalPool::run(2, |comm| {
            if comm.rank() == 0 {
                let sends = (0..5u8)
                    .map(|i| Envelope::new(1, Tag::FinalGrid, vec![i]))
                    .collect();
                comm.send_all(sends).unwrap();
                Vec::new()
            } else {
                comm.send_all(vec![Envelope::new(1, Tag::Parameters, vec![9])]).unwrap();
                let first = comm.receive(0, Tag::FinalGrid).unwrap();
                let rest = comm
                    .exchange(Vec::new(), &[(0, Tag::FinalGrid); 4])
                    .unwrap();
                let mut all = first;
                all.extend(rest.concat());
                all.extend(comm.receive(1, Tag::Parameters).unwrap());
                all
            }
        })
        .unwrap();
        assert_eq!(results[1], vec![0, 1, 2, 3, 4, 9]);
    }

    #[test]
    fn mutual_sends_before_receives_do_not_deadlock() {
        let results = LocalPool::run(2, |comm| {
            let peer = 1 - comm.rank();
            let tag = Tag::Halo(Direction::North);
            comm.exchange(vec![Envelope::new(peer, tag, vec![comm.rank() as u8])], &[(peer, tag)])
                .unwrap()
                .concat()
        })
        .unwrap();
        assert_eq!(results, vec![vec![1], vec![0]]);
    }

    #[test]
    fn barrier_calls_are_counted() {
        let counts = LocalPool::run(4, |comm| {
            for _ in 0..3 {
                comm.barrier();
            }
            comm.barrier_calls()
        })
        .unwrap();
        assert_eq!(counts, vec![3; 4]);
    }

    #[test]
    fn sending_outside_the_pool_fails() {
        let results = LocalPool::run(1, |comm| {
            comm.send_all(vec![Envelope::new(5, Tag::Parameters, Vec::new())])
        })
        .unwrap();
        assert!(matches!(results[0], Err(LifeError::Transport(_))));
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(LocalPool::run(0, |comm| comm.rank()).is_err());
    }
}
