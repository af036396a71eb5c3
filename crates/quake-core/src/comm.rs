//! Message passing between ranks.
//!
//! A run needs exactly two collective operations: a barrier before the
//! shared output directory is prepared, and a gather of every rank's report
//! to the root once computation is done. Ranks share no mutable data;
//! reports move by value.
//!
//! [`SingleRank`] is the degenerate transport used when no parallelism is
//! requested. [`ChannelCommunicator`] runs each rank on its own thread with
//! one point-to-point channel into the root.

use std::sync::{Arc, Barrier};

use crossbeam_channel::{Receiver, Sender};

use crate::output::PartialOutput;

/// Errors raised by the transport.
#[derive(Debug, thiserror::Error)]
pub enum CommError {
    /// The root stopped hearing from ranks before every report arrived.
    #[error("rank channel disconnected after {received} of {expected} reports")]
    Disconnected {
        /// Reports received before the disconnect.
        received: usize,
        /// Reports expected.
        expected: usize,
    },

    /// The root could not be reached.
    #[error("rank {rank} could not reach the root")]
    RootUnreachable {
        /// The sending rank.
        rank: usize,
    },

    /// Two reports claimed the same rank, or a rank was out of range.
    #[error("unexpected report from rank {rank}")]
    UnexpectedRank {
        /// The offending rank.
        rank: usize,
    },
}

/// What a rank sends to the root when it is done.
#[derive(Debug)]
pub struct RankReport {
    /// Sending rank.
    pub rank: usize,
    /// The rank's partial output, or why it failed.
    pub outcome: Result<PartialOutput, String>,
}

impl RankReport {
    /// Whether the rank produced a result.
    pub const fn produced(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Collective operations available to a rank.
pub trait Communicator: Send {
    /// This rank's index.
    fn rank(&self) -> usize;

    /// Number of ranks.
    fn size(&self) -> usize;

    /// Block until every rank has reached the barrier.
    fn barrier(&self);

    /// Send this rank's report to the root.
    ///
    /// The root receives every report, sorted by rank; other ranks get `None`.
    fn gather(&self, report: RankReport) -> Result<Option<Vec<RankReport>>, CommError>;
}

/// The only rank of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleRank;

impl Communicator for SingleRank {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn gather(&self, report: RankReport) -> Result<Option<Vec<RankReport>>, CommError> {
        Ok(Some(vec![report]))
    }
}

/// One rank of a thread-per-rank group connected by channels.
#[derive(Debug)]
pub struct ChannelCommunicator {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
    link: Link,
}

/// The root listens; every other rank holds a sender into the root.
#[derive(Debug)]
enum Link {
    Root(Receiver<RankReport>),
    Leaf(Sender<RankReport>),
}

impl ChannelCommunicator {
    /// Create a connected group of `size` ranks, in rank order.
    pub fn group(size: usize) -> Vec<Self> {
        let size = size.max(1);
        let barrier = Arc::new(Barrier::new(size));
        let (to_root, inbox) = crossbeam_channel::unbounded();
        let mut group = Vec::with_capacity(size);
        group.push(Self {
            rank: 0,
            size,
            barrier: Arc::clone(&barrier),
            link: Link::Root(inbox),
        });
        group.extend((1..size).map(|rank| Self {
            rank,
            size,
            barrier: Arc::clone(&barrier),
            link: Link::Leaf(to_root.clone()),
        }));
        group
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn gather(&self, report: RankReport) -> Result<Option<Vec<RankReport>>, CommError> {
        let inbox = match &self.link {
            Link::Root(inbox) => inbox,
            Link::Leaf(to_root) => {
                to_root
                    .send(report)
                    .map_err(|_send_err| CommError::RootUnreachable { rank: self.rank })?;
                return Ok(None);
            }
        };

        let mut slots: Vec<Option<RankReport>> = (0..self.size).map(|_| None).collect();
        slots[0] = Some(report);
        for received in 1..self.size {
            let incoming = inbox.recv().map_err(|_recv_err| CommError::Disconnected {
                received,
                expected: self.size,
            })?;
            let rank = incoming.rank;
            match slots.get_mut(rank) {
                Some(slot @ None) if rank != 0 => *slot = Some(incoming),
                _ => return Err(CommError::UnexpectedRank { rank }),
            }
        }
        Ok(Some(slots.into_iter().flatten().collect()))
    }
}
