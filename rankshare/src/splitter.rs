//! Derive group communicators sized to a number of independent jobs.
//!
//! Splitting once yields one group per job (up to the number of ranks);
//! splitting a group's communicator again yields nested groups, so a tree
//! of communicators can follow a tree of nested parallel loops.

use crate::comm::{CommHandle, SoloComm};
use crate::error::Result;
use std::rc::Rc;

/// Communicators produced by [`split_for_jobs`].
pub struct SplitPair {
    /// One rank from each group, at the same position within its group.
    /// Coordinates across groups.
    pub outer: CommHandle,
    /// Every rank of this rank's group. Coordinates within the group.
    pub inner: CommHandle,
    /// Number of groups, `min(job_count, size)`.
    pub group_count: u32,
    /// Group this rank belongs to, in `[0, group_count)`.
    pub group_index: u32,
}

impl std::fmt::Debug for SplitPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitPair")
            .field("outer_size", &self.outer.size())
            .field("inner_size", &self.inner.size())
            .field("group_count", &self.group_count)
            .field("group_index", &self.group_index)
            .finish()
    }
}

/// Partition `comm` into `min(job_count, comm.size())` groups.
///
/// Collective over `comm` when it has to split.
///
/// # Panics
/// If `job_count == 0`.
pub fn split_for_jobs(job_count: usize, comm: &CommHandle) -> Result<SplitPair> {
    assert!(job_count > 0, "job_count must be positive");

    let size = comm.size();
    let rank = comm.rank();
    let group_count = job_count.min(size as usize) as u32;

    let (outer, inner) = if group_count == 1 {
        (SoloComm::handle(), Rc::clone(comm))
    } else if group_count == size {
        (Rc::clone(comm), SoloComm::handle())
    } else {
        let outer = comm.split(rank / group_count, rank)?;
        let inner = comm.split(rank % group_count, rank)?;
        (outer, inner)
    };

    // Rows of the outer split hold consecutive ranks, so position in the row
    // is the group index in every case.
    let group_index = outer.rank();
    debug_assert!(group_index < group_count);

    tracing::debug!(
        jobs = job_count,
        size,
        rank,
        group_count,
        group_index,
        inner_size = inner.size(),
        "split communicator for jobs"
    );

    Ok(SplitPair {
        outer,
        inner,
        group_count,
        group_index,
    })
}
