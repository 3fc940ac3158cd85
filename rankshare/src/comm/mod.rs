//! The communicator capability and its in-crate implementations.
//!
//! A communicator identifies a group of cooperating ranks. Every collective
//! (`split`, `barrier`, `broadcast_bytes`, `all_reduce`, `all_gather_bytes`)
//! must be called by all members in the same order; a member that skips one
//! leaves the others blocked.

mod local;
mod solo;
mod split;

pub use local::LocalComm;
pub use solo::SoloComm;

use crate::error::{RankshareError, Result};
use crate::types::{Rank, ReduceOp};
use std::rc::Rc;

/// Shared handle to a communicator.
///
/// Handles are owned by a single rank; identity is pointer identity, see
/// [`same_comm`].
pub type CommHandle = Rc<dyn Communicator>;

/// A group of ranks supporting collective operations.
pub trait Communicator {
    /// This rank within the group (0-indexed, `< size()`).
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn size(&self) -> u32;

    /// Partition the group by `color`.
    ///
    /// Ranks passing the same color end up in the same communicator, ordered
    /// by `key` (ties broken by the current rank).
    fn split(&self, color: u32, key: u32) -> Result<CommHandle>;

    /// Block until every member has entered the barrier.
    fn barrier(&self) -> Result<()>;

    /// Deliver `root`'s bytes to every member. The input of non-root ranks is
    /// ignored.
    fn broadcast_bytes(&self, data: Vec<u8>, root: Rank) -> Result<Vec<u8>>;

    /// Reduce one scalar per rank; every member receives the result.
    fn all_reduce(&self, value: f64, op: ReduceOp) -> Result<f64>;

    /// Collect one byte string per rank, in rank order, on every member.
    fn all_gather_bytes(&self, data: Vec<u8>) -> Result<Vec<Vec<u8>>>;

    /// Name of the host this rank runs on.
    fn processor_name(&self) -> String {
        std::env::var("HOSTNAME").unwrap_or_else(|_| "one".to_string())
    }

    /// Short backend label for diagnostics.
    fn backend(&self) -> &'static str;
}

impl dyn Communicator {
    /// Broadcast a single `u64` from `root`.
    pub fn broadcast_u64(&self, value: u64, root: Rank) -> Result<u64> {
        let bytes = self.broadcast_bytes(value.to_le_bytes().to_vec(), root)?;
        decode_u64(&bytes, "broadcast_u64")
    }

    /// Gather one `u64` per rank.
    pub fn all_gather_u64(&self, value: u64) -> Result<Vec<u64>> {
        self.all_gather_bytes(value.to_le_bytes().to_vec())?
            .iter()
            .map(|b| decode_u64(b, "all_gather_u64"))
            .collect()
    }

    /// Whether this rank is rank 0 of the group.
    pub fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// True if both handles refer to the same communicator object.
pub fn same_comm(a: &CommHandle, b: &CommHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Reject roots outside `[0, size)`.
pub(crate) fn check_root(root: Rank, size: u32) -> Result<()> {
    if root >= size {
        return Err(RankshareError::InvalidRank { rank: root, size });
    }
    Ok(())
}

fn decode_u64(bytes: &[u8], what: &str) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| RankshareError::DecodeFailed(format!("{what}: {} bytes", bytes.len())))?;
    Ok(u64::from_le_bytes(arr))
}
