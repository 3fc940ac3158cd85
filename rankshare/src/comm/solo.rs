use super::{CommHandle, Communicator, check_root};
use crate::error::Result;
use crate::types::{Rank, ReduceOp};
use std::rc::Rc;

/// A communicator of exactly one rank.
///
/// Used when no multi-process backend is available and as the degenerate side
/// of a group split. Collectives complete immediately and return their input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloComm;

impl SoloComm {
    pub fn new() -> Self {
        Self
    }

    /// A fresh solo communicator behind a handle.
    pub fn handle() -> CommHandle {
        Rc::new(Self)
    }
}

impl Communicator for SoloComm {
    fn rank(&self) -> Rank {
        0
    }

    fn size(&self) -> u32 {
        1
    }

    fn split(&self, _color: u32, _key: u32) -> Result<CommHandle> {
        Ok(Self::handle())
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn broadcast_bytes(&self, data: Vec<u8>, root: Rank) -> Result<Vec<u8>> {
        check_root(root, 1)?;
        Ok(data)
    }

    fn all_reduce(&self, value: f64, _op: ReduceOp) -> Result<f64> {
        Ok(value)
    }

    fn all_gather_bytes(&self, data: Vec<u8>) -> Result<Vec<Vec<u8>>> {
        Ok(vec![data])
    }

    fn backend(&self) -> &'static str {
        "solo"
    }
}
