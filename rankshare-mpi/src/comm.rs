use crate::error::{MpiBackendError, Result};
use crate::types::{to_mpi_int, to_mpi_op};
use mpi::environment::Universe;
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::{Communicator as _, CommunicatorCollectives as _, Root as _};
use rankshare::{CommHandle, Communicator, Rank, RankshareError, ReduceOp};
use std::rc::Rc;

/// [`Communicator`] over an MPI communicator.
///
/// Every communicator split from the world shares the world's
/// [`Universe`]; MPI is finalized when the last of them is dropped.
pub struct MpiComm {
    // Declared before `universe` so it is freed before MPI is finalized.
    comm: SimpleCommunicator,
    universe: Rc<Universe>,
}

impl MpiComm {
    /// Take ownership of an initialized universe and wrap its world
    /// communicator.
    pub fn world(universe: Universe) -> Self {
        let comm = universe.world();
        Self {
            comm,
            universe: Rc::new(universe),
        }
    }

    /// Initialize MPI and wrap the world communicator.
    pub fn init() -> Result<Self> {
        mpi::initialize()
            .map(Self::world)
            .ok_or(MpiBackendError::InitFailed)
    }

    /// Split into a concrete `MpiComm`. Collective over this communicator.
    pub fn split_mpi(&self, color: u32, key: u32) -> Result<MpiComm> {
        let mpi_color = to_mpi_int("color", color)?;
        let mpi_key = to_mpi_int("key", key)?;
        let comm = self
            .comm
            .split_by_color_with_key(Color::with_value(mpi_color), mpi_key)
            .ok_or(MpiBackendError::SplitFailed { color })?;
        tracing::debug!(
            color,
            rank = comm.rank(),
            size = comm.size(),
            "mpi communicator split"
        );
        Ok(MpiComm {
            comm,
            universe: Rc::clone(&self.universe),
        })
    }

    fn root_rank(&self, root: Rank) -> rankshare::Result<i32> {
        if root >= self.size() {
            return Err(RankshareError::InvalidRank {
                rank: root,
                size: self.size(),
            });
        }
        Ok(root as i32)
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> Rank {
        self.comm.rank() as Rank
    }

    fn size(&self) -> u32 {
        self.comm.size() as u32
    }

    fn split(&self, color: u32, key: u32) -> rankshare::Result<CommHandle> {
        Ok(Rc::new(self.split_mpi(color, key)?))
    }

    fn barrier(&self) -> rankshare::Result<()> {
        self.comm.barrier();
        Ok(())
    }

    fn broadcast_bytes(&self, data: Vec<u8>, root: Rank) -> rankshare::Result<Vec<u8>> {
        let root_process = self.comm.process_at_rank(self.root_rank(root)?);

        // Length first so receivers can size their buffers.
        let mut len = data.len() as u64;
        root_process.broadcast_into(&mut len);

        let mut buf = if self.rank() == root {
            data
        } else {
            vec![0u8; len as usize]
        };
        root_process.broadcast_into(&mut buf[..]);
        Ok(buf)
    }

    fn all_reduce(&self, value: f64, op: ReduceOp) -> rankshare::Result<f64> {
        let mut result = 0.0f64;
        self.comm.all_reduce_into(&value, &mut result, to_mpi_op(op));
        Ok(result)
    }

    fn all_gather_bytes(&self, data: Vec<u8>) -> rankshare::Result<Vec<Vec<u8>>> {
        let size = self.size() as usize;

        let mut lens = vec![0u64; size];
        self.comm.all_gather_into(&(data.len() as u64), &mut lens[..]);

        let width = lens.iter().copied().max().unwrap_or(0) as usize;
        if width == 0 {
            return Ok(vec![Vec::new(); size]);
        }

        // Pad every contribution to the widest, then trim each slot back.
        let mut padded = data;
        padded.resize(width, 0);
        let mut all = vec![0u8; width * size];
        self.comm.all_gather_into(&padded[..], &mut all[..]);

        Ok(all
            .chunks_exact(width)
            .zip(&lens)
            .map(|(chunk, &len)| chunk[..len as usize].to_vec())
            .collect())
    }

    fn processor_name(&self) -> String {
        match mpi::environment::processor_name() {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "MPI processor name is not valid UTF-8");
                std::env::var("HOSTNAME").unwrap_or_else(|_| "one".to_string())
            }
        }
    }

    fn backend(&self) -> &'static str {
        "mpi"
    }
}
