use super::{CommHandle, Communicator, check_root};
use crate::collective;
use crate::error::{RankshareError, Result};
use crate::types::{Rank, ReduceOp};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Directed lane identity: (communicator, source world rank, destination world rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct LaneKey {
    comm_id: u32,
    src: Rank,
    dst: Rank,
}

struct Lane {
    /// Dropped when the source rank leaves, so the lane closes once drained.
    tx: Option<UnboundedSender<Vec<u8>>>,
    /// Taken by the destination rank on its first receive.
    rx: Option<UnboundedReceiver<Vec<u8>>>,
}

impl Lane {
    fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
        }
    }

    /// Lane from a source that already left: receivers see it closed.
    fn closed() -> Self {
        let (_, rx) = unbounded_channel();
        Self { tx: None, rx: Some(rx) }
    }
}

#[derive(Default)]
struct FabricState {
    lanes: HashMap<LaneKey, Lane>,
    /// (comm id, world rank) of every communicator member that was dropped.
    departed: HashSet<(u32, Rank)>,
}

/// Shared message fabric for all ranks of one in-process cluster.
///
/// Lanes are created lazily by whichever side touches them first and are FIFO,
/// so messages between two ranks on one communicator arrive in send order.
/// When a member leaves, lanes from it close after their buffered messages
/// and sends to it fail with `PeerDisconnected`.
#[derive(Default)]
pub(super) struct Fabric {
    state: Mutex<FabricState>,
}

impl Fabric {
    fn lock(&self) -> Result<MutexGuard<'_, FabricState>> {
        self.state
            .lock()
            .map_err(|_| RankshareError::LockPoisoned("fabric lanes"))
    }

    /// Enqueue on a lane. The returned `PeerDisconnected` carries the world rank.
    fn send(&self, key: LaneKey, data: Vec<u8>) -> Result<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let gone = RankshareError::PeerDisconnected { rank: key.dst };
        if state.departed.contains(&(key.comm_id, key.dst)) {
            return Err(gone);
        }
        match &state.lanes.entry(key).or_insert_with(Lane::new).tx {
            Some(tx) => tx.send(data).map_err(|_| gone),
            None => Err(gone),
        }
    }

    fn take_receiver(&self, key: LaneKey) -> Result<UnboundedReceiver<Vec<u8>>> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let src_gone = state.departed.contains(&(key.comm_id, key.src));
        state
            .lanes
            .entry(key)
            .or_insert_with(|| if src_gone { Lane::closed() } else { Lane::new() })
            .rx
            .take()
            .ok_or_else(|| {
                RankshareError::backend(format!(
                    "lane {}->{} on comm {:#x} already claimed",
                    key.src, key.dst, key.comm_id
                ))
            })
    }

    /// Mark `rank` as gone from `comm_id`: drop every lane delivering to it
    /// and close every lane leaving it.
    fn release(&self, comm_id: u32, rank: Rank) {
        let Ok(mut guard) = self.state.lock() else {
            return;
        };
        let state = &mut *guard;
        state.departed.insert((comm_id, rank));
        state.lanes.retain(|k, lane| {
            if k.comm_id != comm_id {
                return true;
            }
            if k.dst == rank {
                return false;
            }
            if k.src == rank {
                lane.tx = None;
                // An unclaimed receiver still holds buffered messages.
                return lane.rx.is_some();
            }
            true
        });
    }
}

/// In-process communicator: every rank is a thread of the same process.
///
/// Create a cluster with [`LocalComm::bootstrap`] and move one communicator
/// into each rank's thread. Collectives are built from point-to-point
/// messages over the shared fabric; `split` derives child communicators that
/// keep using the same fabric under a fresh communicator id.
///
/// Receives block the calling thread, and doing so inside an async task
/// panics. Call collectives from a plain thread or `spawn_blocking`.
/// Dropping a member makes its peers' pending and later exchanges with it
/// fail with `PeerDisconnected`.
pub struct LocalComm {
    pub(crate) rank: Rank,
    pub(crate) size: u32,
    /// Communicator id. 0 = the bootstrap (world) communicator.
    pub(super) comm_id: u32,
    /// World rank of every member, indexed by rank within this communicator.
    pub(super) members: Vec<Rank>,
    pub(super) fabric: Arc<Fabric>,
    /// Receivers claimed so far, keyed by source rank within this communicator.
    inbox: RefCell<HashMap<Rank, UnboundedReceiver<Vec<u8>>>>,
    barrier_epoch: Cell<u64>,
    /// All members advance this in lockstep because `split` is collective.
    pub(super) split_generation: Cell<u64>,
}

impl LocalComm {
    /// Build `world_size` connected communicators, one per rank.
    pub fn bootstrap(world_size: u32) -> Vec<LocalComm> {
        let fabric = Arc::new(Fabric::default());
        let members: Vec<Rank> = (0..world_size).collect();
        (0..world_size)
            .map(|rank| Self::from_parts(rank, 0, members.clone(), Arc::clone(&fabric)))
            .collect()
    }

    pub(super) fn from_parts(
        rank: Rank,
        comm_id: u32,
        members: Vec<Rank>,
        fabric: Arc<Fabric>,
    ) -> Self {
        Self {
            rank,
            size: members.len() as u32,
            comm_id,
            members,
            fabric,
            inbox: RefCell::new(HashMap::new()),
            barrier_epoch: Cell::new(0),
            split_generation: Cell::new(0),
        }
    }

    /// World rank (rank in the bootstrap communicator) of this member.
    pub fn world_rank(&self) -> Rank {
        self.members[self.rank as usize]
    }

    /// Next barrier epoch (per-communicator counter).
    pub(crate) fn next_barrier_epoch(&self) -> u64 {
        let epoch = self.barrier_epoch.get();
        self.barrier_epoch.set(epoch + 1);
        epoch
    }

    /// Send bytes to `dest` (rank within this communicator). Never blocks.
    pub(crate) fn send_bytes(&self, dest: Rank, data: Vec<u8>) -> Result<()> {
        self.check_peer(dest)?;
        self.fabric
            .send(self.lane(self.rank, dest), data)
            .map_err(|e| match e {
                RankshareError::PeerDisconnected { .. } => {
                    RankshareError::PeerDisconnected { rank: dest }
                }
                other => other,
            })
    }

    /// Receive the next message from `src`, blocking until one arrives.
    pub(crate) fn recv_bytes(&self, src: Rank) -> Result<Vec<u8>> {
        self.check_peer(src)?;
        let mut inbox = self.inbox.borrow_mut();
        let rx = match inbox.entry(src) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(self.fabric.take_receiver(self.lane(src, self.rank))?),
        };
        rx.blocking_recv()
            .ok_or(RankshareError::PeerDisconnected { rank: src })
    }

    fn lane(&self, src: Rank, dst: Rank) -> LaneKey {
        LaneKey {
            comm_id: self.comm_id,
            src: self.members[src as usize],
            dst: self.members[dst as usize],
        }
    }

    fn check_peer(&self, peer: Rank) -> Result<()> {
        check_root(peer, self.size)?;
        if peer == self.rank {
            return Err(RankshareError::InvalidRank {
                rank: peer,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl Drop for LocalComm {
    fn drop(&mut self) {
        self.fabric.release(self.comm_id, self.world_rank());
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn split(&self, color: u32, key: u32) -> Result<CommHandle> {
        Ok(Rc::new(self.split_local(color, key)?))
    }

    fn barrier(&self) -> Result<()> {
        collective::barrier(self)
    }

    fn broadcast_bytes(&self, data: Vec<u8>, root: Rank) -> Result<Vec<u8>> {
        check_root(root, self.size)?;
        collective::broadcast(self, data, root)
    }

    fn all_reduce(&self, value: f64, op: ReduceOp) -> Result<f64> {
        let gathered = collective::ring_allgather(self, value.to_le_bytes().to_vec())?;
        let values = gathered
            .iter()
            .map(|b| {
                let arr: [u8; 8] = b.as_slice().try_into().map_err(|_| {
                    RankshareError::DecodeFailed(format!("all_reduce operand: {} bytes", b.len()))
                })?;
                Ok(f64::from_le_bytes(arr))
            })
            .collect::<Result<Vec<f64>>>()?;
        op.fold(&values)
            .ok_or_else(|| RankshareError::DecodeFailed("all_reduce over empty group".into()))
    }

    fn all_gather_bytes(&self, data: Vec<u8>) -> Result<Vec<Vec<u8>>> {
        collective::ring_allgather(self, data)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
