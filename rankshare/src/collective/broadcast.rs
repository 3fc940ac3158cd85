use super::helpers::{collective_recv, collective_send};
use crate::comm::LocalComm;
use crate::error::Result;
use crate::types::Rank;

/// Threshold: use flat broadcast for small groups, tree broadcast for larger.
const TREE_BROADCAST_THRESHOLD: u32 = 4;

/// Broadcast `data` from `root`; returns root's bytes on every rank.
pub(crate) fn broadcast(comm: &LocalComm, data: Vec<u8>, root: Rank) -> Result<Vec<u8>> {
    if comm.size <= 1 {
        return Ok(data);
    }
    if comm.size < TREE_BROADCAST_THRESHOLD {
        flat_broadcast(comm, data, root)
    } else {
        tree_broadcast(comm, data, root)
    }
}

/// Flat broadcast: root sends to all other ranks directly.
fn flat_broadcast(comm: &LocalComm, data: Vec<u8>, root: Rank) -> Result<Vec<u8>> {
    if comm.rank == root {
        for r in (0..comm.size).filter(|&r| r != root) {
            collective_send(comm, r, data.clone(), "broadcast")?;
        }
        Ok(data)
    } else {
        collective_recv(comm, root, "broadcast")
    }
}

/// Binary-tree broadcast with ranks remapped so root is logical rank 0.
fn tree_broadcast(comm: &LocalComm, data: Vec<u8>, root: Rank) -> Result<Vec<u8>> {
    let size = comm.size;
    let logical = |r: Rank| -> Rank { (r + size - root) % size };
    let physical = |l: Rank| -> Rank { (l + root) % size };
    let my_logical = logical(comm.rank);

    let data = if my_logical == 0 {
        data
    } else {
        let parent = physical((my_logical - 1) / 2);
        collective_recv(comm, parent, "broadcast")?
    };

    for child in [2 * my_logical + 1, 2 * my_logical + 2] {
        if child < size {
            collective_send(comm, physical(child), data.clone(), "broadcast")?;
        }
    }

    Ok(data)
}
