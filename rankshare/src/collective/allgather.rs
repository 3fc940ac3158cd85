use super::helpers::{collective_recv, collective_send};
use crate::comm::LocalComm;
use crate::error::Result;

/// Ring allgather: each rank contributes one byte string, result is all
/// contributions in rank order. Contributions may differ in length.
///
/// Uses N-1 ring rounds where each rank forwards the latest received chunk
/// to its successor.
pub(crate) fn ring_allgather(comm: &LocalComm, data: Vec<u8>) -> Result<Vec<Vec<u8>>> {
    let size = comm.size as usize;
    let rank = comm.rank as usize;

    if size <= 1 {
        return Ok(vec![data]);
    }

    let mut slots: Vec<Vec<u8>> = vec![Vec::new(); size];
    slots[rank] = data;

    let next = ((rank + 1) % size) as u32;
    let prev = ((rank + size - 1) % size) as u32;

    for step in 0..(size - 1) {
        let send_idx = (rank + size - step) % size;
        let recv_idx = (rank + size - step - 1) % size;

        collective_send(comm, next, slots[send_idx].clone(), "allgather")?;
        slots[recv_idx] = collective_recv(comm, prev, "allgather")?;
    }

    Ok(slots)
}
