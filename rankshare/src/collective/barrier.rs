use super::helpers::{ceil_log2, collective_recv, collective_send};
use crate::comm::LocalComm;
use crate::error::{RankshareError, Result};
use crate::types::Rank;

/// Threshold: use two-phase barrier for small groups, dissemination for larger.
const DISSEMINATION_THRESHOLD: u32 = 5;

const TAG_BARRIER: u8 = 1;
const TAG_BARRIER_ACK: u8 = 2;

/// Barrier: blocks until all ranks reach this point.
///
/// - `two_phase_barrier` for size <= 4 (lower constant overhead)
/// - `dissemination_barrier` for size >= 5 (O(log N) rounds, no coordinator)
pub(crate) fn barrier(comm: &LocalComm) -> Result<()> {
    let size = comm.size;
    if size <= 1 {
        return Ok(());
    }

    if size < DISSEMINATION_THRESHOLD {
        two_phase_barrier(comm)
    } else {
        dissemination_barrier(comm)
    }
}

/// Two-phase barrier: all ranks report to rank 0, rank 0 releases everyone.
fn two_phase_barrier(comm: &LocalComm) -> Result<()> {
    let epoch = comm.next_barrier_epoch();

    if comm.rank == 0 {
        for r in 1..comm.size {
            expect_token(comm, r, TAG_BARRIER, epoch)?;
        }
        for r in 1..comm.size {
            collective_send(comm, r, encode_token(TAG_BARRIER_ACK, epoch), "barrier")?;
        }
    } else {
        collective_send(comm, 0, encode_token(TAG_BARRIER, epoch), "barrier")?;
        expect_token(comm, 0, TAG_BARRIER_ACK, epoch)?;
    }

    Ok(())
}

/// Dissemination barrier.
///
/// In round r, rank i sends to rank `(i + 2^r) % N` and receives from
/// rank `(i - 2^r + N) % N`. After `ceil(log2(N))` rounds, every rank
/// has transitively heard from every other rank.
fn dissemination_barrier(comm: &LocalComm) -> Result<()> {
    let epoch = comm.next_barrier_epoch();
    let rank = comm.rank;
    let size = comm.size;

    for round in 0..ceil_log2(size) {
        let distance = 1u32 << round;
        let send_to = (rank + distance) % size;
        let recv_from = (rank + size - distance) % size;

        collective_send(comm, send_to, encode_token(TAG_BARRIER, epoch), "barrier")?;
        expect_token(comm, recv_from, TAG_BARRIER, epoch)?;
    }

    Ok(())
}

fn encode_token(tag: u8, epoch: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    buf.push(tag);
    buf.extend_from_slice(&epoch.to_le_bytes());
    buf
}

fn expect_token(comm: &LocalComm, src: Rank, tag: u8, epoch: u64) -> Result<()> {
    let msg = collective_recv(comm, src, "barrier")?;
    let ok = msg.len() == 9
        && msg[0] == tag
        && msg[1..].try_into().map(u64::from_le_bytes).ok() == Some(epoch);
    if !ok {
        return Err(RankshareError::CollectiveFailed {
            operation: "barrier",
            rank: src,
            reason: format!("expected token {tag} (epoch {epoch}), got {} bytes", msg.len()),
        });
    }
    Ok(())
}
