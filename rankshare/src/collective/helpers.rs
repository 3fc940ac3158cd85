use crate::comm::LocalComm;
use crate::error::{RankshareError, Result};
use crate::types::Rank;

/// Integer ceiling of log2(n). Returns 0 for n <= 1.
pub(crate) fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        return 0;
    }
    u32::BITS - (n - 1).leading_zeros()
}

/// Send bytes to a peer, wrapping errors as `CollectiveFailed`.
pub(crate) fn collective_send(
    comm: &LocalComm,
    dest: Rank,
    data: Vec<u8>,
    operation: &'static str,
) -> Result<()> {
    comm.send_bytes(dest, data)
        .map_err(|e| RankshareError::CollectiveFailed {
            operation,
            rank: dest,
            reason: e.to_string(),
        })
}

/// Receive bytes from a peer, wrapping errors as `CollectiveFailed`.
pub(crate) fn collective_recv(
    comm: &LocalComm,
    src: Rank,
    operation: &'static str,
) -> Result<Vec<u8>> {
    comm.recv_bytes(src)
        .map_err(|e| RankshareError::CollectiveFailed {
            operation,
            rank: src,
            reason: e.to_string(),
        })
}
