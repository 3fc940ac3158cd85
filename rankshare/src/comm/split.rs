use super::LocalComm;
use crate::collective;
use crate::error::{RankshareError, Result};
use crate::types::Rank;
use std::sync::Arc;

impl LocalComm {
    /// Split this communicator into sub-groups.
    ///
    /// All ranks must call `split` simultaneously. Ranks with the same `color`
    /// end up in the same sub-communicator. Within each group, ranks are
    /// ordered by `key` (ties broken by original rank).
    ///
    /// The child keeps the parent's fabric but sends under its own
    /// communicator id, so collectives on the child never interleave with
    /// traffic on the parent or on sibling groups.
    pub(crate) fn split_local(&self, color: u32, key: u32) -> Result<LocalComm> {
        // Exchange (color, key) as 8 bytes: [color: u32 LE][key: u32 LE].
        let mut my_info = Vec::with_capacity(8);
        my_info.extend_from_slice(&color.to_le_bytes());
        my_info.extend_from_slice(&key.to_le_bytes());
        let all_info = collective::ring_allgather(self, my_info)?;

        let mut group: Vec<(Rank, u32)> = Vec::new();
        for (r, info) in all_info.iter().enumerate() {
            let (c, k) = decode_color_key(info)?;
            if c == color {
                group.push((r as Rank, k));
            }
        }
        group.sort_by_key(|&(orig_rank, k)| (k, orig_rank));

        let new_rank = group
            .iter()
            .position(|&(r, _)| r == self.rank)
            .expect("rank must be in its own color group") as Rank;
        let members: Vec<Rank> = group
            .iter()
            .map(|&(r, _)| self.members[r as usize])
            .collect();

        let generation = self.split_generation.get();
        self.split_generation.set(generation + 1);
        let comm_id = derive_comm_id(self.comm_id, generation, color);

        tracing::debug!(
            parent = self.comm_id,
            comm_id,
            color,
            rank = new_rank,
            size = members.len(),
            "local communicator split"
        );

        Ok(LocalComm::from_parts(
            new_rank,
            comm_id,
            members,
            Arc::clone(&self.fabric),
        ))
    }
}

fn decode_color_key(info: &[u8]) -> Result<(u32, u32)> {
    if info.len() != 8 {
        return Err(RankshareError::DecodeFailed(format!(
            "split info: expected 8 bytes, got {}",
            info.len()
        )));
    }
    let c = u32::from_le_bytes([info[0], info[1], info[2], info[3]]);
    let k = u32::from_le_bytes([info[4], info[5], info[6], info[7]]);
    Ok((c, k))
}

/// Hash (parent id, generation, color) to a non-zero id. FNV-1a folded to u32;
/// 0 is reserved for the bootstrap communicator.
fn derive_comm_id(parent: u32, generation: u64, color: u32) -> u32 {
    let mut h: u64 = 0xcbf29ce484222325;
    let bytes = parent
        .to_le_bytes()
        .into_iter()
        .chain(generation.to_le_bytes())
        .chain(color.to_le_bytes());
    for b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    let id = ((h >> 32) ^ h) as u32;
    if id == 0 { 1 } else { id }
}
