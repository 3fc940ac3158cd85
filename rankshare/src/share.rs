//! Striped iteration over a shared list of jobs.
//!
//! Every rank of the ambient communicator holds the same ordered list. The
//! ranks are split into groups (see [`split_for_jobs`]); group `g` of `G`
//! visits items `g, g + G, g + 2G, ...` and every rank of a group visits the
//! same items. While the share is open, the group's communicator is the
//! ambient one, so nested distributed work inside the loop body runs within
//! the group.

use crate::comm::CommHandle;
use crate::context::ParallelContext;
use crate::error::Result;
use crate::splitter::{SplitPair, split_for_jobs};
use std::iter::FusedIterator;
use std::rc::Rc;

/// This rank's share of a job list. Created by
/// [`ParallelContext::local_share`].
///
/// Each advance is a barrier over the group, so members of a group step
/// through their items in lockstep. Closing the share runs a barrier over the
/// group, then over the cross-group communicator, then restores the ambient
/// communicator. Closing happens exactly once: through [`finish`](Self::finish),
/// or on drop however the loop ended (exhaustion, `break`, `?`, or a panic).
///
/// A drop-time close cannot report errors; they are logged instead. Call
/// `finish` to observe them.
pub struct LocalShare<'a, T> {
    ctx: &'a ParallelContext,
    items: &'a [T],
    outer: CommHandle,
    inner: CommHandle,
    group_index: u32,
    group_count: u32,
    cursor: usize,
    exhausted: bool,
    closed: bool,
}

impl<'a, T> LocalShare<'a, T> {
    pub(crate) fn open(ctx: &'a ParallelContext, items: &'a [T]) -> Result<Self> {
        let current = ctx.current();
        if items.len() < current.size() as usize && !ctx.config().forgive_idle_ranks {
            tracing::warn!(
                jobs = items.len(),
                size = current.size(),
                "fewer jobs than ranks; some ranks will only duplicate work"
            );
        }

        // An empty list still splits so every rank takes part in the same
        // collectives and the close barriers.
        let SplitPair {
            outer,
            inner,
            group_count,
            group_index,
        } = split_for_jobs(items.len().max(1), &current)?;
        ctx.push(Rc::clone(&inner));

        Ok(Self {
            ctx,
            items,
            outer,
            inner,
            group_index,
            group_count,
            cursor: group_index as usize,
            exhausted: false,
            closed: false,
        })
    }

    /// Group this rank works for.
    pub fn group_index(&self) -> u32 {
        self.group_index
    }

    pub fn group_count(&self) -> u32 {
        self.group_count
    }

    /// Communicator over this rank's group; the ambient one while open.
    pub fn inner(&self) -> &CommHandle {
        &self.inner
    }

    /// Communicator linking one rank of each group.
    pub fn outer(&self) -> &CommHandle {
        &self.outer
    }

    /// Close the share and report any synchronization failure.
    pub fn finish(mut self) -> Result<()> {
        self.close()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Both barriers always run so peers are not left waiting.
        let inner = self.inner.barrier();
        let outer = self.outer.barrier();
        self.ctx.pop(Some(&self.inner));

        tracing::trace!(group = self.group_index, "closed local share");
        inner.and(outer)
    }

    fn remaining(&self) -> usize {
        if self.exhausted || self.cursor >= self.items.len() {
            return 0;
        }
        let stride = self.group_count as usize;
        (self.items.len() - self.cursor).div_ceil(stride)
    }
}

impl<'a, T> Iterator for LocalShare<'a, T> {
    type Item = Result<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        if let Err(e) = self.inner.barrier() {
            self.exhausted = true;
            return Some(Err(e));
        }
        match self.items.get(self.cursor) {
            Some(item) => {
                self.cursor += self.group_count as usize;
                Some(Ok(item))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        // A failed barrier can add one error item.
        let upper = if self.exhausted { 0 } else { n + 1 };
        (0, Some(upper))
    }
}

impl<T> FusedIterator for LocalShare<'_, T> {}

impl<T> Drop for LocalShare<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(group = self.group_index, error = %e, "closing local share failed");
        }
    }
}
