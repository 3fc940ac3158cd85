use crate::comm::{CommHandle, SoloComm, same_comm};
use crate::config::RankshareConfig;
use crate::error::Result;
use crate::random::RandomSource;
use crate::share::LocalShare;
use crate::splitter::{SplitPair, split_for_jobs};
use std::cell::RefCell;
use std::rc::Rc;

/// Per-process coordination state: a stack of communicators.
///
/// The bottom entry is the base communicator the process started with and is
/// never popped. The top entry is the ambient communicator for nested
/// distributed operations. Pushes and pops must nest strictly.
///
/// Collectives block the calling thread. With a blocking backend such as
/// [`LocalComm`](crate::LocalComm), drive the context from a plain thread or
/// `spawn_blocking`, never directly inside an async task.
///
/// # Example
///
/// ```
/// use rankshare::ParallelContext;
///
/// # fn main() -> rankshare::Result<()> {
/// let ctx = ParallelContext::solo();
/// let tasks = vec![1, 2, 3];
/// let mut done = Vec::new();
/// for task in ctx.local_share(&tasks)? {
///     done.push(*task?);
/// }
/// assert_eq!(done, tasks);
/// assert_eq!(ctx.depth(), 1);
/// # Ok(())
/// # }
/// ```
pub struct ParallelContext {
    stack: RefCell<Vec<CommHandle>>,
    config: RankshareConfig,
}

impl ParallelContext {
    /// Start from `base` with the default configuration.
    pub fn new(base: CommHandle) -> Self {
        Self::with_config(base, RankshareConfig::default())
    }

    pub fn with_config(base: CommHandle, config: RankshareConfig) -> Self {
        tracing::info!(
            backend = base.backend(),
            rank = base.rank(),
            size = base.size(),
            "parallel context ready"
        );
        Self {
            stack: RefCell::new(vec![base]),
            config,
        }
    }

    /// Single-process context.
    pub fn solo() -> Self {
        Self::new(SoloComm::handle())
    }

    /// Single-process context configured from the environment.
    ///
    /// Multi-process backends live in their own crates and select themselves
    /// from the same configuration.
    pub fn from_env() -> Self {
        tracing::info!("not using a distributed backend");
        Self::with_config(SoloComm::handle(), RankshareConfig::from_env())
    }

    pub fn config(&self) -> &RankshareConfig {
        &self.config
    }

    /// Make `comm` the ambient communicator.
    pub fn push(&self, comm: CommHandle) {
        self.stack.borrow_mut().push(comm);
    }

    /// Remove and return the ambient communicator.
    ///
    /// # Panics
    /// If only the base communicator remains, or if `expected` is given and
    /// is not the communicator on top. The stack is left unchanged.
    pub fn pop(&self, expected: Option<&CommHandle>) -> CommHandle {
        let mut stack = self.stack.borrow_mut();
        assert!(stack.len() > 1, "cannot pop the base communicator");
        if let Some(expected) = expected {
            let top = &stack[stack.len() - 1];
            assert!(
                same_comm(top, expected),
                "communicator stack mismatch: top of stack is not the expected communicator"
            );
        }
        stack.pop().expect("stack holds more than the base")
    }

    /// The ambient communicator.
    pub fn current(&self) -> CommHandle {
        let stack = self.stack.borrow();
        Rc::clone(&stack[stack.len() - 1])
    }

    /// The communicator the process started with.
    pub fn base(&self) -> CommHandle {
        Rc::clone(&self.stack.borrow()[0])
    }

    /// Number of communicators on the stack, base included.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Give every rank of the ambient communicator rank 0's random state.
    ///
    /// Afterwards all members draw the same values. No-op for a single rank.
    pub fn sync_random<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<()> {
        let comm = self.current();
        if comm.size() > 1 {
            let state = comm.broadcast_bytes(rng.state(), 0)?;
            rng.set_state(&state)?;
        }
        Ok(())
    }

    /// Split the ambient communicator into groups for `job_count` jobs.
    ///
    /// # Panics
    /// If `job_count == 0`.
    pub fn split_for_jobs(&self, job_count: usize) -> Result<SplitPair> {
        split_for_jobs(job_count, &self.current())
    }

    /// Iterate over this rank's share of `items`.
    ///
    /// See [`LocalShare`]. Every rank of the ambient communicator must call
    /// this with the same number of items.
    pub fn local_share<'a, T>(&'a self, items: &'a [T]) -> Result<LocalShare<'a, T>> {
        LocalShare::open(self, items)
    }

    /// Whether this process should produce user-facing output: rank 0 of the
    /// base communicator.
    pub fn is_output_rank(&self) -> bool {
        self.stack.borrow()[0].rank() == 0
    }

    pub fn processor_name(&self) -> String {
        self.stack.borrow()[0].processor_name()
    }
}
