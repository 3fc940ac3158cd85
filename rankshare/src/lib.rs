pub(crate) mod collective;
pub mod comm;
pub mod config;
pub mod context;
pub mod error;
pub mod random;
pub mod share;
pub mod splitter;
pub mod types;

pub use comm::{CommHandle, Communicator, LocalComm, SoloComm, same_comm};
pub use config::RankshareConfig;
pub use context::ParallelContext;
pub use error::{RankshareError, Result};
pub use random::{ChaChaSource, PhasedRandom, RandomSource};
pub use share::LocalShare;
pub use splitter::{SplitPair, split_for_jobs};
pub use types::{Rank, ReduceOp};
