//! MPI backend for rankshare.
//!
//! Launch the program under `mpiexec` and build the context with
//! [`context_from_env`]. Without a launcher, or with a single process, the
//! context falls back to the solo backend.

pub mod comm;
pub mod env;
pub mod error;
pub mod types;

pub use comm::MpiComm;
pub use env::{context_from_config, context_from_env};
pub use error::{MpiBackendError, Result};
pub use types::to_mpi_op;
