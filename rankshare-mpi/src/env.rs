//! Backend selection for MPI-launched programs.

use crate::comm::MpiComm;
use rankshare::{Communicator, ParallelContext, RankshareConfig, SoloComm};
use std::rc::Rc;

/// Build a context for this process, configured from the environment.
///
/// See [`context_from_config`].
pub fn context_from_env() -> ParallelContext {
    context_from_config(RankshareConfig::from_env())
}

/// Build a context for this process.
///
/// Uses MPI unless `disable_distributed` is set. Falls back to the solo
/// backend when MPI cannot be initialized or the job has a single process;
/// the fallback is logged, never reported as an error.
pub fn context_from_config(config: RankshareConfig) -> ParallelContext {
    if config.disable_distributed {
        tracing::info!("distributed backend disabled; not using MPI");
        return ParallelContext::with_config(SoloComm::handle(), config);
    }

    match MpiComm::init() {
        Ok(world) if world.size() > 1 => {
            tracing::info!(
                rank = world.rank(),
                size = world.size(),
                "using MPI"
            );
            ParallelContext::with_config(Rc::new(world), config)
        }
        Ok(_) => {
            tracing::info!("single MPI process; not using MPI");
            ParallelContext::with_config(SoloComm::handle(), config)
        }
        Err(e) => {
            tracing::info!(error = %e, "not using MPI");
            ParallelContext::with_config(SoloComm::handle(), config)
        }
    }
}
