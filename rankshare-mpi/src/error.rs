use rankshare::RankshareError;

pub type Result<T> = std::result::Result<T, MpiBackendError>;

#[derive(Debug, thiserror::Error)]
pub enum MpiBackendError {
    #[error("MPI initialization failed: already initialized or no MPI runtime")]
    InitFailed,

    #[error("{what} {value} does not fit an MPI int")]
    OutOfRange { what: &'static str, value: u32 },

    #[error("MPI split returned no communicator for color {color}")]
    SplitFailed { color: u32 },

    #[error("rankshare error: {0}")]
    Core(#[from] RankshareError),
}

impl From<MpiBackendError> for RankshareError {
    fn from(e: MpiBackendError) -> Self {
        match e {
            MpiBackendError::Core(inner) => inner,
            other => RankshareError::backend_with_source("mpi", other),
        }
    }
}
