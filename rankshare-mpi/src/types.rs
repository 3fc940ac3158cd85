use mpi::collective::SystemOperation;
use rankshare::ReduceOp;

/// Map a rankshare reduction to the matching predefined MPI operation.
pub fn to_mpi_op(op: ReduceOp) -> SystemOperation {
    match op {
        ReduceOp::Sum => SystemOperation::sum(),
        ReduceOp::Prod => SystemOperation::product(),
        ReduceOp::Min => SystemOperation::min(),
        ReduceOp::Max => SystemOperation::max(),
    }
}

/// Convert a non-negative value to an MPI `int`.
pub(crate) fn to_mpi_int(what: &'static str, value: u32) -> crate::Result<i32> {
    i32::try_from(value).map_err(|_| crate::MpiBackendError::OutOfRange { what, value })
}
