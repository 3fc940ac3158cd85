//! Collective algorithms for [`LocalComm`](crate::comm::LocalComm), built on
//! its point-to-point lanes.

mod allgather;
mod barrier;
mod broadcast;
mod helpers;

pub(crate) use allgather::ring_allgather;
pub(crate) use barrier::barrier;
pub(crate) use broadcast::broadcast;
