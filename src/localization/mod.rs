//! Direction-of-arrival estimation
//!
//! - [`SteeringTable`]: far-field phase factors for every direction, pair and bin
//! - [`SrpPhat`]: sliding cross-power window, PHAT whitening, grid scan
//! - [`DoaEstimate`]: the per-block result

pub mod estimate;
pub mod srp_phat;
pub mod steering;

pub use estimate::DoaEstimate;
pub use srp_phat::{SrpPhat, MIN_CROSS_POWER};
pub use steering::SteeringTable;
