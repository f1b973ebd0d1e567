//! Declarative disk-layout planner.
//!
//! Given the desired storage layout of a node and the block devices
//! discovered on it, [`planner::plan`] produces a provisioning plan: partition
//! tables, RAID arrays, volume groups, filesystems, the config-drive scheme and
//! the image placement. The planner never touches a disk.

pub mod cli;
pub mod io;
pub mod planner;

pub use planner::{plan, plan_partitioning, validate};

/// Version of the planner.
pub const PARTPLAN_VERSION: &str = env!("CARGO_PKG_VERSION");
