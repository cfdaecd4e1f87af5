//! pass@k estimation over per-task tallies

mod pass_at_k;
mod tally;

pub use pass_at_k::{PassAtK, PassAtKReport, estimate_pass_at_k, mean_pass_at_k};
pub use tally::{TaskTally, tally_by_task};
