//! Mutation handlers
//!
//! One handler per aggregate/ledger pair. Each handler executes a mutation
//! as a single transaction: lock the parent row, run the guards, write the
//! ledger row and adjust the counter together.

mod attendance;
mod commands;
mod contributions;
mod membership;
mod votes;

#[cfg(test)]
mod tests;

pub use attendance::AttendanceHandler;
pub use commands::*;
pub use contributions::{ContributeOutcome, ContributionHandler};
pub use membership::MembershipHandler;
pub use votes::VoteHandler;
