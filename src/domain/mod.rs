//! Domain module
//!
//! Core domain types and business logic.

pub mod context;
pub mod error;
pub mod guard;
pub mod role;
pub mod vote;

pub use context::RequestContext;
pub use error::DomainError;
pub use guard::is_full;
pub use role::{GroupRole, SkillLevel};
pub use vote::VoteValue;
