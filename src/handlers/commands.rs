//! Command definitions
//!
//! Commands represent intentions to mutate an aggregate/ledger pair.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command to join a community group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGroupCommand {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

impl JoinGroupCommand {
    pub fn new(group_id: Uuid, user_id: Uuid) -> Self {
        Self { group_id, user_id }
    }
}

/// Command to leave a community group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveGroupCommand {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

impl LeaveGroupCommand {
    pub fn new(group_id: Uuid, user_id: Uuid) -> Self {
        Self { group_id, user_id }
    }
}

/// Command to register for a workshop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCommand {
    pub workshop_id: Uuid,
    pub user_id: Uuid,
}

impl RegisterCommand {
    pub fn new(workshop_id: Uuid, user_id: Uuid) -> Self {
        Self { workshop_id, user_id }
    }
}

/// Command to cancel a workshop registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnregisterCommand {
    pub workshop_id: Uuid,
    pub user_id: Uuid,
}

impl UnregisterCommand {
    pub fn new(workshop_id: Uuid, user_id: Uuid) -> Self {
        Self { workshop_id, user_id }
    }
}

/// Command to cast or replace a vote on an idea
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteCommand {
    pub idea_id: Uuid,
    pub user_id: Uuid,
    /// Raw value; validated against {-1, 0, 1} by the handler
    pub value: i64,
}

impl VoteCommand {
    pub fn new(idea_id: Uuid, user_id: Uuid, value: i64) -> Self {
        Self {
            idea_id,
            user_id,
            value,
        }
    }
}

/// Command to pledge funding to an idea
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributeCommand {
    pub idea_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub message: Option<String>,
}

impl ContributeCommand {
    pub fn new(idea_id: Uuid, user_id: Uuid, amount: i64) -> Self {
        Self {
            idea_id,
            user_id,
            amount,
            message: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}
