//! Unit tests for mutation commands
//!
//! Database-backed paths are covered by the integration tests under tests/.

use crate::handlers::{
    ContributeCommand, JoinGroupCommand, LeaveGroupCommand, RegisterCommand, UnregisterCommand,
    VoteCommand,
};
use crate::idempotency::IdempotencyRepository;
use uuid::Uuid;

#[test]
fn test_join_command() {
    let group_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let cmd = JoinGroupCommand::new(group_id, user_id);

    assert_eq!(cmd.group_id, group_id);
    assert_eq!(cmd.user_id, user_id);
}

#[test]
fn test_leave_command_serializes() {
    let cmd = LeaveGroupCommand::new(Uuid::nil(), Uuid::nil());
    let json = serde_json::to_value(&cmd).unwrap();
    assert!(json.get("group_id").is_some());
}

#[test]
fn test_register_unregister_commands() {
    let workshop_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let reg = RegisterCommand::new(workshop_id, user_id);
    let unreg = UnregisterCommand::new(workshop_id, user_id);

    assert_eq!(reg.workshop_id, unreg.workshop_id);
}

#[test]
fn test_vote_command_carries_raw_value() {
    // Validation happens in the handler, not the command
    let cmd = VoteCommand::new(Uuid::new_v4(), Uuid::new_v4(), 5);
    assert_eq!(cmd.value, 5);
}

#[test]
fn test_contribute_command_builder() {
    let cmd = ContributeCommand::new(Uuid::new_v4(), Uuid::new_v4(), 40)
        .with_message("Good luck!".to_string());

    assert_eq!(cmd.amount, 40);
    assert_eq!(cmd.message, Some("Good luck!".to_string()));
}

#[test]
fn test_identical_contribute_commands_hash_identically() {
    let idea_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let a = ContributeCommand::new(idea_id, user_id, 40);
    let b = ContributeCommand::new(idea_id, user_id, 40);

    let hash_a =
        IdempotencyRepository::compute_request_hash(&serde_json::to_vec(&a).unwrap());
    let hash_b =
        IdempotencyRepository::compute_request_hash(&serde_json::to_vec(&b).unwrap());

    assert_eq!(hash_a, hash_b);

    let c = ContributeCommand::new(idea_id, user_id, 70);
    let hash_c =
        IdempotencyRepository::compute_request_hash(&serde_json::to_vec(&c).unwrap());
    assert_ne!(hash_a, hash_c);
}
