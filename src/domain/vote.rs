//! Vote values
//!
//! A vote is one of {-1, 0, 1}. Replacing an existing vote adjusts the
//! idea's vote_count by the delta between old and new value, so a repeated
//! identical vote is a no-op.

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Validated vote value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct VoteValue(i16);

impl VoteValue {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        match value {
            -1 | 0 | 1 => Ok(Self(value as i16)),
            other => Err(DomainError::InvalidVoteValue(other)),
        }
    }

    pub fn value(&self) -> i16 {
        self.0
    }

    /// Counter adjustment when this vote replaces `old`.
    pub fn delta_from(&self, old: VoteValue) -> i32 {
        i32::from(self.0) - i32::from(old.0)
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VoteValue> for i64 {
    fn from(v: VoteValue) -> i64 {
        i64::from(v.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_only_closed_set() {
        assert!(VoteValue::new(-1).is_ok());
        assert!(VoteValue::new(0).is_ok());
        assert!(VoteValue::new(1).is_ok());
        assert!(VoteValue::new(2).is_err());
        assert!(VoteValue::new(-2).is_err());
    }

    #[test]
    fn test_identical_revote_delta_is_zero() {
        let v = VoteValue::new(1).unwrap();
        assert_eq!(v.delta_from(v), 0);
    }

    #[test]
    fn test_flip_vote_delta() {
        let up = VoteValue::new(1).unwrap();
        let down = VoteValue::new(-1).unwrap();
        assert_eq!(down.delta_from(up), -2);
        assert_eq!(up.delta_from(down), 2);
    }

    #[test]
    fn test_up_then_down_nets_to_zero() {
        let up = VoteValue::new(1).unwrap();
        let down = VoteValue::new(-1).unwrap();

        // First vote adds +1, replacement adjusts by -2: net 0 overall
        // relative to the pre-vote count minus the final stored value.
        let mut count = 0i32;
        count += i32::from(up.value());
        count += down.delta_from(up);
        assert_eq!(count, i32::from(down.value()));
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let ok: Result<VoteValue, _> = serde_json::from_str("1");
        assert!(ok.is_ok());
        let bad: Result<VoteValue, _> = serde_json::from_str("5");
        assert!(bad.is_err());
    }
}
