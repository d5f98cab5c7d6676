//! Domain error types

/// Validation failures raised by domain value types before any database work.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Vote value must be -1, 0 or 1 (got {0})")]
    InvalidVoteValue(i64),

    #[error("Contribution amount must be at least 1 (got {0})")]
    InvalidAmount(i64),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Unknown group role: {0}")]
    UnknownRole(String),

    #[error("Unknown skill level: {0}")]
    UnknownSkillLevel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(DomainError::InvalidVoteValue(2)
            .to_string()
            .contains("-1, 0 or 1"));
        assert!(DomainError::InvalidAmount(0).to_string().contains("at least 1"));
        assert!(DomainError::EmptyField("name").to_string().contains("'name'"));
    }
}
