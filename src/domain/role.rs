//! Group membership roles
//!
//! Closed enumeration for the role column on group_members. Role-gated
//! operations go through capability checks instead of comparing raw strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Role a user holds within a community group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Admin,
    Member,
}

impl GroupRole {
    /// Admins may edit group details.
    pub fn can_manage_group(&self) -> bool {
        matches!(self, GroupRole::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Admin => "admin",
            GroupRole::Member => "member",
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(GroupRole::Admin),
            "member" => Ok(GroupRole::Member),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

/// Workshop difficulty levels accepted by create/update/filter inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(SkillLevel::Beginner),
            "intermediate" => Ok(SkillLevel::Intermediate),
            "advanced" => Ok(SkillLevel::Advanced),
            other => Err(DomainError::UnknownSkillLevel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("admin".parse::<GroupRole>().unwrap(), GroupRole::Admin);
        assert_eq!("member".parse::<GroupRole>().unwrap(), GroupRole::Member);
        assert_eq!(GroupRole::Admin.to_string(), "admin");
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!("owner".parse::<GroupRole>().is_err());
    }

    #[test]
    fn test_only_admin_can_manage() {
        assert!(GroupRole::Admin.can_manage_group());
        assert!(!GroupRole::Member.can_manage_group());
    }

    #[test]
    fn test_skill_level_parse() {
        assert_eq!(
            "intermediate".parse::<SkillLevel>().unwrap(),
            SkillLevel::Intermediate
        );
        assert!("expert".parse::<SkillLevel>().is_err());
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&GroupRole::Member).unwrap();
        assert_eq!(json, "\"member\"");
    }
}
