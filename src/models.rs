//! Entity row types
//!
//! Database row structs shared by the route handlers and the mutation
//! handlers. JSON output uses camelCase to match the public API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Community group aggregate root. `current_members` is an incrementally
/// maintained cache of the group_members row count.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub group_type: String,
    pub meeting_schedule: Option<String>,
    pub max_members: Option<i32>,
    pub current_members: i32,
    pub creator_id: Uuid,
    pub image_url: Option<String>,
    pub website_url: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// Workshop aggregate root with its `current_attendees` counter cache.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    pub id: Uuid,
    pub group_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_attendees: Option<i32>,
    pub current_attendees: i32,
    pub skill_level: String,
    pub tags: Option<String>,
    pub image_url: Option<String>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub registered_at: DateTime<Utc>,
}

/// Idea aggregate root. `vote_count` caches the sum of vote values and
/// `funding_raised` the sum of contribution amounts.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub field_category: String,
    pub status: String,
    pub ai_assisted: bool,
    pub funding_goal: i64,
    pub funding_raised: i64,
    pub vote_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub idea_id: Uuid,
    pub user_id: Uuid,
    pub value: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub id: Uuid,
    pub idea_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Nft {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub prompt: Option<String>,
    pub monetization_tips: Option<String>,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MaterialCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MaterialItem {
    pub id: Uuid,
    pub category_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub ai_generated: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_serializes_camel_case() {
        let group = Group {
            id: Uuid::nil(),
            name: "Makers".to_string(),
            description: "d".to_string(),
            location: "loc".to_string(),
            city: "Lisbon".to_string(),
            state: None,
            country: "PT".to_string(),
            latitude: None,
            longitude: None,
            group_type: "makerspace".to_string(),
            meeting_schedule: None,
            max_members: Some(10),
            current_members: 1,
            creator_id: Uuid::nil(),
            image_url: None,
            website_url: None,
            contact_email: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["groupType"], "makerspace");
        assert_eq!(json["maxMembers"], 10);
        assert_eq!(json["currentMembers"], 1);
        assert!(json.get("group_type").is_none());
    }

    #[test]
    fn test_idea_serializes_counters() {
        let idea = Idea {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: "t".to_string(),
            description: "d".to_string(),
            field_category: "polymers".to_string(),
            status: "submitted".to_string(),
            ai_assisted: false,
            funding_goal: 100,
            funding_raised: 40,
            vote_count: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&idea).unwrap();
        assert_eq!(json["fundingRaised"], 40);
        assert_eq!(json["voteCount"], 3);
    }
}
