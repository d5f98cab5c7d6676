//! Group routes
//!
//! CRUD plus join/leave/members. Update is admin-gated, delete is
//! creator-gated; existence is checked before authorization so a probing
//! caller cannot distinguish forbidden from absent.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{DomainError, GroupRole};
use crate::error::AppError;
use crate::handlers::{JoinGroupCommand, LeaveGroupCommand, MembershipHandler};
use crate::models::{Group, Membership};
use crate::state::AppState;

use super::middleware::CurrentUser;
use super::{AppJson, SuccessResponse};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFilter {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub group_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: String,
    pub location: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    pub group_type: String,
    #[serde(default)]
    pub meeting_schedule: Option<String>,
    #[serde(default)]
    pub max_members: Option<i32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub meeting_schedule: Option<String>,
    #[serde(default)]
    pub max_members: Option<i32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub groups: Vec<Group>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub group: Group,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<Membership>,
}

// =========================================================================
// Router
// =========================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/my", get(my_groups))
        .route("/:id", get(get_group).patch(update_group).delete(delete_group))
        .route("/:id/join", post(join_group))
        .route("/:id/leave", post(leave_group))
        .route("/:id/members", get(list_members))
}

// =========================================================================
// GET /groups
// =========================================================================

async fn list_groups(
    State(pool): State<PgPool>,
    Query(filter): Query<GroupFilter>,
) -> Result<Json<GroupsResponse>, AppError> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM community_groups WHERE TRUE");

    if let Some(ref city) = filter.city {
        query.push(" AND city = ").push_bind(city);
    }
    if let Some(ref country) = filter.country {
        query.push(" AND country = ").push_bind(country);
    }
    if let Some(ref group_type) = filter.group_type {
        query.push(" AND group_type = ").push_bind(group_type);
    }
    query.push(" ORDER BY created_at DESC");

    let groups: Vec<Group> = query.build_query_as().fetch_all(&pool).await?;

    Ok(Json(GroupsResponse { groups }))
}

// =========================================================================
// GET /groups/my
// =========================================================================

async fn my_groups(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<GroupsResponse>, AppError> {
    let groups: Vec<Group> = sqlx::query_as(
        r#"
        SELECT g.*
        FROM community_groups g
        JOIN group_members m ON m.group_id = g.id
        WHERE m.user_id = $1
        ORDER BY m.joined_at
        "#,
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(GroupsResponse { groups }))
}

// =========================================================================
// GET /groups/:id
// =========================================================================

async fn get_group(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupResponse>, AppError> {
    let group: Option<Group> = sqlx::query_as("SELECT * FROM community_groups WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let group = group.ok_or(AppError::NotFound("Group"))?;

    Ok(Json(GroupResponse { group }))
}

// =========================================================================
// POST /groups
// =========================================================================

/// Create a group. The creator becomes an admin member immediately, so the
/// member counter starts at 1.
async fn create_group(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    AppJson(request): AppJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupResponse>), AppError> {
    require_non_empty(&request.name, "name")?;
    require_non_empty(&request.description, "description")?;
    require_non_empty(&request.location, "location")?;
    require_non_empty(&request.city, "city")?;
    require_non_empty(&request.country, "country")?;
    require_non_empty(&request.group_type, "groupType")?;

    let group_id = Uuid::new_v4();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO community_groups (
            id, name, description, location, city, state, country,
            latitude, longitude, group_type, meeting_schedule, max_members,
            current_members, creator_id, image_url, website_url, contact_email,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1, $13, $14, $15, $16, NOW(), NOW())
        "#,
    )
    .bind(group_id)
    .bind(&request.name)
    .bind(&request.description)
    .bind(&request.location)
    .bind(&request.city)
    .bind(&request.state)
    .bind(&request.country)
    .bind(&request.latitude)
    .bind(&request.longitude)
    .bind(&request.group_type)
    .bind(&request.meeting_schedule)
    .bind(request.max_members)
    .bind(user.id)
    .bind(&request.image_url)
    .bind(&request.website_url)
    .bind(&request.contact_email)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO group_members (id, group_id, user_id, role, joined_at)
        VALUES ($1, $2, $3, $4, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(group_id)
    .bind(user.id)
    .bind(GroupRole::Admin.as_str())
    .execute(&mut *tx)
    .await?;

    let group: Group = sqlx::query_as("SELECT * FROM community_groups WHERE id = $1")
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(GroupResponse { group })))
}

// =========================================================================
// PATCH /groups/:id
// =========================================================================

/// Update group details. Requires an admin membership.
async fn update_group(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>, AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM community_groups WHERE id = $1)")
            .bind(id)
            .fetch_one(&pool)
            .await?;

    if !exists {
        return Err(AppError::NotFound("Group"));
    }

    let role: Option<String> =
        sqlx::query_scalar("SELECT role FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&pool)
            .await?;

    let can_manage = role
        .and_then(|r| r.parse::<GroupRole>().ok())
        .map(|r| r.can_manage_group())
        .unwrap_or(false);

    if !can_manage {
        return Err(AppError::Forbidden("Admin role required"));
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE community_groups SET updated_at = NOW()");

    if let Some(ref name) = request.name {
        query.push(", name = ").push_bind(name);
    }
    if let Some(ref description) = request.description {
        query.push(", description = ").push_bind(description);
    }
    if let Some(ref location) = request.location {
        query.push(", location = ").push_bind(location);
    }
    if let Some(ref meeting_schedule) = request.meeting_schedule {
        query.push(", meeting_schedule = ").push_bind(meeting_schedule);
    }
    if let Some(max_members) = request.max_members {
        query.push(", max_members = ").push_bind(max_members);
    }
    if let Some(ref image_url) = request.image_url {
        query.push(", image_url = ").push_bind(image_url);
    }
    if let Some(ref website_url) = request.website_url {
        query.push(", website_url = ").push_bind(website_url);
    }
    if let Some(ref contact_email) = request.contact_email {
        query.push(", contact_email = ").push_bind(contact_email);
    }
    query.push(" WHERE id = ").push_bind(id);

    query.build().execute(&pool).await?;

    get_group(State(pool), Path(id)).await
}

// =========================================================================
// DELETE /groups/:id
// =========================================================================

/// Delete a group and its memberships. Only the original creator may delete.
async fn delete_group(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    let creator_id: Option<Uuid> =
        sqlx::query_scalar("SELECT creator_id FROM community_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

    let creator_id = creator_id.ok_or(AppError::NotFound("Group"))?;

    if creator_id != user.id {
        return Err(AppError::Forbidden("Only the creator can delete a group"));
    }

    // Ledger rows go with the parent in the same transaction
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM group_members WHERE group_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM community_groups WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =========================================================================
// POST /groups/:id/join
// =========================================================================

async fn join_group(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupResponse>, AppError> {
    let handler = MembershipHandler::new(pool);

    let group = handler.join(JoinGroupCommand::new(id, user.id)).await?;

    Ok(Json(GroupResponse { group }))
}

// =========================================================================
// POST /groups/:id/leave
// =========================================================================

async fn leave_group(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    let handler = MembershipHandler::new(pool);

    handler.leave(LeaveGroupCommand::new(id, user.id)).await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =========================================================================
// GET /groups/:id/members
// =========================================================================

async fn list_members(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<MembersResponse>, AppError> {
    let members: Vec<Membership> = sqlx::query_as(
        "SELECT * FROM group_members WHERE group_id = $1 ORDER BY joined_at",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(MembersResponse { members }))
}

fn require_non_empty(value: &str, field: &'static str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(DomainError::EmptyField(field).into());
    }
    Ok(())
}
