//! Workshop routes
//!
//! Scheduling CRUD plus registration. Mutations on the attendee counter go
//! through the attendance handler so the counter and the ledger move together.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{DomainError, SkillLevel};
use crate::error::AppError;
use crate::handlers::{AttendanceHandler, RegisterCommand, UnregisterCommand};
use crate::models::{Attendance, Workshop};
use crate::state::AppState;

use super::middleware::CurrentUser;
use super::{AppJson, SuccessResponse};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopFilter {
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub upcoming: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkshopRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub max_attendees: Option<i32>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkshopRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_attendees: Option<i32>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkshopsResponse {
    pub workshops: Vec<Workshop>,
}

#[derive(Debug, Serialize)]
pub struct WorkshopResponse {
    pub workshop: Workshop,
}

#[derive(Debug, Serialize)]
pub struct AttendeesResponse {
    pub attendees: Vec<Attendance>,
}

// =========================================================================
// Router
// =========================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_workshops).post(create_workshop))
        .route("/my", get(my_workshops))
        .route("/created", get(created_workshops))
        .route(
            "/:id",
            get(get_workshop).patch(update_workshop).delete(delete_workshop),
        )
        .route("/:id/register", post(register))
        .route("/:id/unregister", post(unregister))
        .route("/:id/attendees", get(list_attendees))
}

// =========================================================================
// GET /workshops
// =========================================================================

async fn list_workshops(
    State(pool): State<PgPool>,
    Query(filter): Query<WorkshopFilter>,
) -> Result<Json<WorkshopsResponse>, AppError> {
    if let Some(ref level) = filter.skill_level {
        level.parse::<SkillLevel>()?;
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM workshops WHERE TRUE");

    if let Some(ref skill_level) = filter.skill_level {
        query.push(" AND skill_level = ").push_bind(skill_level);
    }
    if filter.upcoming == Some(true) {
        query.push(" AND start_date >= NOW()");
    }
    query.push(" ORDER BY start_date");

    let workshops: Vec<Workshop> = query.build_query_as().fetch_all(&pool).await?;

    Ok(Json(WorkshopsResponse { workshops }))
}

// =========================================================================
// GET /workshops/my
// =========================================================================

/// Workshops the caller is registered for.
async fn my_workshops(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<WorkshopsResponse>, AppError> {
    let workshops: Vec<Workshop> = sqlx::query_as(
        r#"
        SELECT w.*
        FROM workshops w
        JOIN workshop_attendees a ON a.workshop_id = w.id
        WHERE a.user_id = $1
        ORDER BY w.start_date
        "#,
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(WorkshopsResponse { workshops }))
}

// =========================================================================
// GET /workshops/created
// =========================================================================

/// Workshops the caller created.
async fn created_workshops(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<WorkshopsResponse>, AppError> {
    let workshops: Vec<Workshop> = sqlx::query_as(
        "SELECT * FROM workshops WHERE creator_id = $1 ORDER BY start_date",
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(WorkshopsResponse { workshops }))
}

// =========================================================================
// GET /workshops/:id
// =========================================================================

async fn get_workshop(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkshopResponse>, AppError> {
    let workshop: Option<Workshop> = sqlx::query_as("SELECT * FROM workshops WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let workshop = workshop.ok_or(AppError::NotFound("Workshop"))?;

    Ok(Json(WorkshopResponse { workshop }))
}

// =========================================================================
// POST /workshops
// =========================================================================

async fn create_workshop(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    AppJson(request): AppJson<CreateWorkshopRequest>,
) -> Result<(StatusCode, Json<WorkshopResponse>), AppError> {
    if request.title.trim().is_empty() {
        return Err(DomainError::EmptyField("title").into());
    }
    if request.description.trim().is_empty() {
        return Err(DomainError::EmptyField("description").into());
    }
    if request.location.trim().is_empty() {
        return Err(DomainError::EmptyField("location").into());
    }

    let skill_level = match request.skill_level {
        Some(ref raw) => raw.parse::<SkillLevel>()?,
        None => SkillLevel::Beginner,
    };

    let workshop: Workshop = sqlx::query_as(
        r#"
        INSERT INTO workshops (
            id, group_id, title, description, location, start_date, end_date,
            max_attendees, current_attendees, skill_level, tags, image_url,
            creator_id, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10, $11, $12, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.group_id)
    .bind(&request.title)
    .bind(&request.description)
    .bind(&request.location)
    .bind(request.start_date)
    .bind(request.end_date)
    .bind(request.max_attendees)
    .bind(skill_level.as_str())
    .bind(&request.tags)
    .bind(&request.image_url)
    .bind(user.id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(WorkshopResponse { workshop })))
}

// =========================================================================
// PATCH /workshops/:id
// =========================================================================

async fn update_workshop(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<UpdateWorkshopRequest>,
) -> Result<Json<WorkshopResponse>, AppError> {
    require_creator(&pool, id, user.id).await?;

    if let Some(ref raw) = request.skill_level {
        raw.parse::<SkillLevel>()?;
    }

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE workshops SET id = id");

    if let Some(ref title) = request.title {
        query.push(", title = ").push_bind(title);
    }
    if let Some(ref description) = request.description {
        query.push(", description = ").push_bind(description);
    }
    if let Some(ref location) = request.location {
        query.push(", location = ").push_bind(location);
    }
    if let Some(start_date) = request.start_date {
        query.push(", start_date = ").push_bind(start_date);
    }
    if let Some(end_date) = request.end_date {
        query.push(", end_date = ").push_bind(end_date);
    }
    if let Some(max_attendees) = request.max_attendees {
        query.push(", max_attendees = ").push_bind(max_attendees);
    }
    if let Some(ref skill_level) = request.skill_level {
        query.push(", skill_level = ").push_bind(skill_level);
    }
    if let Some(ref tags) = request.tags {
        query.push(", tags = ").push_bind(tags);
    }
    if let Some(ref image_url) = request.image_url {
        query.push(", image_url = ").push_bind(image_url);
    }
    query.push(" WHERE id = ").push_bind(id);

    query.build().execute(&pool).await?;

    get_workshop(State(pool), Path(id)).await
}

// =========================================================================
// DELETE /workshops/:id
// =========================================================================

async fn delete_workshop(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_creator(&pool, id, user.id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM workshop_attendees WHERE workshop_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM workshops WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =========================================================================
// POST /workshops/:id/register
// =========================================================================

async fn register(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkshopResponse>, AppError> {
    let handler = AttendanceHandler::new(pool);

    let workshop = handler.register(RegisterCommand::new(id, user.id)).await?;

    Ok(Json(WorkshopResponse { workshop }))
}

// =========================================================================
// POST /workshops/:id/unregister
// =========================================================================

async fn unregister(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    let handler = AttendanceHandler::new(pool);

    handler.unregister(UnregisterCommand::new(id, user.id)).await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =========================================================================
// GET /workshops/:id/attendees
// =========================================================================

async fn list_attendees(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttendeesResponse>, AppError> {
    let attendees: Vec<Attendance> = sqlx::query_as(
        "SELECT * FROM workshop_attendees WHERE workshop_id = $1 ORDER BY registered_at",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(AttendeesResponse { attendees }))
}

/// Existence first, then ownership, so a non-creator probing a missing id
/// still sees 404.
async fn require_creator(pool: &PgPool, workshop_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let creator_id: Option<Uuid> =
        sqlx::query_scalar("SELECT creator_id FROM workshops WHERE id = $1")
            .bind(workshop_id)
            .fetch_optional(pool)
            .await?;

    let creator_id = creator_id.ok_or(AppError::NotFound("Workshop"))?;

    if creator_id != user_id {
        return Err(AppError::Forbidden("Only the creator can modify a workshop"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workshop_filter_defaults() {
        let filter: WorkshopFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.skill_level.is_none());
        assert!(filter.upcoming.is_none());
    }

    #[test]
    fn test_create_request_parses_dates() {
        let json = r#"{
            "title": "Intro to resin casting",
            "description": "Hands-on session",
            "location": "Workshop B",
            "startDate": "2026-09-01T18:00:00Z",
            "skillLevel": "intermediate",
            "maxAttendees": 12
        }"#;

        let request: CreateWorkshopRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.max_attendees, Some(12));
        assert_eq!(request.skill_level.as_deref(), Some("intermediate"));
        assert!(request.end_date.is_none());
    }

    #[test]
    fn test_invalid_skill_level_rejected_at_parse() {
        assert!("expert".parse::<SkillLevel>().is_err());
        assert!("beginner".parse::<SkillLevel>().is_ok());
    }
}
