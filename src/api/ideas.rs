//! Idea routes
//!
//! Idea CRUD plus the two counter mutations: voting (upsert, counter moves
//! by the delta) and contributions (append-only ledger, optional
//! Idempotency-Key replay).

use axum::{
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::error::AppError;
use crate::handlers::{
    ContributeCommand, ContributeOutcome, ContributionHandler, VoteCommand, VoteHandler,
};
use crate::models::{Contribution, Idea, Vote};
use crate::state::AppState;

use super::middleware::CurrentUser;
use super::{AppJson, SuccessResponse};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaFilter {
    #[serde(default)]
    pub field_category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdeaRequest {
    pub title: String,
    pub description: String,
    pub field_category: String,
    #[serde(default)]
    pub ai_assisted: Option<bool>,
    #[serde(default)]
    pub funding_goal: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIdeaRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub field_category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub funding_goal: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributeRequest {
    pub amount: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdeasResponse {
    pub ideas: Vec<Idea>,
}

#[derive(Debug, Serialize)]
pub struct IdeaResponse {
    pub idea: Idea,
}

#[derive(Debug, Serialize)]
pub struct VotesResponse {
    pub votes: Vec<Vote>,
}

#[derive(Debug, Serialize)]
pub struct ContributionsResponse {
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Serialize)]
pub struct ContributeResponse {
    pub idea: Idea,
    pub contribution: Contribution,
}

// =========================================================================
// Router
// =========================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ideas).post(create_idea))
        .route("/my", get(my_ideas))
        .route("/:id", get(get_idea).patch(update_idea).delete(delete_idea))
        .route("/:id/vote", post(cast_vote))
        .route("/:id/votes", get(list_votes))
        .route("/:id/contribute", post(contribute))
        .route("/:id/contributions", get(list_contributions))
}

// =========================================================================
// GET /ideas
// =========================================================================

/// Most-voted first; ties break by recency.
async fn list_ideas(
    State(pool): State<PgPool>,
    Query(filter): Query<IdeaFilter>,
) -> Result<Json<IdeasResponse>, AppError> {
    let ideas: Vec<Idea> = match filter.field_category {
        Some(ref category) => {
            sqlx::query_as(
                r#"
                SELECT * FROM ideas
                WHERE field_category = $1
                ORDER BY vote_count DESC, created_at DESC
                "#,
            )
            .bind(category)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ideas ORDER BY vote_count DESC, created_at DESC")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(Json(IdeasResponse { ideas }))
}

// =========================================================================
// GET /ideas/my
// =========================================================================

async fn my_ideas(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<IdeasResponse>, AppError> {
    let ideas: Vec<Idea> =
        sqlx::query_as("SELECT * FROM ideas WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(IdeasResponse { ideas }))
}

// =========================================================================
// GET /ideas/:id
// =========================================================================

async fn get_idea(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<IdeaResponse>, AppError> {
    let idea: Option<Idea> = sqlx::query_as("SELECT * FROM ideas WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let idea = idea.ok_or(AppError::NotFound("Idea"))?;

    Ok(Json(IdeaResponse { idea }))
}

// =========================================================================
// POST /ideas
// =========================================================================

async fn create_idea(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    AppJson(request): AppJson<CreateIdeaRequest>,
) -> Result<(StatusCode, Json<IdeaResponse>), AppError> {
    if request.title.trim().is_empty() {
        return Err(DomainError::EmptyField("title").into());
    }
    if request.description.trim().is_empty() {
        return Err(DomainError::EmptyField("description").into());
    }
    if request.field_category.trim().is_empty() {
        return Err(DomainError::EmptyField("fieldCategory").into());
    }

    let funding_goal = request.funding_goal.unwrap_or(0);
    if funding_goal < 0 {
        return Err(DomainError::InvalidAmount(funding_goal).into());
    }

    let idea: Idea = sqlx::query_as(
        r#"
        INSERT INTO ideas (
            id, user_id, title, description, field_category, status,
            ai_assisted, funding_goal, funding_raised, vote_count,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, 'submitted', $6, $7, 0, 0, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&request.title)
    .bind(&request.description)
    .bind(&request.field_category)
    .bind(request.ai_assisted.unwrap_or(false))
    .bind(funding_goal)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(IdeaResponse { idea })))
}

// =========================================================================
// PATCH /ideas/:id
// =========================================================================

async fn update_idea(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<UpdateIdeaRequest>,
) -> Result<Json<IdeaResponse>, AppError> {
    require_owner(&pool, id, user.id).await?;

    if let Some(funding_goal) = request.funding_goal {
        if funding_goal < 0 {
            return Err(DomainError::InvalidAmount(funding_goal).into());
        }
    }

    let mut query: sqlx::QueryBuilder<sqlx::Postgres> =
        sqlx::QueryBuilder::new("UPDATE ideas SET updated_at = NOW()");

    if let Some(ref title) = request.title {
        query.push(", title = ").push_bind(title);
    }
    if let Some(ref description) = request.description {
        query.push(", description = ").push_bind(description);
    }
    if let Some(ref field_category) = request.field_category {
        query.push(", field_category = ").push_bind(field_category);
    }
    if let Some(ref status) = request.status {
        query.push(", status = ").push_bind(status);
    }
    if let Some(funding_goal) = request.funding_goal {
        query.push(", funding_goal = ").push_bind(funding_goal);
    }
    query.push(" WHERE id = ").push_bind(id);

    query.build().execute(&pool).await?;

    get_idea(State(pool), Path(id)).await
}

// =========================================================================
// DELETE /ideas/:id
// =========================================================================

/// Votes and contributions go with the idea in the same transaction.
async fn delete_idea(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_owner(&pool, id, user.id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM votes WHERE idea_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM contributions WHERE idea_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM ideas WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =========================================================================
// POST /ideas/:id/vote
// =========================================================================

async fn cast_vote(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<VoteRequest>,
) -> Result<Json<IdeaResponse>, AppError> {
    let handler = VoteHandler::new(pool);

    let idea = handler
        .cast(VoteCommand::new(id, user.id, request.value))
        .await?;

    Ok(Json(IdeaResponse { idea }))
}

// =========================================================================
// GET /ideas/:id/votes
// =========================================================================

async fn list_votes(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<VotesResponse>, AppError> {
    let votes: Vec<Vote> =
        sqlx::query_as("SELECT * FROM votes WHERE idea_id = $1 ORDER BY created_at DESC")
            .bind(id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(VotesResponse { votes }))
}

// =========================================================================
// POST /ideas/:id/contribute
// =========================================================================

/// Record a pledge. An optional Idempotency-Key header makes retries safe:
/// a completed request under the same key is replayed from its stored
/// response instead of being re-executed.
async fn contribute(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    AppJson(request): AppJson<ContributeRequest>,
) -> Result<Response, AppError> {
    let idempotency_key = match headers.get("Idempotency-Key") {
        Some(raw) => {
            let raw = raw
                .to_str()
                .map_err(|_| AppError::InvalidRequest("Malformed Idempotency-Key".to_string()))?;
            Some(Uuid::parse_str(raw).map_err(|_| {
                AppError::InvalidRequest("Idempotency-Key must be a UUID".to_string())
            })?)
        }
        None => None,
    };

    let mut command = ContributeCommand::new(id, user.id, request.amount);
    if let Some(message) = request.message {
        command = command.with_message(message);
    }

    let handler = ContributionHandler::new(pool);

    match handler.contribute(command, idempotency_key).await? {
        ContributeOutcome::Fresh { idea, contribution } => {
            Ok(Json(ContributeResponse { idea, contribution }).into_response())
        }
        ContributeOutcome::Replayed { body } => Ok(Json(body).into_response()),
    }
}

// =========================================================================
// GET /ideas/:id/contributions
// =========================================================================

async fn list_contributions(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContributionsResponse>, AppError> {
    let contributions: Vec<Contribution> =
        sqlx::query_as("SELECT * FROM contributions WHERE idea_id = $1 ORDER BY created_at DESC")
            .bind(id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(ContributionsResponse { contributions }))
}

async fn require_owner(pool: &PgPool, idea_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let owner_id: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM ideas WHERE id = $1")
        .bind(idea_id)
        .fetch_optional(pool)
        .await?;

    let owner_id = owner_id.ok_or(AppError::NotFound("Idea"))?;

    if owner_id != user_id {
        return Err(AppError::Forbidden("Only the owner can modify an idea"));
    }

    Ok(())
}
