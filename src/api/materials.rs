//! Material-science knowledge base routes
//!
//! Categories, submissions, and an AI assist that drafts a submission for a
//! given topic.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::ai::{self, Suggestion, TextGenClient};
use crate::domain::DomainError;
use crate::error::AppError;
use crate::models::{MaterialCategory, MaterialItem};
use crate::state::AppState;

use super::middleware::CurrentUser;
use super::{AppJson, SuccessResponse};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFilter {
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub ai_generated: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAssistRequest {
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<MaterialCategory>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: MaterialCategory,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<MaterialItem>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: MaterialItem,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestion: Suggestion,
}

// =========================================================================
// Router
// =========================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).patch(update_item).delete(delete_item))
        .route("/ai-assist", post(ai_assist))
}

// =========================================================================
// GET /materials/categories
// =========================================================================

async fn list_categories(
    State(pool): State<PgPool>,
) -> Result<Json<CategoriesResponse>, AppError> {
    let categories: Vec<MaterialCategory> =
        sqlx::query_as("SELECT * FROM material_categories ORDER BY name")
            .fetch_all(&pool)
            .await?;

    Ok(Json(CategoriesResponse { categories }))
}

// =========================================================================
// POST /materials/categories
// =========================================================================

async fn create_category(
    State(pool): State<PgPool>,
    AppJson(request): AppJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), AppError> {
    if request.name.trim().is_empty() {
        return Err(DomainError::EmptyField("name").into());
    }

    let category: MaterialCategory = sqlx::query_as(
        r#"
        INSERT INTO material_categories (id, name, description, created_at)
        VALUES ($1, $2, $3, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&request.name)
    .bind(&request.description)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse { category })))
}

// =========================================================================
// GET /materials/items
// =========================================================================

async fn list_items(
    State(pool): State<PgPool>,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<ItemsResponse>, AppError> {
    let items: Vec<MaterialItem> = match filter.category_id {
        Some(category_id) => {
            sqlx::query_as(
                "SELECT * FROM material_items WHERE category_id = $1 ORDER BY created_at",
            )
            .bind(category_id)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM material_items ORDER BY created_at")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(Json(ItemsResponse { items }))
}

// =========================================================================
// POST /materials/items
// =========================================================================

async fn create_item(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    AppJson(request): AppJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), AppError> {
    if request.title.trim().is_empty() {
        return Err(DomainError::EmptyField("title").into());
    }
    if request.description.trim().is_empty() {
        return Err(DomainError::EmptyField("description").into());
    }

    let category_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM material_categories WHERE id = $1)")
            .bind(request.category_id)
            .fetch_one(&pool)
            .await?;

    if !category_exists {
        return Err(AppError::NotFound("Category"));
    }

    let item: MaterialItem = sqlx::query_as(
        r#"
        INSERT INTO material_items (
            id, category_id, user_id, title, description, ai_generated, status, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.category_id)
    .bind(user.id)
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.ai_generated.unwrap_or(false))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

// =========================================================================
// GET /materials/items/:id
// =========================================================================

async fn get_item(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemResponse>, AppError> {
    let item: Option<MaterialItem> = sqlx::query_as("SELECT * FROM material_items WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let item = item.ok_or(AppError::NotFound("Material item"))?;

    Ok(Json(ItemResponse { item }))
}

// =========================================================================
// PATCH /materials/items/:id
// =========================================================================

async fn update_item(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    require_owner(&pool, id, user.id).await?;

    let mut query: sqlx::QueryBuilder<sqlx::Postgres> =
        sqlx::QueryBuilder::new("UPDATE material_items SET id = id");

    if let Some(ref title) = request.title {
        query.push(", title = ").push_bind(title);
    }
    if let Some(ref description) = request.description {
        query.push(", description = ").push_bind(description);
    }
    if let Some(ref status) = request.status {
        query.push(", status = ").push_bind(status);
    }
    query.push(" WHERE id = ").push_bind(id);

    query.build().execute(&pool).await?;

    get_item(State(pool), Path(id)).await
}

// =========================================================================
// DELETE /materials/items/:id
// =========================================================================

async fn delete_item(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_owner(&pool, id, user.id).await?;

    sqlx::query("DELETE FROM material_items WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =========================================================================
// POST /materials/ai-assist
// =========================================================================

/// Draft a submission for a topic. The caller reviews and submits the
/// draft explicitly; nothing is persisted here.
async fn ai_assist(
    State(ai_client): State<TextGenClient>,
    AppJson(request): AppJson<AiAssistRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    if request.topic.trim().is_empty() {
        return Err(DomainError::EmptyField("topic").into());
    }

    let suggestion = ai_client
        .generate_suggestion(&ai::material_assist_prompt(&request.topic))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Material assist generation failed");
            AppError::UpstreamUnavailable
        })?;

    Ok(Json(SuggestionResponse { suggestion }))
}

async fn require_owner(pool: &PgPool, item_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let owner_id: Option<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM material_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(pool)
            .await?;

    let owner_id = owner_id.ok_or(AppError::NotFound("Material item"))?;

    if owner_id != user_id {
        return Err(AppError::Forbidden("Only the owner can modify a submission"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_filter_parses_uuid() {
        let id = Uuid::new_v4();
        let filter: ItemFilter =
            serde_json::from_str(&format!(r#"{{"categoryId": "{}"}}"#, id)).unwrap();
        assert_eq!(filter.category_id, Some(id));
    }

    #[test]
    fn test_create_item_request_camel_case() {
        let json = format!(
            r#"{{"categoryId": "{}", "title": "Aerogel", "description": "Low-density solid", "aiGenerated": true}}"#,
            Uuid::nil()
        );
        let request: CreateItemRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.ai_generated, Some(true));
    }

    #[test]
    fn test_ai_assist_request_requires_topic() {
        let missing: Result<AiAssistRequest, _> = serde_json::from_str("{}");
        assert!(missing.is_err());
    }
}
