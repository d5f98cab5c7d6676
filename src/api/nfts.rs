//! NFT routes
//!
//! Gallery CRUD plus the AI helpers: an image description generated at
//! creation time (best effort, never fatal) and on-demand monetization tips.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::ai::{self, TextGenClient};
use crate::domain::DomainError;
use crate::error::AppError;
use crate::models::Nft;
use crate::state::AppState;

use super::middleware::CurrentUser;
use super::{AppJson, SuccessResponse};

const PLACEHOLDER_IMAGE_URL: &str = "/nft-example.png";

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNftRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub monetization_tips: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNftRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub monetization_tips: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTipsRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct NftsResponse {
    pub nfts: Vec<Nft>,
}

#[derive(Debug, Serialize)]
pub struct NftResponse {
    pub nft: Nft,
}

#[derive(Debug, Serialize)]
pub struct TipsResponse {
    pub tips: String,
}

// =========================================================================
// Router
// =========================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_nfts).post(create_nft))
        .route("/my", get(my_nfts))
        .route("/:id", get(get_nft).patch(update_nft).delete(delete_nft))
        .route("/generate-tips", post(generate_tips))
}

// =========================================================================
// GET /nfts
// =========================================================================

async fn list_nfts(State(pool): State<PgPool>) -> Result<Json<NftsResponse>, AppError> {
    let nfts: Vec<Nft> = sqlx::query_as("SELECT * FROM nfts ORDER BY created_at")
        .fetch_all(&pool)
        .await?;

    Ok(Json(NftsResponse { nfts }))
}

// =========================================================================
// GET /nfts/my
// =========================================================================

async fn my_nfts(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<NftsResponse>, AppError> {
    let nfts: Vec<Nft> =
        sqlx::query_as("SELECT * FROM nfts WHERE user_id = $1 ORDER BY created_at")
            .bind(user.id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(NftsResponse { nfts }))
}

// =========================================================================
// GET /nfts/:id
// =========================================================================

async fn get_nft(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<NftResponse>, AppError> {
    let nft: Option<Nft> = sqlx::query_as("SELECT * FROM nfts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let nft = nft.ok_or(AppError::NotFound("NFT"))?;

    Ok(Json(NftResponse { nft }))
}

// =========================================================================
// POST /nfts
// =========================================================================

/// Create an NFT. When a generation prompt is supplied and no image URL is,
/// the gateway is asked for an image description, which is carried in the
/// stored URL's desc parameter; a gateway failure falls back to the bare
/// placeholder rather than failing the create.
async fn create_nft(
    State(pool): State<PgPool>,
    State(ai_client): State<TextGenClient>,
    Extension(user): Extension<CurrentUser>,
    AppJson(request): AppJson<CreateNftRequest>,
) -> Result<(StatusCode, Json<NftResponse>), AppError> {
    if request.title.trim().is_empty() {
        return Err(DomainError::EmptyField("title").into());
    }
    if request.description.trim().is_empty() {
        return Err(DomainError::EmptyField("description").into());
    }

    let image_url = match (&request.image_url, &request.prompt) {
        (Some(url), _) => url.clone(),
        (None, Some(prompt)) => {
            match ai_client
                .generate(&ai::image_description_prompt(prompt))
                .await
            {
                Ok(description) => generated_image_url(&description),
                Err(e) => {
                    tracing::warn!(error = %e, "Image description generation failed, using placeholder");
                    PLACEHOLDER_IMAGE_URL.to_string()
                }
            }
        }
        (None, None) => PLACEHOLDER_IMAGE_URL.to_string(),
    };

    let nft: Nft = sqlx::query_as(
        r#"
        INSERT INTO nfts (
            id, user_id, title, description, image_url, prompt,
            monetization_tips, tags, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&request.title)
    .bind(&request.description)
    .bind(&image_url)
    .bind(&request.prompt)
    .bind(&request.monetization_tips)
    .bind(&request.tags)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(NftResponse { nft })))
}

/// Placeholder image URL carrying the generated description as a query
/// parameter, so the frontend can render it as alt text.
fn generated_image_url(description: &str) -> String {
    format!(
        "{}?desc={}",
        PLACEHOLDER_IMAGE_URL,
        urlencoding::encode(description)
    )
}

// =========================================================================
// PATCH /nfts/:id
// =========================================================================

async fn update_nft(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<UpdateNftRequest>,
) -> Result<Json<NftResponse>, AppError> {
    require_owner(&pool, id, user.id).await?;

    let mut query: sqlx::QueryBuilder<sqlx::Postgres> =
        sqlx::QueryBuilder::new("UPDATE nfts SET id = id");

    if let Some(ref title) = request.title {
        query.push(", title = ").push_bind(title);
    }
    if let Some(ref description) = request.description {
        query.push(", description = ").push_bind(description);
    }
    if let Some(ref image_url) = request.image_url {
        query.push(", image_url = ").push_bind(image_url);
    }
    if let Some(ref monetization_tips) = request.monetization_tips {
        query.push(", monetization_tips = ").push_bind(monetization_tips);
    }
    if let Some(ref tags) = request.tags {
        query.push(", tags = ").push_bind(tags);
    }
    query.push(" WHERE id = ").push_bind(id);

    query.build().execute(&pool).await?;

    get_nft(State(pool), Path(id)).await
}

// =========================================================================
// DELETE /nfts/:id
// =========================================================================

async fn delete_nft(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_owner(&pool, id, user.id).await?;

    sqlx::query("DELETE FROM nfts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =========================================================================
// POST /nfts/generate-tips
// =========================================================================

/// Monetization tips are generated on demand and not persisted here; the
/// client decides whether to attach them to an NFT via PATCH.
async fn generate_tips(
    State(ai_client): State<TextGenClient>,
    AppJson(request): AppJson<GenerateTipsRequest>,
) -> Result<Json<TipsResponse>, AppError> {
    if request.title.trim().is_empty() {
        return Err(DomainError::EmptyField("title").into());
    }
    if request.description.trim().is_empty() {
        return Err(DomainError::EmptyField("description").into());
    }

    let tips = ai_client
        .generate(&ai::monetization_tips_prompt(
            &request.title,
            &request.description,
        ))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Monetization tip generation failed");
            AppError::UpstreamUnavailable
        })?;

    Ok(Json(TipsResponse { tips }))
}

async fn require_owner(pool: &PgPool, nft_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let owner_id: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM nfts WHERE id = $1")
        .bind(nft_id)
        .fetch_optional(pool)
        .await?;

    let owner_id = owner_id.ok_or(AppError::NotFound("NFT"))?;

    if owner_id != user_id {
        return Err(AppError::Forbidden("Only the owner can modify an NFT"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_optional_fields() {
        let json = r#"{"title": "Fox", "description": "A pixel fox", "prompt": "pixel art fox"}"#;
        let request: CreateNftRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.prompt.as_deref(), Some("pixel art fox"));
        assert!(request.image_url.is_none());
    }

    #[test]
    fn test_generate_tips_request_requires_both_fields() {
        let missing: Result<GenerateTipsRequest, _> =
            serde_json::from_str(r#"{"title": "Fox"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_placeholder_is_relative_path() {
        assert!(PLACEHOLDER_IMAGE_URL.starts_with('/'));
    }

    #[test]
    fn test_generated_image_url_embeds_encoded_description() {
        let url = generated_image_url("a red fox & friends");
        assert!(url.starts_with("/nft-example.png?desc="));
        assert!(url.contains("a%20red%20fox%20%26%20friends"));
        // The raw description must not appear unencoded
        assert!(!url.contains("red fox"));
    }

    #[test]
    fn test_requests_accept_monetization_tips() {
        let json = r#"{"title": "Fox", "description": "d", "monetizationTips": "Sell prints"}"#;
        let create: CreateNftRequest = serde_json::from_str(json).unwrap();
        assert_eq!(create.monetization_tips.as_deref(), Some("Sell prints"));

        let update: UpdateNftRequest =
            serde_json::from_str(r#"{"monetizationTips": "License it"}"#).unwrap();
        assert_eq!(update.monetization_tips.as_deref(), Some("License it"));
    }
}
