//! API Middleware
//!
//! Session authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::RequestContext;

/// Authenticated caller, derived from the session token.
/// Session issuance and role assignment happen outside this service.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: String,
}

// =========================================================================
// Session Authentication Middleware
// =========================================================================

/// Extract and validate the session token from the X-Session-Token header
pub async fn auth_middleware(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = match headers.get("X-Session-Token").and_then(|v| v.to_str().ok()) {
        Some(token) => token,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Missing X-Session-Token header",
                    "error_code": "unauthorized"
                })),
            )
                .into_response());
        }
    };

    // Tokens are stored hashed; compare against the sha256 of the
    // presented token.
    let session: Option<(Uuid, String)> = match sqlx::query_as(
        r#"
        SELECT u.id, u.role
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = encode(sha256($1::bytea), 'hex')
          AND s.expires_at > NOW()
        "#,
    )
    .bind(token.as_bytes())
    .fetch_optional(&pool)
    .await
    {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("Database error during session validation: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "error_code": "database_error"
                })),
            )
                .into_response());
        }
    };

    let (user_id, role) = match session {
        Some(record) => record,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Invalid or expired session",
                    "error_code": "unauthorized"
                })),
            )
                .into_response());
        }
    };

    request
        .extensions_mut()
        .insert(CurrentUser { id: user_id, role });

    // Extract correlation ID or generate a new one
    let correlation_id = headers
        .get("X-Correlation-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request
        .extensions_mut()
        .insert(RequestContext::with_correlation_id(correlation_id));

    Ok(next.run(request).await)
}

// =========================================================================
// Header masking
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-session-token", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.correlation_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_headers_for_logging() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("x-session-token", "secret-token-12345".parse().unwrap());
        headers.insert("x-correlation-id", "abc".parse().unwrap());

        let masked = mask_headers_for_logging(&headers);

        let token = masked.iter().find(|(k, _)| k == "x-session-token");
        let content_type = masked.iter().find(|(k, _)| k == "content-type");
        let correlation = masked.iter().find(|(k, _)| k == "x-correlation-id");

        assert_eq!(token.unwrap().1, "[REDACTED]");
        assert_eq!(content_type.unwrap().1, "application/json");
        assert_eq!(correlation.unwrap().1, "abc");
    }

    #[test]
    fn test_sensitive_headers_list() {
        assert!(SENSITIVE_HEADERS.contains(&"x-session-token"));
        assert!(SENSITIVE_HEADERS.contains(&"authorization"));
        assert!(!SENSITIVE_HEADERS.contains(&"content-type"));
    }
}
