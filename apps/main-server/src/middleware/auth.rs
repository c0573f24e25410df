//! Authentication middleware.

use std::sync::Arc;

use auth::{Claims, JwtManager};
use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use entities::UserId;
use serde_json::json;
use task_store::{TaskCache, TaskStore};

use crate::error::ServerError;
use crate::state::AppState;

/// Authenticated user information.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User ID.
    pub id: UserId,
    /// User email.
    pub email: String,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = auth::AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            id: claims.user_id()?,
            email: claims.email,
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(ServerError::AuthenticationRequired)
    }
}

/// Extracts the JWT token from the Authorization header.
fn extract_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "code": crate::error::error_codes::AUTHENTICATION_REQUIRED,
                "message": message,
            }
        })),
    )
        .into_response()
}

fn authenticate(jwt_manager: &JwtManager, token: &str) -> Option<AuthenticatedUser> {
    let claims = jwt_manager.validate_token(token).ok()?;
    AuthenticatedUser::try_from(claims).ok()
}

/// Authentication middleware.
///
/// Validates the bearer token and stores the authenticated user in the
/// request extensions. Requests without a valid token are rejected.
pub async fn auth_middleware<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: TaskStore + 'static,
    C: TaskCache + 'static,
{
    let Some(jwt_manager) = &state.jwt_manager else {
        tracing::error!("JWT manager not configured but database routes are enabled");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": {
                    "code": crate::error::error_codes::INTERNAL_ERROR,
                    "message": "Authentication misconfigured",
                }
            })),
        )
            .into_response();
    };

    let Some(token) = extract_token(&request) else {
        return unauthorized("Missing authorization header");
    };

    let Some(user) = authenticate(jwt_manager, token) else {
        return unauthorized("Invalid or expired token");
    };

    tracing::debug!(user_id = user.id, "Authenticated request");
    request.extensions_mut().insert(user);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use auth::JwtConfig;
    use axum::body::Body;

    use super::*;

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/tasksdb");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_authenticated_user_from_claims() {
        let claims = Claims::new(42, "test@example.com".to_string(), 24, "tasklist");

        let user = AuthenticatedUser::try_from(claims).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.email, "test@example.com");
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token(&request_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(extract_token(&request_with(Some("Basic credentials"))), None);
        assert_eq!(extract_token(&request_with(Some("Bearer "))), None);
        assert_eq!(extract_token(&request_with(None)), None);
    }

    #[test]
    fn test_authenticate() {
        let manager = JwtManager::new(JwtConfig::new("middleware-test-secret"));
        let token = manager.generate_token(5, "five@example.com").unwrap();

        assert_eq!(authenticate(&manager, &token).unwrap().id, 5);
        assert!(authenticate(&manager, "garbage").is_none());
    }
}
