//! Tenant resolution middleware
//!
//! Authentication itself is an external collaborator; this middleware only
//! verifies the bearer token that collaborator issued and turns its claims
//! into a validated `TenantContext`. Every downstream query is scoped by
//! the tenant id carried here, never by a client-supplied body field.

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use shared::TenantRole;

use crate::error::ErrorResponse;

/// Validated tenant identity for the current request
#[derive(Clone, Debug)]
pub struct TenantContext {
    pub tenant_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub role: TenantRole,
}

impl TenantContext {
    pub fn is_manager(&self) -> bool {
        self.role == TenantRole::Manager
    }
}

/// Middleware that validates the bearer token and attaches a TenantContext
pub async fn tenant_middleware(mut request: Request, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    // Get JWT secret from environment (fallback for middleware without state)
    let jwt_secret = std::env::var("FARMSTOCK__JWT__SECRET")
        .or_else(|_| std::env::var("FARMSTOCK_JWT_SECRET"))
        .unwrap_or_else(|_| "development-secret-key".to_string());

    let claims = match decode_jwt(token, &jwt_secret) {
        Ok(claims) => claims,
        Err(msg) => {
            return unauthorized_response(&msg);
        }
    };

    let user_id = match uuid::Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let tenant_id = match uuid::Uuid::parse_str(&claims.tenant_id) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid tenant ID in token"),
    };

    let context = TenantContext {
        tenant_id,
        user_id,
        role: TenantRole::parse(&claims.role),
    };

    request.extensions_mut().insert(context);

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    tenant_id: String,
    role: String,
    exp: i64,
    iat: i64,
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: crate::error::ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for the validated tenant context
/// Use this in handlers to get the current tenant
#[derive(Clone, Debug)]
pub struct CurrentTenant(pub TenantContext);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .map(CurrentTenant)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: crate::error::ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message: "Authentication required".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
