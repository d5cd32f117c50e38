//! Authentication middleware
//!
//! JWT authentication and role-based access control middleware

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::str::FromStr;

use shared::models::Role;

use crate::error::ErrorResponse;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub org_id: uuid::Uuid,
    pub role: Role,
    pub is_admin: bool,
}

impl AuthUser {
    /// Whether the user can manage org members and review entries
    pub fn can_manage_org(&self) -> bool {
        self.role.can_manage_org()
    }

    /// Whether the user can manage billing for the org
    pub fn can_manage_billing(&self) -> bool {
        self.role.can_manage_billing()
    }

    /// Platform operator; gates cross-org surfaces (revenue dashboard,
    /// medicine catalogue maintenance). Independent of the org role.
    pub fn is_platform_admin(&self) -> bool {
        self.is_admin
    }
}

/// Authentication middleware that validates JWT tokens.
/// The token is validated inline to avoid state dependency issues.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    // Extract Authorization header
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
    let jwt_secret = std::env::var("SITEBOOK__JWT__SECRET")
        .or_else(|_| std::env::var("SITEBOOK_JWT_SECRET"))
        .unwrap_or_else(|_| "development-secret-key".to_string());

    let claims = match decode_jwt(token, &jwt_secret) {
        Ok(claims) => claims,
        Err(msg) => {
            return unauthorized_response(&msg);
        }
    };

    // Parse identifiers from claims
    let user_id = match uuid::Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let org_id = match uuid::Uuid::parse_str(&claims.org_id) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid organisation ID in token"),
    };

    let role = match Role::from_str(&claims.role) {
        Ok(role) => role,
        Err(_) => return unauthorized_response("Invalid role in token"),
    };

    // Create AuthUser and insert into request extensions
    let auth_user = AuthUser {
        user_id,
        org_id,
        role,
        is_admin: claims.is_admin,
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    org_id: String,
    role: String,
    /// Tokens issued before the flag existed carry no claim; they decode
    /// as non-admin
    #[serde(default)]
    is_admin: bool,
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

/// Extractor for the authenticated user; use this in handlers
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
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
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
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

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn user(role: Role, is_admin: bool) -> AuthUser {
        AuthUser {
            user_id: uuid::Uuid::new_v4(),
            org_id: uuid::Uuid::new_v4(),
            role,
            is_admin,
        }
    }

    fn token(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn token_without_admin_claim_decodes_as_non_admin() {
        let secret = "test-secret";
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = serde_json::json!({
            "sub": uuid::Uuid::new_v4().to_string(),
            "org_id": uuid::Uuid::new_v4().to_string(),
            "role": "owner",
            "exp": exp,
            "iat": exp - 3600,
        });

        let decoded = decode_jwt(&token(&claims, secret), secret).unwrap();
        assert!(!decoded.is_admin);
    }

    #[test]
    fn token_with_admin_claim_decodes_as_admin() {
        let secret = "test-secret";
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = serde_json::json!({
            "sub": uuid::Uuid::new_v4().to_string(),
            "org_id": uuid::Uuid::new_v4().to_string(),
            "role": "apprentice",
            "is_admin": true,
            "exp": exp,
            "iat": exp - 3600,
        });

        let decoded = decode_jwt(&token(&claims, secret), secret).unwrap();
        assert!(decoded.is_admin);
    }

    #[test]
    fn platform_admin_is_independent_of_org_role() {
        // An org owner is not a platform operator
        assert!(!user(Role::Owner, false).is_platform_admin());
        assert!(!user(Role::Supervisor, false).is_platform_admin());
        // The flag grants it regardless of role
        assert!(user(Role::Apprentice, true).is_platform_admin());
    }

    #[test]
    fn org_permissions_unchanged_by_admin_flag() {
        assert!(user(Role::Owner, false).can_manage_billing());
        assert!(!user(Role::Supervisor, false).can_manage_billing());
        assert!(!user(Role::Apprentice, true).can_manage_org());
    }
}
