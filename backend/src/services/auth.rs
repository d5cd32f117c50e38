//! Authentication service for registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use shared::models::Role;
use shared::validation::{validate_org_code, validate_password};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a new organisation with owner account
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOrganizationInput {
    #[validate(length(min = 1, max = 120))]
    pub org_name: String,
    /// Short code used in exports and invite links (e.g. "BCH")
    pub org_code: String,
    pub region: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub owner_name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Input for logging in
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub org_id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub org_id: String,
    pub role: String,
    /// Platform operator; absent in tokens issued before the flag existed
    #[serde(default)]
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    org_id: Uuid,
    password_hash: String,
    role: String,
    is_active: bool,
    is_admin: bool,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new organisation with its owner account
    pub async fn register_organization(
        &self,
        input: RegisterOrganizationInput,
    ) -> AppResult<RegisterResponse> {
        input.validate().map_err(|e| AppError::Validation {
            field: "input".to_string(),
            message: e.to_string(),
        })?;

        validate_org_code(&input.org_code).map_err(|msg| AppError::Validation {
            field: "orgCode".to_string(),
            message: msg.to_string(),
        })?;

        validate_password(&input.password).map_err(|msg| AppError::Validation {
            field: "password".to_string(),
            message: msg.to_string(),
        })?;

        // Check if org code already exists
        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM organizations WHERE code = $1")
                .bind(&input.org_code)
                .fetch_one(&self.db)
                .await?;

        if existing > 0 {
            return Err(AppError::Conflict {
                resource: "organization".to_string(),
                message: "Organisation code already exists".to_string(),
            });
        }

        // Hash password
        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        // Start transaction
        let mut tx = self.db.begin().await?;

        let org_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO organizations (name, code, region)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&input.org_name)
        .bind(&input.org_code)
        .bind(&input.region)
        .fetch_one(&mut *tx)
        .await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (org_id, email, password_hash, name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(org_id)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.owner_name)
        .bind(Role::Owner.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let tokens = self.issue_tokens(user_id, org_id, Role::Owner, false)?;

        Ok(RegisterResponse {
            org_id,
            user_id,
            tokens,
        })
    }

    /// Authenticate a user and issue tokens
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, org_id, password_hash, role, is_active, is_admin FROM users WHERE email = $1",
        )
        .bind(&input.email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let valid = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let role = Role::from_str(&user.role).map_err(AppError::Internal)?;
        self.issue_tokens(user.id, user.org_id, role, user.is_admin)
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let claims = self.decode_token(refresh_token)?;

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        // Re-check the account still exists and is active
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, org_id, password_hash, role, is_active, is_admin FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            return Err(AppError::InvalidToken);
        }

        let role = Role::from_str(&user.role).map_err(AppError::Internal)?;
        self.issue_tokens(user.id, user.org_id, role, user.is_admin)
    }

    /// Issue an access/refresh token pair
    pub fn issue_tokens(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        role: Role,
        is_admin: bool,
    ) -> AppResult<AuthTokens> {
        let access_token =
            self.encode_token(user_id, org_id, role, is_admin, self.access_token_expiry)?;
        let refresh_token =
            self.encode_token(user_id, org_id, role, is_admin, self.refresh_token_expiry)?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    fn encode_token(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        role: Role,
        is_admin: bool,
        expiry_seconds: i64,
    ) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            org_id: org_id.to_string(),
            role: role.as_str().to_string(),
            is_admin,
            exp: (now + Duration::seconds(expiry_seconds)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Decode and validate a token issued by this service
    pub fn decode_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
    }
}
