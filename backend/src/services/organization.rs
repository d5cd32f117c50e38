//! Organisation and member management service

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use shared::models::{Organization, Role, User};

use crate::error::{AppError, AppResult};

/// Organisation service
#[derive(Clone)]
pub struct OrganizationService {
    db: PgPool,
}

/// Input for adding a member to an organisation
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Input for changing a member's role
#[derive(Debug, Deserialize)]
pub struct UpdateMemberInput {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    code: String,
    region: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    org_id: Uuid,
    email: String,
    name: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemberRow {
    fn into_user(self) -> AppResult<User> {
        let role = Role::from_str(&self.role).map_err(AppError::Internal)?;
        Ok(User {
            id: self.id,
            org_id: self.org_id,
            email: self.email,
            name: self.name,
            role,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl OrganizationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get the organisation record
    pub async fn get_organization(&self, org_id: Uuid) -> AppResult<Organization> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, code, region, created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(org_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Organisation".to_string()))?;

        Ok(Organization {
            id: row.id,
            name: row.name,
            code: row.code,
            region: row.region,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// List members of an organisation
    pub async fn list_members(&self, org_id: Uuid) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT id, org_id, email, name, role, is_active, created_at, updated_at
            FROM users
            WHERE org_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MemberRow::into_user).collect()
    }

    /// Add a member to the organisation
    pub async fn add_member(&self, org_id: Uuid, input: AddMemberInput) -> AppResult<User> {
        input.validate().map_err(|e| AppError::Validation {
            field: "input".to_string(),
            message: e.to_string(),
        })?;

        shared::validation::validate_password(&input.password).map_err(|msg| {
            AppError::Validation {
                field: "password".to_string(),
                message: msg.to_string(),
            }
        })?;

        // An org has exactly one owner, created at registration
        if input.role == Role::Owner {
            return Err(AppError::Validation {
                field: "role".to_string(),
                message: "Members cannot be added as owners".to_string(),
            });
        }

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(&input.email)
            .fetch_one(&self.db)
            .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

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
        .bind(&input.name)
        .bind(input.role.as_str())
        .fetch_one(&self.db)
        .await?;

        self.get_member(org_id, user_id).await
    }

    /// Get a single member
    pub async fn get_member(&self, org_id: Uuid, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT id, org_id, email, name, role, is_active, created_at, updated_at
            FROM users
            WHERE id = $1 AND org_id = $2
            "#,
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))?;

        row.into_user()
    }

    /// Update a member's role or active flag
    pub async fn update_member(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        input: UpdateMemberInput,
    ) -> AppResult<User> {
        let existing = self.get_member(org_id, user_id).await?;

        // The owner role can neither be granted nor revoked here
        if existing.role == Role::Owner || input.role == Some(Role::Owner) {
            return Err(AppError::Validation {
                field: "role".to_string(),
                message: "Owner role cannot be changed".to_string(),
            });
        }

        let role = input.role.unwrap_or(existing.role);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        sqlx::query("UPDATE users SET role = $1, is_active = $2, updated_at = NOW() WHERE id = $3")
            .bind(role.as_str())
            .bind(is_active)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        self.get_member(org_id, user_id).await
    }
}
