/*
 * This file is part of wce.
 *
 * Copyright (C) 2026 the wce authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! HTTP handlers for CENV creation and login (§6).

use crate::app::state::AppState;
use crate::audit;
use crate::auth::dto::{CreateCenvRequest, CreateCenvResponse, LoginRequest, LoginResponse};
use crate::auth::{session, token, AuthenticatedUser};
use crate::authz::role::Role;
use crate::common::error::{ApiError, ApiResult};
use crate::common::extractors::{ClientContext, ValidJson};
use crate::identity::{generate_uuid, PasswordHasher};
use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

/// `POST /new` — provisions a brand-new CENV with its owner account (§4.B, §6).
///
/// There is no manager-plane registration to collide with; uniqueness comes
/// from generating a fresh UUID and letting `CenvManager::create` fail if, by
/// some vanishing probability, the file already exists.
pub async fn create_cenv(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateCenvRequest>,
) -> ApiResult<(axum::http::StatusCode, Json<CreateCenvResponse>)> {
    if body.username.trim().is_empty() || body.password.len() < 8 {
        return Err(ApiError::Validation(
            "username must be non-empty and password at least 8 characters".to_string(),
        ));
    }

    let tenant_id = generate_uuid();
    state.cenv_manager.create(tenant_id).await?;
    let pool = state.cenv_manager.get_connection(tenant_id).await?;

    let password_hash = state
        .password_hasher
        .hash_password(&body.password)
        .map_err(ApiError::Internal)?;
    let user_id = generate_uuid();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO _wce_users(user_id, username, password_hash, role, email, created_at) \
         VALUES (?1, ?2, ?3, 'owner', ?4, ?5)",
    )
    .bind(user_id)
    .bind(&body.username)
    .bind(&password_hash)
    .bind(&body.email)
    .bind(now)
    .execute(&pool)
    .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateCenvResponse {
            cenv_id: tenant_id,
            cenv_url: format!("/{tenant_id}"),
            username: body.username,
            message: "cenv created".to_string(),
        }),
    ))
}

/// `POST /{tenant}/login` — authenticates against that CENV's own user table.
///
/// Unknown username, wrong password, and a disabled account all produce the
/// identical 401 body (§7 anti-enumeration requirement). A dummy hash
/// verification runs on the unknown-user path so response latency doesn't
/// leak which branch was taken (§9 design note).
pub async fn login(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    client: ClientContext,
    ValidJson(body): ValidJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let pool = state.cenv_manager.get_connection(tenant_id).await?;

    let row: Option<(Uuid, String, String, bool)> = sqlx::query_as(
        "SELECT user_id, password_hash, role, enabled FROM _wce_users WHERE username = ?1",
    )
    .bind(&body.username)
    .fetch_optional(&pool)
    .await?;

    let (user_id, password_hash, role_str, enabled) = match row {
        Some(row) => row,
        None => {
            // Still pay the hashing cost so timing doesn't distinguish this branch.
            let _ = state.password_hasher.verify_password(&body.password, DUMMY_HASH);
            audit::record(&pool, None, "login_failure", None, Some(&body.username))
                .await
                .ok();
            return Err(unauthenticated());
        }
    };

    let verified = state
        .password_hasher
        .verify_password(&body.password, &password_hash)
        .map_err(ApiError::Internal)?;
    if !verified || !enabled {
        audit::record(&pool, Some(user_id), "login_failure", None, Some(&body.username))
            .await
            .ok();
        return Err(unauthenticated());
    }

    let role = Role::parse(&role_str).ok_or_else(|| {
        ApiError::Internal(format!("user {user_id} carries unrecognized role {role_str}"))
    })?;

    let lifetime_seconds = session_lifetime_seconds(&pool).await?;
    let (token_str, expires_at) = token::generate(
        user_id,
        &body.username,
        tenant_id,
        role,
        lifetime_seconds,
        state.jwt_secret(),
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let token_hash = session::hash_token(&token_str);
    session::create_session(
        &pool,
        user_id,
        &token_hash,
        client.ip.as_ref().map(|ip| ip.to_string()).as_deref(),
        client.user_agent.as_deref(),
        lifetime_seconds,
    )
    .await?;

    sqlx::query("UPDATE _wce_users SET last_login = ?1 WHERE user_id = ?2")
        .bind(chrono::Utc::now().timestamp())
        .bind(user_id)
        .execute(&pool)
        .await?;

    audit::record(&pool, Some(user_id), "login_success", None, None)
        .await
        .ok();

    Ok(Json(LoginResponse {
        token: token_str,
        expires_at,
        user_id,
        username: body.username,
        role,
    }))
}

/// `POST /{tenant}/logout` — revokes the session tied to the caller's own
/// token (§4.E `revoke_session`). Does not affect the caller's other sessions.
pub async fn logout(user: AuthenticatedUser, headers: axum::http::HeaderMap) -> ApiResult<()> {
    let raw_token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthenticated("missing bearer token".to_string()))?;
    let hash = session::hash_token(raw_token);
    session::revoke_session(&user.pool, &hash).await?;
    audit::record(&user.pool, Some(user.claims.user_id), "session_revoked", None, None)
        .await
        .ok();
    Ok(())
}

async fn session_lifetime_seconds(pool: &sqlx::SqlitePool) -> ApiResult<i64> {
    let hours: Option<String> =
        sqlx::query_scalar("SELECT value FROM _wce_config WHERE key = 'session_timeout_hours'")
            .fetch_optional(pool)
            .await?;
    let hours: i64 = hours.and_then(|s| s.parse().ok()).unwrap_or(24);
    Ok(hours * 3600)
}

fn unauthenticated() -> ApiError {
    ApiError::Unauthenticated("invalid credentials".to_string())
}

/// A precomputed Argon2id hash of a password nobody will ever submit, so the
/// unknown-user branch still performs a verification of comparable cost.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
