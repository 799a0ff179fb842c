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

//! §4.F Request authenticator.
//!
//! An Axum `FromRequestParts` extractor, `AuthenticatedUser`: resolves the
//! CENV from the path, validates the bearer token's
//! signature and expiry, confirms the token's `cenv_id` matches the path's
//! tenant, and confirms the session hash is still present (not revoked) in
//! that tenant's session store. Any failure collapses to the same
//! `ApiError::Unauthenticated` — the caller never learns which check failed.

use crate::app::state::AppState;
use crate::auth::dto::Claims;
use crate::auth::session;
use crate::auth::token;
use crate::cenv::CenvManager;
use crate::common::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use sqlx::SqlitePool;
use uuid::Uuid;

/// The authenticated principal for one request, plus the tenant pool already
/// resolved so handlers never re-derive it.
pub struct AuthenticatedUser {
    pub claims: Claims,
    pub tenant_id: Uuid,
    pub pool: SqlitePool,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (tenant_id, _rest) = CenvManager::parse_path(parts.uri.path())
            .ok_or_else(|| ApiError::Unauthenticated("no such cenv".to_string()))?;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthenticated("missing bearer token".to_string()))?;
        let raw_token = bearer.token();

        let claims = token::validate(raw_token, state.jwt_secret())
            .map_err(|_| ApiError::Unauthenticated("invalid or expired token".to_string()))?;

        if claims.cenv_id != tenant_id {
            return Err(ApiError::Unauthenticated("token not valid for this cenv".to_string()));
        }

        let pool = state
            .cenv_manager
            .get_connection(tenant_id)
            .await
            .map_err(|_| ApiError::Unauthenticated("no such cenv".to_string()))?;

        let token_hash = session::hash_token(raw_token);
        let valid = session::is_session_valid(&pool, &token_hash)
            .await
            .map_err(|_| ApiError::Unauthenticated("session revoked".to_string()))?;
        if !valid {
            return Err(ApiError::Unauthenticated("session revoked".to_string()));
        }

        session::touch_last_used(&pool, &token_hash).await.ok();

        Ok(AuthenticatedUser {
            claims,
            tenant_id,
            pool,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::role::Role;
    use crate::cenv::schema::bootstrap;
    use axum::body::Body;
    use axum::http::Request;

    async fn seeded_state_and_tenant() -> (AppState, Uuid) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(dir.path());
        let tenant_id = Uuid::new_v4();
        state.cenv_manager.create(tenant_id).await.unwrap();
        (state, tenant_id)
    }

    #[tokio::test]
    async fn valid_token_and_session_resolves_principal() {
        let (state, tenant_id) = seeded_state_and_tenant().await;
        let pool = state.cenv_manager.get_connection(tenant_id).await.unwrap();
        bootstrap(&pool).await.unwrap();

        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO _wce_users(user_id, username, password_hash, role, created_at) VALUES (?1, 'alice', 'x', 'owner', 0)",
        )
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

        let (token_str, _exp) =
            token::generate(user_id, "alice", tenant_id, Role::Owner, 3600, state.jwt_secret())
                .unwrap();
        let hash = session::hash_token(&token_str);
        session::create_session(&pool, user_id, &hash, None, None, 3600)
            .await
            .unwrap();

        let req = Request::builder()
            .uri(format!("/{tenant_id}/documents"))
            .header("authorization", format!("Bearer {token_str}"))
            .body(Body::empty())
            .unwrap();
        let (mut parts, _body) = req.into_parts();

        let user = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.claims.user_id, user_id);
        assert_eq!(user.tenant_id, tenant_id);
    }

    #[tokio::test]
    async fn token_for_a_different_tenant_is_rejected() {
        let (state, tenant_id) = seeded_state_and_tenant().await;
        let other_tenant = Uuid::new_v4();

        let (token_str, _exp) = token::generate(
            Uuid::new_v4(),
            "alice",
            other_tenant,
            Role::Owner,
            3600,
            state.jwt_secret(),
        )
        .unwrap();

        let req = Request::builder()
            .uri(format!("/{tenant_id}/documents"))
            .header("authorization", format!("Bearer {token_str}"))
            .body(Body::empty())
            .unwrap();
        let (mut parts, _body) = req.into_parts();

        assert!(
            AuthenticatedUser::from_request_parts(&mut parts, &state)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn revoked_session_is_rejected() {
        let (state, tenant_id) = seeded_state_and_tenant().await;
        let pool = state.cenv_manager.get_connection(tenant_id).await.unwrap();
        bootstrap(&pool).await.unwrap();

        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO _wce_users(user_id, username, password_hash, role, created_at) VALUES (?1, 'alice', 'x', 'owner', 0)",
        )
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

        let (token_str, _exp) =
            token::generate(user_id, "alice", tenant_id, Role::Owner, 3600, state.jwt_secret())
                .unwrap();
        let hash = session::hash_token(&token_str);
        session::create_session(&pool, user_id, &hash, None, None, 3600)
            .await
            .unwrap();
        session::revoke_session(&pool, &hash).await.unwrap();

        let req = Request::builder()
            .uri(format!("/{tenant_id}/documents"))
            .header("authorization", format!("Bearer {token_str}"))
            .body(Body::empty())
            .unwrap();
        let (mut parts, _body) = req.into_parts();

        assert!(
            AuthenticatedUser::from_request_parts(&mut parts, &state)
                .await
                .is_err()
        );
    }
}
