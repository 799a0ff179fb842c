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

//! §4.E Session store — per-tenant revocation index.
//!
//! Tokens themselves are never persisted; only `sha2(token)`, URL-base64
//! encoded, is stored, so a leaked database file cannot be replayed into a
//! valid session without also forging a signature.

use crate::common::error::RepositoryResult;
use crate::identity::generate_session_id;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

pub async fn create_session(
    pool: &SqlitePool,
    user_id: Uuid,
    token_hash: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    lifetime_seconds: i64,
) -> RepositoryResult<String> {
    let session_id = generate_session_id();
    let now = Utc::now().timestamp();
    let expires_at = now + lifetime_seconds;

    sqlx::query(
        r#"
        INSERT INTO _wce_sessions
            (session_id, user_id, token_hash, created_at, expires_at, last_used, ip_address, user_agent)
        VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?6, ?7)
        "#,
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(token_hash)
    .bind(now)
    .bind(expires_at)
    .bind(ip_address)
    .bind(user_agent)
    .execute(pool)
    .await?;

    Ok(session_id)
}

pub async fn is_session_valid(pool: &SqlitePool, token_hash: &str) -> RepositoryResult<bool> {
    let now = Utc::now().timestamp();
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM _wce_sessions WHERE token_hash = ?1 AND expires_at > ?2",
    )
    .bind(token_hash)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn touch_last_used(pool: &SqlitePool, token_hash: &str) -> RepositoryResult<()> {
    let now = Utc::now().timestamp();
    sqlx::query("UPDATE _wce_sessions SET last_used = ?1 WHERE token_hash = ?2")
        .bind(now)
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn revoke_session(pool: &SqlitePool, token_hash: &str) -> RepositoryResult<()> {
    sqlx::query("DELETE FROM _wce_sessions WHERE token_hash = ?1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn revoke_all_user_sessions(pool: &SqlitePool, user_id: Uuid) -> RepositoryResult<()> {
    sqlx::query("DELETE FROM _wce_sessions WHERE user_id = ?1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn cleanup_expired_sessions(pool: &SqlitePool) -> RepositoryResult<u64> {
    let now = Utc::now().timestamp();
    let result = sqlx::query("DELETE FROM _wce_sessions WHERE expires_at <= ?1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cenv::schema::bootstrap;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn bootstrapped_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        bootstrap(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO _wce_users(user_id, username, password_hash, role, created_at) VALUES (?1, 'alice', 'x', 'owner', 0)",
        )
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn session_created_is_valid_and_revocable() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let hash = hash_token("sometoken");

        create_session(&pool, user_id, &hash, None, None, 3600)
            .await
            .unwrap();
        assert!(is_session_valid(&pool, &hash).await.unwrap());

        revoke_session(&pool, &hash).await.unwrap();
        assert!(!is_session_valid(&pool, &hash).await.unwrap());
    }

    #[tokio::test]
    async fn revoke_all_user_sessions_invalidates_every_token() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let hash_a = hash_token("a");
        let hash_b = hash_token("b");
        create_session(&pool, user_id, &hash_a, None, None, 3600)
            .await
            .unwrap();
        create_session(&pool, user_id, &hash_b, None, None, 3600)
            .await
            .unwrap();

        revoke_all_user_sessions(&pool, user_id).await.unwrap();

        assert!(!is_session_valid(&pool, &hash_a).await.unwrap());
        assert!(!is_session_valid(&pool, &hash_b).await.unwrap());
    }

    #[tokio::test]
    async fn cleanup_expired_sessions_removes_only_expired_rows() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let hash_live = hash_token("live");
        let hash_dead = hash_token("dead");
        create_session(&pool, user_id, &hash_live, None, None, 3600)
            .await
            .unwrap();
        create_session(&pool, user_id, &hash_dead, None, None, -1)
            .await
            .unwrap();

        let removed = cleanup_expired_sessions(&pool).await.unwrap();
        assert_eq!(removed, 1);
        assert!(is_session_valid(&pool, &hash_live).await.unwrap());
    }
}
