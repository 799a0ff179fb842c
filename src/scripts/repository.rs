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

//! Persistence for `_wce_endpoints` (§3 ScriptedEndpoint, §4.J).

use crate::common::error::RepositoryResult;
#[cfg(test)]
use mockall::automock;
use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EndpointRow {
    pub id: i64,
    pub path: String,
    pub method: String,
    pub script: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at: i64,
    pub modified_at: i64,
}

/// Listing omits the script body (§4.J "endpoint listing omits the script body").
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EndpointSummary {
    pub id: i64,
    pub path: String,
    pub method: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at: i64,
    pub modified_at: i64,
}

#[async_trait::async_trait]
#[cfg_attr(test, automock)]
pub trait EndpointsRepository: Send + Sync {
    /// Upserts on `(path, method)`: a repeat create updates script,
    /// description, enabled, and modified metadata (§3 ScriptedEndpoint).
    async fn upsert(
        &self,
        pool: &SqlitePool,
        path: &str,
        method: &str,
        script: &str,
        description: Option<&str>,
        enabled: bool,
    ) -> RepositoryResult<EndpointRow>;

    async fn list(&self, pool: &SqlitePool) -> RepositoryResult<Vec<EndpointSummary>>;

    async fn delete(&self, pool: &SqlitePool, id: i64) -> RepositoryResult<()>;

    /// Resolves a scripted endpoint for dispatch (§4.J): the single row whose
    /// path matches and whose method equals the request method or `*`,
    /// preferring an exact method match, restricted to enabled rows.
    async fn find_for_dispatch(
        &self,
        pool: &SqlitePool,
        path: &str,
        method: &str,
    ) -> RepositoryResult<Option<EndpointRow>>;
}

pub struct SqliteEndpointsRepository;

#[async_trait::async_trait]
impl EndpointsRepository for SqliteEndpointsRepository {
    async fn upsert(
        &self,
        pool: &SqlitePool,
        path: &str,
        method: &str,
        script: &str,
        description: Option<&str>,
        enabled: bool,
    ) -> RepositoryResult<EndpointRow> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO _wce_endpoints(path, method, script, description, enabled, created_at, modified_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(path, method) DO UPDATE SET
                script = excluded.script,
                description = excluded.description,
                enabled = excluded.enabled,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(path)
        .bind(method)
        .bind(script)
        .bind(description)
        .bind(enabled)
        .bind(now)
        .execute(pool)
        .await?;

        sqlx::query_as::<_, EndpointRow>(
            "SELECT id, path, method, script, description, enabled, created_at, modified_at \
             FROM _wce_endpoints WHERE path = ?1 AND method = ?2",
        )
        .bind(path)
        .bind(method)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    async fn list(&self, pool: &SqlitePool) -> RepositoryResult<Vec<EndpointSummary>> {
        let rows = sqlx::query_as::<_, EndpointSummary>(
            "SELECT id, path, method, description, enabled, created_at, modified_at \
             FROM _wce_endpoints ORDER BY path, method",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    async fn delete(&self, pool: &SqlitePool, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM _wce_endpoints WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(crate::common::error::RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_for_dispatch(
        &self,
        pool: &SqlitePool,
        path: &str,
        method: &str,
    ) -> RepositoryResult<Option<EndpointRow>> {
        let row = sqlx::query_as::<_, EndpointRow>(
            r#"
            SELECT id, path, method, script, description, enabled, created_at, modified_at
            FROM _wce_endpoints
            WHERE path = ?1 AND enabled = 1 AND (method = ?2 OR method = '*')
            ORDER BY CASE WHEN method = ?2 THEN 0 ELSE 1 END
            LIMIT 1
            "#,
        )
        .bind(path)
        .bind(method)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }
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

    #[tokio::test]
    async fn upsert_then_upsert_again_updates_in_place() {
        let pool = bootstrapped_pool().await;
        let repo = SqliteEndpointsRepository;

        let first = repo
            .upsert(&pool, "/hello", "GET", "fn handle_request(req) {}", None, true)
            .await
            .unwrap();
        let second = repo
            .upsert(
                &pool,
                "/hello",
                "GET",
                "fn handle_request(req) { response(#{}) }",
                Some("updated"),
                false,
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.description.as_deref(), Some("updated"));
        assert!(!second.enabled);

        let listed = repo.list(&pool).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn dispatch_prefers_exact_method_match_over_wildcard() {
        let pool = bootstrapped_pool().await;
        let repo = SqliteEndpointsRepository;
        repo.upsert(&pool, "/hello", "*", "fn handle_request(req) {}", None, true)
            .await
            .unwrap();
        repo.upsert(&pool, "/hello", "GET", "fn handle_request(req) { 1 }", None, true)
            .await
            .unwrap();

        let found = repo
            .find_for_dispatch(&pool, "/hello", "GET")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.method, "GET");
    }

    #[tokio::test]
    async fn dispatch_ignores_disabled_rows() {
        let pool = bootstrapped_pool().await;
        let repo = SqliteEndpointsRepository;
        repo.upsert(&pool, "/hello", "GET", "fn handle_request(req) {}", None, false)
            .await
            .unwrap();

        assert!(
            repo.find_for_dispatch(&pool, "/hello", "GET")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_missing_endpoint_is_not_found() {
        let pool = bootstrapped_pool().await;
        let repo = SqliteEndpointsRepository;
        assert!(repo.delete(&pool, 999).await.is_err());
    }
}
