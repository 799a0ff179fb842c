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

//! Audit log (§3 `_wce_audit_log`, supplemented write path — see SPEC_FULL.md).
//!
//! Insert-only: nothing here ever updates or deletes a row. Failure to write
//! an audit entry never aborts the mutation it's describing — audit logging
//! is best-effort observability, not a transactional guarantee — so callers
//! log-and-ignore rather than propagate.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub created_at: i64,
}

/// Appends one row. `action` is a short, stable label such as
/// `"login_success"`, `"login_failure"`, `"session_revoked"`,
/// `"permission_granted"`, `"permission_revoked"`, `"row_policy_created"`,
/// `"endpoint_created"`, `"endpoint_deleted"`.
pub async fn record(
    pool: &SqlitePool,
    user_id: Option<Uuid>,
    action: &str,
    table_name: Option<&str>,
    record_id: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO _wce_audit_log(user_id, action, table_name, record_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(table_name)
    .bind(record_id)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
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
    async fn record_appends_a_row() {
        let pool = bootstrapped_pool().await;
        let user_id = Uuid::new_v4();
        record(&pool, Some(user_id), "login_success", None, None)
            .await
            .unwrap();

        let rows: Vec<AuditLogRow> =
            sqlx::query_as("SELECT id, user_id, action, table_name, record_id, created_at FROM _wce_audit_log")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "login_success");
        assert_eq!(rows[0].user_id, Some(user_id));
    }

    #[tokio::test]
    async fn record_tolerates_a_null_user_and_table() {
        let pool = bootstrapped_pool().await;
        record(&pool, None, "login_failure", None, None).await.unwrap();

        let rows: Vec<AuditLogRow> =
            sqlx::query_as("SELECT id, user_id, action, table_name, record_id, created_at FROM _wce_audit_log")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].user_id.is_none());
    }
}
