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

//! §4.A Schema bootstrap.
//!
//! Creates the canonical set of system tables (all prefixed `_wce_`, the
//! protected-table marker the authorization oracle keys off of — §3, §4.G),
//! their indexes, the full-text search virtual table, and the document
//! triggers that keep it in sync. Runs inside one transaction and uses
//! `IF NOT EXISTS`/`INSERT OR IGNORE` throughout so re-running it on an
//! already-bootstrapped file is a no-op (§8 idempotence invariant).

use crate::common::error::RepositoryResult;
use sqlx::SqlitePool;

const DEFAULT_CONFIG: &[(&str, &str)] = &[
    ("session_timeout_hours", "24"),
    ("allow_registration", "false"),
    ("max_users", "10"),
];

pub async fn bootstrap(pool: &SqlitePool) -> RepositoryResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_users (
            user_id      TEXT PRIMARY KEY,
            username     TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role         TEXT NOT NULL,
            email        TEXT,
            created_at   INTEGER NOT NULL,
            invited_by   TEXT REFERENCES _wce_users(user_id),
            last_login   INTEGER,
            enabled      INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_wce_users_username ON _wce_users(username)")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_sessions (
            session_id  TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES _wce_users(user_id) ON DELETE CASCADE,
            token_hash  TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            expires_at  INTEGER NOT NULL,
            last_used   INTEGER,
            ip_address  TEXT,
            user_agent  TEXT
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wce_sessions_token_hash ON _wce_sessions(token_hash)",
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wce_sessions_expires_at ON _wce_sessions(expires_at)",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_table_permissions (
            table_name TEXT NOT NULL,
            user_id    TEXT NOT NULL,
            can_read   INTEGER NOT NULL DEFAULT 0,
            can_write  INTEGER NOT NULL DEFAULT 0,
            can_delete INTEGER NOT NULL DEFAULT 0,
            can_grant  INTEGER NOT NULL DEFAULT 0,
            UNIQUE(table_name, user_id)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wce_table_perms_user ON _wce_table_permissions(user_id)",
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wce_table_perms_table ON _wce_table_permissions(table_name)",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_row_policies (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name    TEXT NOT NULL,
            user_id       TEXT,
            policy_type   TEXT NOT NULL,
            sql_condition TEXT NOT NULL,
            created_at    INTEGER NOT NULL,
            created_by    TEXT NOT NULL REFERENCES _wce_users(user_id)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wce_row_policies_table_type ON _wce_row_policies(table_name, policy_type)",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_audit_log (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    TEXT,
            action     TEXT NOT NULL,
            table_name TEXT,
            record_id  TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wce_audit_log_created_at ON _wce_audit_log(created_at)",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_documents (
            id            TEXT PRIMARY KEY,
            content       TEXT NOT NULL,
            content_type  TEXT NOT NULL,
            is_binary     INTEGER NOT NULL DEFAULT 0,
            searchable    INTEGER NOT NULL DEFAULT 1,
            created_at    INTEGER NOT NULL,
            modified_at   INTEGER NOT NULL,
            created_by    TEXT NOT NULL REFERENCES _wce_users(user_id),
            modified_by   TEXT NOT NULL REFERENCES _wce_users(user_id),
            version       INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wce_documents_content_type ON _wce_documents(content_type)",
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wce_documents_modified_at ON _wce_documents(modified_at)",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_document_tags (
            document_id TEXT NOT NULL REFERENCES _wce_documents(id) ON DELETE CASCADE,
            tag         TEXT NOT NULL,
            UNIQUE(document_id, tag)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_wce_document_tags_tag ON _wce_document_tags(tag)")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS _wce_documents_fts USING fts5(
            docid UNINDEXED,
            content
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Triggers maintaining the FTS shadow index (§4.A).
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS trg_wce_documents_ai AFTER INSERT ON _wce_documents BEGIN
            INSERT INTO _wce_documents_fts(docid, content)
            VALUES (new.id, CASE WHEN new.searchable = 1 THEN new.content ELSE '' END);
        END
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS trg_wce_documents_ad AFTER DELETE ON _wce_documents BEGIN
            DELETE FROM _wce_documents_fts WHERE docid = old.id;
        END
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS trg_wce_documents_au AFTER UPDATE ON _wce_documents BEGIN
            DELETE FROM _wce_documents_fts WHERE docid = old.id;
            INSERT INTO _wce_documents_fts(docid, content)
            VALUES (new.id, CASE WHEN new.searchable = 1 THEN new.content ELSE '' END);
        END
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _wce_endpoints (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            path         TEXT NOT NULL,
            method       TEXT NOT NULL,
            script       TEXT NOT NULL,
            description  TEXT,
            enabled      INTEGER NOT NULL DEFAULT 0,
            created_at   INTEGER NOT NULL,
            modified_at  INTEGER NOT NULL,
            UNIQUE(path, method)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_wce_endpoints_path ON _wce_endpoints(path)")
        .execute(&mut *tx)
        .await?;

    for (key, value) in DEFAULT_CONFIG {
        sqlx::query("INSERT OR IGNORE INTO _wce_config(key, value) VALUES (?1, ?2)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// The reserved marker identifying system-managed tables (§3, §4.G).
pub const SYSTEM_TABLE_PREFIX: &str = "_wce_";

pub fn is_system_table(table_name: &str) -> bool {
    table_name.starts_with(SYSTEM_TABLE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let pool = memory_pool().await;
        bootstrap(&pool).await.unwrap();
        bootstrap(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM _wce_config")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, DEFAULT_CONFIG.len() as i64);
    }

    #[tokio::test]
    async fn default_config_rows_are_present() {
        let pool = memory_pool().await;
        bootstrap(&pool).await.unwrap();

        let value: String =
            sqlx::query_scalar("SELECT value FROM _wce_config WHERE key = 'session_timeout_hours'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(value, "24");
    }

    #[test]
    fn system_table_prefix_matches() {
        assert!(is_system_table("_wce_users"));
        assert!(!is_system_table("customers"));
    }
}
