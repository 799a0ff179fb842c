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

//! Repository-seam for `_wce_table_permissions` and `_wce_row_policies`
//! (teacher's `#[cfg_attr(test, automock)]` trait-per-table pattern).

use crate::authz::oracle::TablePermissionRow;
use crate::common::error::RepositoryResult;
#[cfg(test)]
use mockall::automock;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TablePermission {
    pub table_name: String,
    pub user_id: Uuid,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_grant: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RowPolicy {
    pub id: i64,
    pub table_name: String,
    pub user_id: Option<Uuid>,
    pub policy_type: String,
    pub sql_condition: String,
    pub created_at: i64,
    pub created_by: Uuid,
}

#[async_trait::async_trait]
#[cfg_attr(test, automock)]
pub trait TablePermissionsRepository: Send + Sync {
    async fn get(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Uuid,
    ) -> RepositoryResult<Option<TablePermissionRow>>;

    async fn grant(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Uuid,
        can_read: bool,
        can_write: bool,
        can_delete: bool,
        can_grant: bool,
    ) -> RepositoryResult<()>;

    async fn revoke(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Uuid,
    ) -> RepositoryResult<()>;

    async fn list_for_table(
        &self,
        pool: &SqlitePool,
        table_name: &str,
    ) -> RepositoryResult<Vec<TablePermission>>;

    async fn list_for_user(
        &self,
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> RepositoryResult<Vec<TablePermission>>;
}

pub struct SqliteTablePermissionsRepository;

#[async_trait::async_trait]
impl TablePermissionsRepository for SqliteTablePermissionsRepository {
    async fn get(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Uuid,
    ) -> RepositoryResult<Option<TablePermissionRow>> {
        let row: Option<(bool, bool, bool, bool)> = sqlx::query_as(
            "SELECT can_read, can_write, can_delete, can_grant FROM _wce_table_permissions \
             WHERE table_name = ?1 AND user_id = ?2",
        )
        .bind(table_name)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(can_read, can_write, can_delete, can_grant)| TablePermissionRow {
            can_read,
            can_write,
            can_delete,
            can_grant,
        }))
    }

    async fn grant(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Uuid,
        can_read: bool,
        can_write: bool,
        can_delete: bool,
        can_grant: bool,
    ) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO _wce_table_permissions(table_name, user_id, can_read, can_write, can_delete, can_grant)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(table_name, user_id) DO UPDATE SET
                can_read = excluded.can_read,
                can_write = excluded.can_write,
                can_delete = excluded.can_delete,
                can_grant = excluded.can_grant
            "#,
        )
        .bind(table_name)
        .bind(user_id)
        .bind(can_read)
        .bind(can_write)
        .bind(can_delete)
        .bind(can_grant)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn revoke(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Uuid,
    ) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM _wce_table_permissions WHERE table_name = ?1 AND user_id = ?2")
            .bind(table_name)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    async fn list_for_table(
        &self,
        pool: &SqlitePool,
        table_name: &str,
    ) -> RepositoryResult<Vec<TablePermission>> {
        let rows = sqlx::query_as::<_, TablePermission>(
            "SELECT table_name, user_id, can_read, can_write, can_delete, can_grant \
             FROM _wce_table_permissions WHERE table_name = ?1 ORDER BY user_id",
        )
        .bind(table_name)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    async fn list_for_user(
        &self,
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> RepositoryResult<Vec<TablePermission>> {
        let rows = sqlx::query_as::<_, TablePermission>(
            "SELECT table_name, user_id, can_read, can_write, can_delete, can_grant \
             FROM _wce_table_permissions WHERE user_id = ?1 ORDER BY table_name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait::async_trait]
#[cfg_attr(test, automock)]
pub trait RowPoliciesRepository: Send + Sync {
    async fn create(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Option<Uuid>,
        policy_type: &str,
        sql_condition: &str,
        created_by: Uuid,
    ) -> RepositoryResult<i64>;

    async fn list_for_table(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Uuid,
    ) -> RepositoryResult<Vec<RowPolicy>>;

    /// Admin listing (§6 `GET /admin/policies?table_name=&policy_type=`):
    /// every policy of the given type on the table, global and per-user
    /// alike — unlike [`Self::list_for_table`], which narrows to one
    /// caller's applicable set for rewriting their query.
    async fn list_for_table_and_type(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        policy_type: &str,
    ) -> RepositoryResult<Vec<RowPolicy>>;

    async fn delete(&self, pool: &SqlitePool, policy_id: i64) -> RepositoryResult<()>;
}

pub struct SqliteRowPoliciesRepository;

#[async_trait::async_trait]
impl RowPoliciesRepository for SqliteRowPoliciesRepository {
    async fn create(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Option<Uuid>,
        policy_type: &str,
        sql_condition: &str,
        created_by: Uuid,
    ) -> RepositoryResult<i64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO _wce_row_policies(table_name, user_id, policy_type, sql_condition, created_at, created_by)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(table_name)
        .bind(user_id)
        .bind(policy_type)
        .bind(sql_condition)
        .bind(now)
        .bind(created_by)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Policies apply either to everyone (`user_id IS NULL`) or to the named
    /// user — both rows are combined by conjunction when rewriting a query
    /// (§4.H), so both are returned here.
    async fn list_for_table(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        user_id: Uuid,
    ) -> RepositoryResult<Vec<RowPolicy>> {
        let rows = sqlx::query_as::<_, RowPolicy>(
            "SELECT id, table_name, user_id, policy_type, sql_condition, created_at, created_by \
             FROM _wce_row_policies WHERE table_name = ?1 AND (user_id IS NULL OR user_id = ?2) ORDER BY id",
        )
        .bind(table_name)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    async fn list_for_table_and_type(
        &self,
        pool: &SqlitePool,
        table_name: &str,
        policy_type: &str,
    ) -> RepositoryResult<Vec<RowPolicy>> {
        let rows = sqlx::query_as::<_, RowPolicy>(
            "SELECT id, table_name, user_id, policy_type, sql_condition, created_at, created_by \
             FROM _wce_row_policies WHERE table_name = ?1 AND policy_type = ?2 ORDER BY id",
        )
        .bind(table_name)
        .bind(policy_type)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    async fn delete(&self, pool: &SqlitePool, policy_id: i64) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM _wce_row_policies WHERE id = ?1")
            .bind(policy_id)
            .execute(pool)
            .await?;
        Ok(())
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

    async fn seed_user(pool: &SqlitePool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO _wce_users(user_id, username, password_hash, role, created_at) VALUES (?1, 'bob', 'x', 'editor', 0)",
        )
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn grant_then_get_round_trips() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteTablePermissionsRepository;

        repo.grant(&pool, "customers", user_id, true, false, false, false)
            .await
            .unwrap();
        let row = repo.get(&pool, "customers", user_id).await.unwrap().unwrap();
        assert!(row.can_read);
        assert!(!row.can_write);
    }

    #[tokio::test]
    async fn grant_is_upsert_not_duplicate() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteTablePermissionsRepository;

        repo.grant(&pool, "customers", user_id, true, false, false, false)
            .await
            .unwrap();
        repo.grant(&pool, "customers", user_id, true, true, true, true)
            .await
            .unwrap();

        let rows = repo.list_for_table(&pool, "customers").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].can_delete);
    }

    #[tokio::test]
    async fn revoke_removes_the_row() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteTablePermissionsRepository;

        repo.grant(&pool, "customers", user_id, true, false, false, false)
            .await
            .unwrap();
        repo.revoke(&pool, "customers", user_id).await.unwrap();
        assert!(repo.get(&pool, "customers", user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn row_policy_create_then_list_includes_global_and_owned_rows() {
        let pool = bootstrapped_pool().await;
        let owner_id = seed_user(&pool).await;
        let other_id = seed_user(&pool).await;
        let repo = SqliteRowPoliciesRepository;

        repo.create(&pool, "customers", None, "select", "1=1", owner_id)
            .await
            .unwrap();
        repo.create(
            &pool,
            "customers",
            Some(other_id),
            "select",
            "owner_id = $user_id",
            owner_id,
        )
        .await
        .unwrap();

        let policies = repo.list_for_table(&pool, "customers", other_id).await.unwrap();
        assert_eq!(policies.len(), 2);
    }
}
