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

//! §4.B CENV manager — tenant lifecycle and the shared per-tenant connection pool.

use crate::cenv::schema;
use crate::common::error::{RepositoryError, RepositoryResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Owns the tenant-UUID → database-handle mapping (§5 "CENV pool").
///
/// Lookup is a read under the guard; on-demand opening is a write. `SqlitePool`
/// is itself safe for concurrent use, so a pooled entry *is* the handle this
/// returns — there's no extra wrapper layer on top, just clones out of the map.
pub struct CenvManager {
    storage_dir: PathBuf,
    pools: RwLock<HashMap<Uuid, SqlitePool>>,
}

impl CenvManager {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn database_path(&self, tenant_id: Uuid) -> PathBuf {
        self.storage_dir.join(format!("{tenant_id}.db"))
    }

    pub fn exists(&self, tenant_id: Uuid) -> bool {
        self.database_path(tenant_id).is_file()
    }

    /// Creates a brand-new tenant database: owner-only file permissions, WAL +
    /// foreign keys, and a fresh bootstrap (§4.A). Fails if the file already exists.
    pub async fn create(&self, tenant_id: Uuid) -> RepositoryResult<()> {
        let path = self.database_path(tenant_id);
        if path.exists() {
            return Err(RepositoryError::Conflict(format!(
                "cenv {tenant_id} already exists"
            )));
        }
        std::fs::create_dir_all(&self.storage_dir)
            .map_err(|e| RepositoryError::Custom(format!("storage dir: {e}")))?;

        let pool = open_pool(&path, true).await?;
        schema::bootstrap(&pool).await?;
        pool.close().await;

        restrict_permissions(&path)?;
        Ok(())
    }

    /// Opens a fresh handle, defensively re-running bootstrap (it is a no-op on
    /// an already-initialized file — §8 idempotence invariant). Fails if the
    /// file does not exist.
    pub async fn open(&self, tenant_id: Uuid) -> RepositoryResult<SqlitePool> {
        let path = self.database_path(tenant_id);
        if !path.is_file() {
            return Err(RepositoryError::TenantNotFound);
        }
        let pool = open_pool(&path, false).await?;
        schema::bootstrap(&pool).await?;
        Ok(pool)
    }

    /// Idempotent pooled accessor: the first call opens, later calls return the
    /// same handle. Concurrent callers observe a single handle (§4.B, §5).
    pub async fn get_connection(&self, tenant_id: Uuid) -> RepositoryResult<SqlitePool> {
        if let Some(pool) = self
            .pools
            .read()
            .map_err(|e| RepositoryError::RwLockRead(e.to_string()))?
            .get(&tenant_id)
        {
            return Ok(pool.clone());
        }

        let pool = self.open(tenant_id).await?;
        let mut pools = self
            .pools
            .write()
            .map_err(|e| RepositoryError::RwLockWrite(e.to_string()))?;
        // Another caller may have raced us to insertion; keep whichever is already there.
        let pool = pools.entry(tenant_id).or_insert(pool).clone();
        Ok(pool)
    }

    pub fn close_connection(&self, tenant_id: Uuid) -> RepositoryResult<()> {
        self.pools
            .write()
            .map_err(|e| RepositoryError::RwLockWrite(e.to_string()))?
            .remove(&tenant_id);
        Ok(())
    }

    pub fn close_all(&self) -> RepositoryResult<()> {
        self.pools
            .write()
            .map_err(|e| RepositoryError::RwLockWrite(e.to_string()))?
            .clear();
        Ok(())
    }

    /// Strips the leading slash from a URL path and splits once; returns
    /// `(tenant_id, remaining_path)` iff the first segment is a lowercase
    /// UUID v4, else `None` ("not a tenant path" — §4.B).
    pub fn parse_path(url_path: &str) -> Option<(Uuid, &str)> {
        let stripped = url_path.strip_prefix('/').unwrap_or(url_path);
        let (first, rest) = match stripped.split_once('/') {
            Some((first, rest)) => (first, rest),
            None => (stripped, ""),
        };
        if first != first.to_lowercase() {
            return None;
        }
        let uuid = Uuid::from_str(first).ok()?;
        if uuid.get_version_num() != 4 {
            return None;
        }
        Some((uuid, rest))
    }
}

async fn open_pool(path: &Path, create_if_missing: bool) -> RepositoryResult<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create_if_missing)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(opts)
        .await?;
    Ok(pool)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> RepositoryResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms)
        .map_err(|e| RepositoryError::Custom(format!("chmod: {e}")))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> RepositoryResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_connection_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CenvManager::new(dir.path());
        let id = Uuid::new_v4();

        manager.create(id).await.unwrap();
        assert!(manager.exists(id));

        let a = manager.get_connection(id).await.unwrap();
        let b = manager.get_connection(id).await.unwrap();
        // Same pooled handle: both point at the same underlying pool.
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CenvManager::new(dir.path());
        let id = Uuid::new_v4();
        manager.create(id).await.unwrap();
        assert!(manager.create(id).await.is_err());
    }

    #[tokio::test]
    async fn open_missing_tenant_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CenvManager::new(dir.path());
        assert!(matches!(
            manager.open(Uuid::new_v4()).await,
            Err(RepositoryError::TenantNotFound)
        ));
    }

    #[test]
    fn parse_path_extracts_tenant_and_remainder() {
        let id = Uuid::new_v4();
        let url = format!("/{id}/admin/permissions");
        let (parsed, rest) = CenvManager::parse_path(&url).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(rest, "admin/permissions");
    }

    #[test]
    fn parse_path_rejects_non_uuid_segment() {
        assert!(CenvManager::parse_path("/health").is_none());
        assert!(CenvManager::parse_path("/new").is_none());
    }

    #[test]
    fn parse_path_rejects_uppercase_uuid() {
        let id = Uuid::new_v4().to_string().to_uppercase();
        assert!(CenvManager::parse_path(&format!("/{id}/login")).is_none());
    }
}
