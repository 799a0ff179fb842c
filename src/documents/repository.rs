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

//! Persistence for `_wce_documents` / `_wce_document_tags` (§3 Document).
//!
//! A thin CRUD layer, not a business-logic layer: the interesting mediation
//! (permission + row-policy gating) happens in the handler, exactly as the
//! spec frames documents as a collaborator with "no business logic beyond
//! the CRUD described in §3".

use crate::common::error::{RepositoryError, RepositoryResult};
#[cfg(test)]
use mockall::automock;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: String,
    pub content: String,
    pub content_type: String,
    pub is_binary: bool,
    pub searchable: bool,
    pub created_at: i64,
    pub modified_at: i64,
    pub created_by: Uuid,
    pub modified_by: Uuid,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub content: String,
    pub content_type: String,
    pub is_binary: bool,
    pub searchable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub is_binary: Option<bool>,
    pub searchable: Option<bool>,
}

#[async_trait::async_trait]
#[cfg_attr(test, automock)]
pub trait DocumentsRepository: Send + Sync {
    async fn get(&self, pool: &SqlitePool, id: &str) -> RepositoryResult<Option<DocumentRow>>;

    async fn list(
        &self,
        pool: &SqlitePool,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<DocumentRow>>;

    async fn create(
        &self,
        pool: &SqlitePool,
        doc: NewDocument,
        created_by: Uuid,
    ) -> RepositoryResult<DocumentRow>;

    async fn update(
        &self,
        pool: &SqlitePool,
        id: &str,
        patch: DocumentPatch,
        modified_by: Uuid,
    ) -> RepositoryResult<DocumentRow>;

    async fn delete(&self, pool: &SqlitePool, id: &str) -> RepositoryResult<()>;

    async fn search(
        &self,
        pool: &SqlitePool,
        query: &str,
        limit: i64,
    ) -> RepositoryResult<Vec<DocumentRow>>;

    async fn tags_for(&self, pool: &SqlitePool, id: &str) -> RepositoryResult<Vec<String>>;

    async fn set_tags(&self, pool: &SqlitePool, id: &str, tags: &[String]) -> RepositoryResult<()>;
}

pub struct SqliteDocumentsRepository;

const COLUMNS: &str =
    "id, content, content_type, is_binary, searchable, created_at, modified_at, created_by, modified_by, version";

#[async_trait::async_trait]
impl DocumentsRepository for SqliteDocumentsRepository {
    async fn get(&self, pool: &SqlitePool, id: &str) -> RepositoryResult<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {COLUMNS} FROM _wce_documents WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    async fn list(
        &self,
        pool: &SqlitePool,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<DocumentRow>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {COLUMNS} FROM _wce_documents ORDER BY modified_at DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    async fn create(
        &self,
        pool: &SqlitePool,
        doc: NewDocument,
        created_by: Uuid,
    ) -> RepositoryResult<DocumentRow> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO _wce_documents
                (id, content, content_type, is_binary, searchable, created_at, modified_at, created_by, modified_by, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7, 1)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.content)
        .bind(&doc.content_type)
        .bind(doc.is_binary)
        .bind(doc.searchable)
        .bind(now)
        .bind(created_by)
        .execute(pool)
        .await;

        if let Err(sqlx::Error::Database(ref e)) = result {
            if e.is_unique_violation() {
                return Err(RepositoryError::Conflict(format!(
                    "document {} already exists",
                    doc.id
                )));
            }
        }
        result?;

        self.get(pool, &doc.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(
        &self,
        pool: &SqlitePool,
        id: &str,
        patch: DocumentPatch,
        modified_by: Uuid,
    ) -> RepositoryResult<DocumentRow> {
        let existing = self.get(pool, id).await?.ok_or(RepositoryError::NotFound)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE _wce_documents SET
                content = ?1,
                content_type = ?2,
                is_binary = ?3,
                searchable = ?4,
                modified_at = ?5,
                modified_by = ?6,
                version = version + 1
            WHERE id = ?7
            "#,
        )
        .bind(patch.content.unwrap_or(existing.content))
        .bind(patch.content_type.unwrap_or(existing.content_type))
        .bind(patch.is_binary.unwrap_or(existing.is_binary))
        .bind(patch.searchable.unwrap_or(existing.searchable))
        .bind(now)
        .bind(modified_by)
        .bind(id)
        .execute(pool)
        .await?;

        self.get(pool, id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, pool: &SqlitePool, id: &str) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM _wce_documents WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// `_wce_documents_fts` is a contentless FTS5 table keyed by `docid`
    /// (§4.A design note: the real primary key is TEXT, not a rowid).
    async fn search(
        &self,
        pool: &SqlitePool,
        query: &str,
        limit: i64,
    ) -> RepositoryResult<Vec<DocumentRow>> {
        let qualified = format!(
            "d.{}",
            COLUMNS.split(", ").collect::<Vec<_>>().join(", d.")
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            SELECT {qualified} FROM _wce_documents d
            JOIN _wce_documents_fts f ON f.docid = d.id
            WHERE f.content MATCH ?1
            ORDER BY d.modified_at DESC
            LIMIT ?2
            "#
        ))
        .bind(query)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    async fn tags_for(&self, pool: &SqlitePool, id: &str) -> RepositoryResult<Vec<String>> {
        let tags: Vec<(String,)> =
            sqlx::query_as("SELECT tag FROM _wce_document_tags WHERE document_id = ?1 ORDER BY tag")
                .bind(id)
                .fetch_all(pool)
                .await?;
        Ok(tags.into_iter().map(|(t,)| t).collect())
    }

    async fn set_tags(&self, pool: &SqlitePool, id: &str, tags: &[String]) -> RepositoryResult<()> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM _wce_document_tags WHERE document_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for tag in tags {
            let normalized = tag.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            sqlx::query(
                "INSERT OR IGNORE INTO _wce_document_tags(document_id, tag) VALUES (?1, ?2)",
            )
            .bind(id)
            .bind(normalized)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
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
            "INSERT INTO _wce_users(user_id, username, password_hash, role, created_at) VALUES (?1, 'alice', 'x', 'owner', 0)",
        )
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteDocumentsRepository;

        let doc = repo
            .create(
                &pool,
                NewDocument {
                    id: "/notes/a".to_string(),
                    content: "hello world".to_string(),
                    content_type: "text/plain".to_string(),
                    is_binary: false,
                    searchable: true,
                },
                user_id,
            )
            .await
            .unwrap();
        assert_eq!(doc.version, 1);

        let fetched = repo.get(&pool, "/notes/a").await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello world");
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteDocumentsRepository;
        let new_doc = || NewDocument {
            id: "/notes/a".to_string(),
            content: "x".to_string(),
            content_type: "text/plain".to_string(),
            is_binary: false,
            searchable: true,
        };
        repo.create(&pool, new_doc(), user_id).await.unwrap();
        let err = repo.create(&pool, new_doc(), user_id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_increments_version_and_replaces_fields() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteDocumentsRepository;
        repo.create(
            &pool,
            NewDocument {
                id: "/notes/a".to_string(),
                content: "v1".to_string(),
                content_type: "text/plain".to_string(),
                is_binary: false,
                searchable: true,
            },
            user_id,
        )
        .await
        .unwrap();

        let updated = repo
            .update(
                &pool,
                "/notes/a",
                DocumentPatch {
                    content: Some("v2".to_string()),
                    ..Default::default()
                },
                user_id,
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.content, "v2");
    }

    #[tokio::test]
    async fn search_finds_searchable_documents_by_content() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteDocumentsRepository;
        repo.create(
            &pool,
            NewDocument {
                id: "/notes/a".to_string(),
                content: "the quick brown fox".to_string(),
                content_type: "text/plain".to_string(),
                is_binary: false,
                searchable: true,
            },
            user_id,
        )
        .await
        .unwrap();
        repo.create(
            &pool,
            NewDocument {
                id: "/notes/b".to_string(),
                content: "unrelated content".to_string(),
                content_type: "text/plain".to_string(),
                is_binary: false,
                searchable: true,
            },
            user_id,
        )
        .await
        .unwrap();

        let results = repo.search(&pool, "fox", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "/notes/a");
    }

    #[tokio::test]
    async fn non_searchable_documents_are_not_indexed() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteDocumentsRepository;
        repo.create(
            &pool,
            NewDocument {
                id: "/notes/a".to_string(),
                content: "secret fox".to_string(),
                content_type: "text/plain".to_string(),
                is_binary: false,
                searchable: false,
            },
            user_id,
        )
        .await
        .unwrap();

        let results = repo.search(&pool, "fox", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn tags_are_normalized_and_replaced_wholesale() {
        let pool = bootstrapped_pool().await;
        let user_id = seed_user(&pool).await;
        let repo = SqliteDocumentsRepository;
        repo.create(
            &pool,
            NewDocument {
                id: "/notes/a".to_string(),
                content: "x".to_string(),
                content_type: "text/plain".to_string(),
                is_binary: false,
                searchable: true,
            },
            user_id,
        )
        .await
        .unwrap();

        repo.set_tags(&pool, "/notes/a", &["  Work ".to_string(), "Urgent".to_string()])
            .await
            .unwrap();
        let tags = repo.tags_for(&pool, "/notes/a").await.unwrap();
        assert_eq!(tags, vec!["urgent".to_string(), "work".to_string()]);

        repo.set_tags(&pool, "/notes/a", &["archived".to_string()])
            .await
            .unwrap();
        let tags = repo.tags_for(&pool, "/notes/a").await.unwrap();
        assert_eq!(tags, vec!["archived".to_string()]);
    }

    #[tokio::test]
    async fn delete_missing_document_is_not_found() {
        let pool = bootstrapped_pool().await;
        let repo = SqliteDocumentsRepository;
        assert!(matches!(
            repo.delete(&pool, "/missing").await,
            Err(RepositoryError::NotFound)
        ));
    }
}
