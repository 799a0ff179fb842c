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

//! HTTP handlers for `/{tenant}/documents` (§1 supplemented module, §6).
//!
//! Every operation is mediated by the authorization oracle against the
//! logical `documents` resource — there is no document-specific permission
//! model beyond the generic table-permission grid (§4.G; see the note on
//! [`crate::documents::TABLE_NAME`] for why this isn't the literal
//! `_wce_documents` table name).

use crate::auth::AuthenticatedUser;
use crate::authz::oracle::{self, Action};
use crate::authz::repository::SqliteTablePermissionsRepository;
use crate::common::error::{ApiError, ApiResult};
use crate::common::extractors::ValidJson;
use crate::common::pagination::PageParams;
use crate::documents::TABLE_NAME;
use crate::documents::dto::{CreateDocumentRequest, DocumentResponse, SearchQuery, UpdateDocumentRequest};
use crate::documents::repository::{
    DocumentPatch, DocumentRow, DocumentsRepository, NewDocument, SqliteDocumentsRepository,
};
use axum::Json;
use axum::extract::{Path, Query};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

async fn require(user: &AuthenticatedUser, action: Action) -> ApiResult<()> {
    let repo = SqliteTablePermissionsRepository;
    let allowed = oracle::authorize(
        &user.pool,
        &repo,
        user.claims.role,
        user.claims.user_id,
        TABLE_NAME,
        action,
    )
    .await?;
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "permission denied: cannot {action:?} documents"
        )))
    }
}

async fn to_response(repo: &dyn DocumentsRepository, pool: &sqlx::SqlitePool, doc: DocumentRow) -> ApiResult<DocumentResponse> {
    let tags = repo.tags_for(pool, &doc.id).await?;
    Ok(DocumentResponse {
        id: doc.id,
        content: doc.content,
        content_type: doc.content_type,
        is_binary: doc.is_binary,
        searchable: doc.searchable,
        created_at: doc.created_at,
        modified_at: doc.modified_at,
        created_by: doc.created_by,
        modified_by: doc.modified_by,
        version: doc.version,
        tags,
    })
}

pub async fn create_document(
    user: AuthenticatedUser,
    ValidJson(body): ValidJson<CreateDocumentRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    require(&user, Action::Write).await?;

    if body.id.trim().is_empty() {
        return Err(ApiError::Validation("document id must not be empty".to_string()));
    }
    if body.is_binary && BASE64.decode(&body.content).is_err() {
        return Err(ApiError::Validation(
            "binary document content must be valid base64".to_string(),
        ));
    }

    let repo = SqliteDocumentsRepository;
    let doc = repo
        .create(
            &user.pool,
            NewDocument {
                id: body.id,
                content: body.content,
                content_type: body.content_type,
                is_binary: body.is_binary,
                searchable: body.searchable,
            },
            user.claims.user_id,
        )
        .await?;
    repo.set_tags(&user.pool, &doc.id, &body.tags).await?;

    Ok(Json(to_response(&repo, &user.pool, doc).await?))
}

pub async fn get_document(
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentResponse>> {
    require(&user, Action::Read).await?;
    let repo = SqliteDocumentsRepository;
    let doc = repo
        .get(&user.pool, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("document {id} not found")))?;
    Ok(Json(to_response(&repo, &user.pool, doc).await?))
}

pub async fn list_documents(
    user: AuthenticatedUser,
    Query(page): Query<PageParams>,
) -> ApiResult<Json<Vec<DocumentResponse>>> {
    require(&user, Action::Read).await?;
    let repo = SqliteDocumentsRepository;
    let rows = repo.list(&user.pool, page.limit, page.offset).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(to_response(&repo, &user.pool, row).await?);
    }
    Ok(Json(out))
}

pub async fn update_document(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdateDocumentRequest>,
) -> ApiResult<Json<DocumentResponse>> {
    require(&user, Action::Write).await?;

    if let (true, Some(content)) = (body.is_binary.unwrap_or(false), body.content.as_ref()) {
        if BASE64.decode(content).is_err() {
            return Err(ApiError::Validation(
                "binary document content must be valid base64".to_string(),
            ));
        }
    }

    let repo = SqliteDocumentsRepository;
    let doc = repo
        .update(
            &user.pool,
            &id,
            DocumentPatch {
                content: body.content,
                content_type: body.content_type,
                is_binary: body.is_binary,
                searchable: body.searchable,
            },
            user.claims.user_id,
        )
        .await?;
    if let Some(tags) = body.tags {
        repo.set_tags(&user.pool, &id, &tags).await?;
    }

    Ok(Json(to_response(&repo, &user.pool, doc).await?))
}

pub async fn delete_document(user: AuthenticatedUser, Path(id): Path<String>) -> ApiResult<()> {
    require(&user, Action::Delete).await?;
    let repo = SqliteDocumentsRepository;
    repo.delete(&user.pool, &id).await?;
    Ok(())
}

pub async fn search_documents(
    user: AuthenticatedUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<DocumentResponse>>> {
    require(&user, Action::Read).await?;
    let repo = SqliteDocumentsRepository;
    let rows = repo
        .search(&user.pool, &query.q, query.limit.unwrap_or(50))
        .await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(to_response(&repo, &user.pool, row).await?);
    }
    Ok(Json(out))
}
