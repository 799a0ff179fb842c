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

//! Admin endpoints for table permissions and row policies (§6).
//!
//! Every operation under `/{tenant}/admin/permissions` and
//! `/{tenant}/admin/policies` is admin/owner only (§6) — a plain role check,
//! not the oracle's `Action::Grant` (that decision function exists for
//! §4.G's "allow if `can_grant`" rule, but this HTTP surface never exposes a
//! path for a non-privileged grantee to use it).

use crate::audit;
use crate::auth::AuthenticatedUser;
use crate::authz::dto::{
    CreateRowPolicyRequest, GrantPermissionRequest, PermissionsListResponse, PermissionsQuery,
    PoliciesQuery, RevokePermissionQuery, RowPolicyResponse, TablePermissionResponse,
};
use crate::authz::repository::{
    RowPoliciesRepository, SqliteRowPoliciesRepository, SqliteTablePermissionsRepository,
    TablePermissionsRepository,
};
use crate::common::error::{ApiError, ApiResult};
use crate::common::extractors::ValidJson;
use axum::Json;
use axum::extract::{Path, Query};
use uuid::Uuid;

fn require_admin(user: &AuthenticatedUser) -> ApiResult<()> {
    if user.claims.role.is_privileged() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "only owner/admin may manage permissions and row policies".to_string(),
        ))
    }
}

pub async fn grant_permission(
    user: AuthenticatedUser,
    ValidJson(body): ValidJson<GrantPermissionRequest>,
) -> ApiResult<Json<TablePermissionResponse>> {
    require_admin(&user)?;

    let repo = SqliteTablePermissionsRepository;
    repo.grant(
        &user.pool,
        &body.table_name,
        body.user_id,
        body.can_read,
        body.can_write,
        body.can_delete,
        body.can_grant,
    )
    .await?;

    audit::record(
        &user.pool,
        Some(user.claims.user_id),
        "permission_granted",
        Some(&body.table_name),
        Some(&body.user_id.to_string()),
    )
    .await
    .ok();

    Ok(Json(TablePermissionResponse {
        table_name: body.table_name,
        user_id: body.user_id,
        can_read: body.can_read,
        can_write: body.can_write,
        can_delete: body.can_delete,
        can_grant: body.can_grant,
    }))
}

pub async fn revoke_permission(
    user: AuthenticatedUser,
    Path((table_name, target_user)): Path<(String, Uuid)>,
) -> ApiResult<()> {
    require_admin(&user)?;
    let repo = SqliteTablePermissionsRepository;
    repo.revoke(&user.pool, &table_name, target_user).await?;
    audit::record(
        &user.pool,
        Some(user.claims.user_id),
        "permission_revoked",
        Some(&table_name),
        Some(&target_user.to_string()),
    )
    .await
    .ok();
    Ok(())
}

/// `DELETE /{tenant}/admin/permissions?table_name=&user_id=` (§6) — the
/// literal spec route shape; [`revoke_permission`] above keeps the
/// path-param form as a narrower supplementary alias onto the same
/// `revoke_permission(user_id, table_name)` operation.
pub async fn revoke_permission_query(
    user: AuthenticatedUser,
    Query(query): Query<RevokePermissionQuery>,
) -> ApiResult<()> {
    require_admin(&user)?;
    let repo = SqliteTablePermissionsRepository;
    repo.revoke(&user.pool, &query.table_name, query.user_id)
        .await?;
    audit::record(
        &user.pool,
        Some(user.claims.user_id),
        "permission_revoked",
        Some(&query.table_name),
        Some(&query.user_id.to_string()),
    )
    .await
    .ok();
    Ok(())
}

fn to_permission_response(r: crate::authz::repository::TablePermission) -> TablePermissionResponse {
    TablePermissionResponse {
        table_name: r.table_name,
        user_id: r.user_id,
        can_read: r.can_read,
        can_write: r.can_write,
        can_delete: r.can_delete,
        can_grant: r.can_grant,
    }
}

/// `GET /{tenant}/admin/permissions?user_id=|table_name=` (§6) — exactly one
/// axis is given: `user_id` lists that user's grants across tables,
/// `table_name` lists every grant on that table.
pub async fn list_permissions(
    user: AuthenticatedUser,
    Query(query): Query<PermissionsQuery>,
) -> ApiResult<Json<PermissionsListResponse>> {
    require_admin(&user)?;
    let repo = SqliteTablePermissionsRepository;
    let rows = match (query.user_id, query.table_name) {
        (Some(user_id), None) => repo.list_for_user(&user.pool, user_id).await?,
        (None, Some(table_name)) => repo.list_for_table(&user.pool, &table_name).await?,
        _ => {
            return Err(ApiError::Validation(
                "exactly one of user_id or table_name must be given".to_string(),
            ));
        }
    };
    Ok(Json(PermissionsListResponse {
        permissions: rows.into_iter().map(to_permission_response).collect(),
    }))
}

pub async fn list_table_permissions(
    user: AuthenticatedUser,
    Path(table_name): Path<String>,
) -> ApiResult<Json<Vec<TablePermissionResponse>>> {
    require_admin(&user)?;
    let repo = SqliteTablePermissionsRepository;
    let rows = repo.list_for_table(&user.pool, &table_name).await?;
    Ok(Json(rows.into_iter().map(to_permission_response).collect()))
}

/// `GET /{tenant}/admin/policies?table_name=&policy_type=` (§6).
pub async fn list_policies(
    user: AuthenticatedUser,
    Query(query): Query<PoliciesQuery>,
) -> ApiResult<Json<Vec<RowPolicyResponse>>> {
    require_admin(&user)?;
    let repo = SqliteRowPoliciesRepository;
    let rows = repo
        .list_for_table_and_type(&user.pool, &query.table_name, &query.policy_type)
        .await?;
    Ok(Json(
        rows.into_iter()
            .map(|r| RowPolicyResponse {
                id: r.id,
                table_name: r.table_name,
                user_id: r.user_id,
                policy_type: r.policy_type,
                sql_condition: r.sql_condition,
                created_at: r.created_at,
                created_by: r.created_by,
            })
            .collect(),
    ))
}

pub async fn create_row_policy(
    user: AuthenticatedUser,
    ValidJson(body): ValidJson<CreateRowPolicyRequest>,
) -> ApiResult<Json<RowPolicyResponse>> {
    require_admin(&user)?;

    if !matches!(body.policy_type.as_str(), "read" | "write" | "delete") {
        return Err(ApiError::Validation(
            "policy_type must be one of read, write, delete".to_string(),
        ));
    }

    let repo = SqliteRowPoliciesRepository;
    let id = repo
        .create(
            &user.pool,
            &body.table_name,
            body.user_id,
            &body.policy_type,
            &body.sql_condition,
            user.claims.user_id,
        )
        .await?;

    audit::record(
        &user.pool,
        Some(user.claims.user_id),
        "row_policy_created",
        Some(&body.table_name),
        Some(&id.to_string()),
    )
    .await
    .ok();

    Ok(Json(RowPolicyResponse {
        id,
        table_name: body.table_name,
        user_id: body.user_id,
        policy_type: body.policy_type,
        sql_condition: body.sql_condition,
        created_at: chrono::Utc::now().timestamp(),
        created_by: user.claims.user_id,
    }))
}

pub async fn delete_row_policy(
    user: AuthenticatedUser,
    Path(policy_id): Path<i64>,
) -> ApiResult<()> {
    if !user.claims.role.is_privileged() {
        return Err(ApiError::Forbidden("only owner/admin may delete row policies".to_string()));
    }
    let repo = SqliteRowPoliciesRepository;
    repo.delete(&user.pool, policy_id).await?;
    Ok(())
}
