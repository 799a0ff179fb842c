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

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub table_name: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub can_grant: bool,
}

#[derive(Debug, Serialize)]
pub struct TablePermissionResponse {
    pub table_name: String,
    pub user_id: Uuid,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_grant: bool,
}

/// `GET /{tenant}/admin/permissions?user_id=|table_name=` (§6) — exactly one
/// of the two axes is expected; [`crate::authz::handler::list_permissions`]
/// rejects the request if neither (or, ambiguously, both) is present.
#[derive(Debug, Deserialize)]
pub struct PermissionsQuery {
    pub user_id: Option<Uuid>,
    pub table_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PermissionsListResponse {
    pub permissions: Vec<TablePermissionResponse>,
}

/// `DELETE /{tenant}/admin/permissions?table_name=&user_id=` (§6) — the
/// query-param-addressed form of `revoke_permission(user_id, table_name)`.
#[derive(Debug, Deserialize)]
pub struct RevokePermissionQuery {
    pub table_name: String,
    pub user_id: Uuid,
}

/// `GET /{tenant}/admin/policies?table_name=&policy_type=` (§6).
#[derive(Debug, Deserialize)]
pub struct PoliciesQuery {
    pub table_name: String,
    pub policy_type: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRowPolicyRequest {
    pub table_name: String,
    pub user_id: Option<Uuid>,
    pub policy_type: String,
    pub sql_condition: String,
}

#[derive(Debug, Serialize)]
pub struct RowPolicyResponse {
    pub id: i64,
    pub table_name: String,
    pub user_id: Option<Uuid>,
    pub policy_type: String,
    pub sql_condition: String,
    pub created_at: i64,
    pub created_by: Uuid,
}
