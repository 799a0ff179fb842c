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

//! §4.G Authorization oracle.
//!
//! Decides whether a principal may perform a given action against a given
//! table. System tables (`_wce_` prefix) are locked down to owner/admin
//! regardless of any `_wce_table_permissions` row — a grant can never open a
//! system table to a lower role.

use crate::authz::repository::TablePermissionsRepository;
use crate::authz::role::Role;
use crate::cenv::schema::is_system_table;
use crate::common::error::RepositoryResult;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Delete,
    Grant,
}

/// Pure decision function over an already-loaded permission row and role —
/// split out from the DB-touching `authorize` below so the decision logic has
/// a unit-testable seam with no pool required.
pub fn decide(
    role: Role,
    table_name: &str,
    action: Action,
    permission: Option<&TablePermissionRow>,
) -> bool {
    if is_system_table(table_name) {
        // Read is open to owner/admin; write/delete/grant are denied to
        // everyone, owner included — system tables are mutated only through
        // the core's own operations, never passed-through SQL (§4.G, §9).
        return action == Action::Read && role.is_privileged();
    }
    if role.is_privileged() {
        return true;
    }
    match permission {
        None => false,
        Some(p) => match action {
            Action::Read => p.can_read,
            Action::Write => p.can_write,
            Action::Delete => p.can_delete,
            Action::Grant => p.can_grant,
        },
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TablePermissionRow {
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_grant: bool,
}

/// Loads the caller's row (if any) and applies [`decide`].
pub async fn authorize(
    pool: &SqlitePool,
    repo: &dyn TablePermissionsRepository,
    role: Role,
    user_id: Uuid,
    table_name: &str,
    action: Action,
) -> RepositoryResult<bool> {
    if is_system_table(table_name) {
        return Ok(action == Action::Read && role.is_privileged());
    }
    if role.is_privileged() {
        return Ok(true);
    }
    let permission = repo.get(pool, table_name, user_id).await?;
    Ok(decide(role, table_name, action, permission.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_roles_always_pass_on_non_system_tables() {
        assert!(decide(Role::Owner, "customers", Action::Delete, None));
        assert!(decide(Role::Admin, "customers", Action::Write, None));
    }

    #[test]
    fn unprivileged_roles_need_an_explicit_grant() {
        assert!(!decide(Role::Viewer, "customers", Action::Read, None));
        let grant = TablePermissionRow {
            can_read: true,
            ..Default::default()
        };
        assert!(decide(Role::Viewer, "customers", Action::Read, Some(&grant)));
        assert!(!decide(Role::Viewer, "customers", Action::Write, Some(&grant)));
    }

    #[test]
    fn system_tables_never_yield_to_a_grant() {
        let grant = TablePermissionRow {
            can_read: true,
            can_write: true,
            can_delete: true,
            can_grant: true,
        };
        assert!(!decide(Role::Editor, "_wce_users", Action::Read, Some(&grant)));
        assert!(decide(Role::Admin, "_wce_users", Action::Read, None));
    }

    #[test]
    fn system_table_writes_are_denied_even_to_owner() {
        assert!(!decide(Role::Owner, "_wce_users", Action::Write, None));
        assert!(!decide(Role::Owner, "_wce_users", Action::Delete, None));
        assert!(!decide(Role::Owner, "_wce_users", Action::Grant, None));
        assert!(!decide(Role::Admin, "_wce_users", Action::Write, None));
    }

    #[test]
    fn system_table_read_is_denied_to_non_privileged_roles() {
        assert!(!decide(Role::Viewer, "_wce_users", Action::Read, None));
        assert!(!decide(Role::Editor, "_wce_users", Action::Read, None));
    }
}
