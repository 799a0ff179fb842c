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

//! §4.H top-level contract: `validate` and `validate_and_rewrite`.
//!
//! `rewriter::validate_and_rewrite` only extracts the table name and splices
//! row policies into the statement text — it has no database handle and
//! can't consult the authorization oracle. This module is the thin
//! orchestration layer on top of it: classify, gate through
//! [`oracle::authorize`], then (for non-bypass roles) fetch and apply the
//! matching row policies.

use crate::authz::oracle::{self, Action};
use crate::authz::repository::{RowPoliciesRepository, TablePermissionsRepository};
use crate::authz::role::Role;
use crate::common::error::ApiError;
use crate::sql::classifier::Statement;
use crate::sql::rewriter::{self, RewriteError};
use sqlx::SqlitePool;
use uuid::Uuid;

fn verb_for_permission(statement: Statement) -> Option<Action> {
    match statement {
        Statement::Select => Some(Action::Read),
        Statement::Insert | Statement::Update => Some(Action::Write),
        Statement::Delete => Some(Action::Delete),
        Statement::Unknown => None,
    }
}

/// Policy types are named after the read/write/delete distinction, not the
/// permission verb — INSERT maps to no policy type at all, since row
/// policies never gate what a caller may create (§4.H, rewriter module doc).
fn policy_type_for(statement: Statement) -> Option<&'static str> {
    match statement {
        Statement::Select => Some("read"),
        Statement::Update => Some("write"),
        Statement::Delete => Some("delete"),
        Statement::Insert | Statement::Unknown => None,
    }
}

fn rewrite_error_to_api(e: RewriteError) -> ApiError {
    match e {
        RewriteError::UnmediatedStatement => {
            ApiError::Validation("statement is not a mediated SQL verb".to_string())
        }
        RewriteError::NoTableName => {
            ApiError::Validation("could not determine the target table".to_string())
        }
    }
}

/// Classifies `sql`, extracts its table, and checks the mapped permission
/// (SELECT→read, INSERT/UPDATE→write, DELETE→delete) via the oracle. Returns
/// the classified statement and table name on success.
pub async fn validate(
    pool: &SqlitePool,
    perms: &dyn TablePermissionsRepository,
    user_id: Uuid,
    role: Role,
    sql: &str,
) -> Result<(Statement, String), ApiError> {
    let statement = crate::sql::classifier::classify(sql);
    let table_name = crate::sql::classifier::extract_table_name(sql, statement)
        .ok_or_else(|| rewrite_error_to_api(RewriteError::UnmediatedStatement))?;
    let Some(action) = verb_for_permission(statement) else {
        return Err(rewrite_error_to_api(RewriteError::UnmediatedStatement));
    };

    let allowed = oracle::authorize(pool, perms, role, user_id, &table_name, action)
        .await
        .map_err(ApiError::from)?;
    if !allowed {
        return Err(ApiError::Forbidden(format!(
            "permission denied: cannot {action:?} table {table_name}",
        )));
    }

    Ok((statement, table_name))
}

/// Validates, then — unless `role` is owner/admin (who bypass row policies
/// entirely) — loads and splices the applicable row policies into the
/// statement. INSERT is returned unchanged even for non-bypass roles.
pub async fn validate_and_rewrite(
    pool: &SqlitePool,
    perms: &dyn TablePermissionsRepository,
    policies: &dyn RowPoliciesRepository,
    user_id: Uuid,
    role: Role,
    sql: &str,
) -> Result<String, ApiError> {
    let (statement, table_name) = validate(pool, perms, user_id, role, sql).await?;

    if role.is_privileged() {
        return Ok(sql.to_string());
    }

    let Some(policy_type) = policy_type_for(statement) else {
        return Ok(sql.to_string());
    };

    let rows = policies
        .list_for_table(pool, &table_name, user_id)
        .await
        .map_err(ApiError::from)?
        .into_iter()
        .filter(|p| p.policy_type == policy_type)
        .collect::<Vec<_>>();

    Ok(rewriter::apply_row_policies(sql, user_id, &rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::repository::{MockRowPoliciesRepository, MockTablePermissionsRepository, RowPolicy};

    #[tokio::test]
    async fn bypass_role_returns_the_statement_untouched_even_with_policies() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let mut policies = MockRowPoliciesRepository::new();
        policies.expect_list_for_table().returning(|_, _, _| {
            Box::pin(async {
                Ok(vec![RowPolicy {
                    id: 1,
                    table_name: "customers".to_string(),
                    user_id: None,
                    policy_type: "read".to_string(),
                    sql_condition: "1=1".to_string(),
                    created_at: 0,
                    created_by: Uuid::new_v4(),
                }])
            })
        });
        let perms = MockTablePermissionsRepository::new();

        let sql = "SELECT * FROM customers";
        let out = validate_and_rewrite(
            &pool,
            &perms,
            &policies,
            Uuid::new_v4(),
            Role::Admin,
            sql,
        )
        .await
        .unwrap();
        assert_eq!(out, sql);
    }

    #[tokio::test]
    async fn unprivileged_write_without_a_grant_is_denied() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let mut perms = MockTablePermissionsRepository::new();
        perms
            .expect_get()
            .returning(|_, _, _| Box::pin(async { Ok(None) }));
        let policies = MockRowPoliciesRepository::new();

        let result = validate(
            &pool,
            &perms,
            Uuid::new_v4(),
            Role::Viewer,
            "INSERT INTO data(c) VALUES ('x')",
        )
        .await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }
}
