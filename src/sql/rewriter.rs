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

//! §4.H SQL rewriter — row-policy injection.
//!
//! Row policies for a table are combined by conjunction and spliced into the
//! statement's `WHERE` clause (added if absent). `$user_id` is substituted
//! with the caller's UUID, quoted as a SQL string literal — policies are
//! trusted input (written by owner/admin through the admin API), so this is
//! textual substitution, not user-supplied data passing through unescaped.

use crate::authz::repository::RowPolicy;
use crate::sql::classifier::{self, Statement};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteError {
    /// The statement didn't classify into one of the four mediated verbs.
    UnmediatedStatement,
    /// No table name could be extracted from an otherwise-classified statement.
    NoTableName,
}

pub struct Rewritten {
    pub statement: Statement,
    pub table_name: String,
    pub sql: String,
}

/// Classifies `sql`, extracts its table name, and — if any row policies apply
/// — injects them as an `AND (...)` group onto the existing `WHERE` clause,
/// or appends a new one.
pub fn validate_and_rewrite(
    sql: &str,
    user_id: Uuid,
    policies: &[RowPolicy],
) -> Result<Rewritten, RewriteError> {
    let statement = classifier::classify(sql);
    if statement == Statement::Unknown {
        return Err(RewriteError::UnmediatedStatement);
    }
    let table_name = classifier::extract_table_name(sql, statement)
        .ok_or(RewriteError::NoTableName)?;

    let rewritten = match statement {
        Statement::Select | Statement::Update | Statement::Delete => {
            apply_row_policies(sql, user_id, policies)
        }
        Statement::Insert => sql.to_string(),
        Statement::Unknown => unreachable!(),
    };
    Ok(Rewritten {
        statement,
        table_name,
        sql: rewritten,
    })
}

/// Row policies only constrain statements that have a `WHERE`-bearing shape:
/// `SELECT`, `UPDATE`, and `DELETE`. `INSERT` has nothing to filter — a row
/// policy never vetoes which rows a caller may create, only which existing
/// rows they may see, modify, or remove (§4.H edge case).
pub fn apply_row_policies(sql: &str, user_id: Uuid, policies: &[RowPolicy]) -> String {
    if policies.is_empty() {
        return sql.to_string();
    }

    let combined = policies
        .iter()
        .map(|p| format!("({})", substitute_user_id(&p.sql_condition, user_id)))
        .collect::<Vec<_>>()
        .join(" AND ");

    let trimmed = sql.trim_end().trim_end_matches(';');
    let lower = trimmed.to_ascii_lowercase();
    if let Some(where_pos) = lower.find(" where ") {
        let (before, after) = trimmed.split_at(where_pos + " where ".len());
        return format!("{before}{combined} AND ({after})");
    }

    // No WHERE clause: splice one in just before the earliest trailing clause
    // (ORDER BY / LIMIT / GROUP BY / HAVING), or append one if none is present
    // (§4.H step 4).
    let insertion_point = [" order by ", " limit ", " group by ", " having "]
        .iter()
        .filter_map(|clause| lower.find(clause))
        .min();

    match insertion_point {
        Some(pos) => {
            let (before, after) = trimmed.split_at(pos);
            format!("{before} WHERE {combined} {}", after.trim_start())
        }
        None => format!("{trimmed} WHERE {combined}"),
    }
}

fn substitute_user_id(condition: &str, user_id: Uuid) -> String {
    condition.replace("$user_id", &format!("'{user_id}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn policy(sql_condition: &str) -> RowPolicy {
        RowPolicy {
            id: 1,
            table_name: "customers".to_string(),
            user_id: None,
            policy_type: "select".to_string(),
            sql_condition: sql_condition.to_string(),
            created_at: Utc::now().timestamp(),
            created_by: Uuid::new_v4(),
        }
    }

    #[test]
    fn no_policies_leaves_statement_untouched() {
        let sql = "SELECT * FROM customers";
        assert_eq!(apply_row_policies(sql, Uuid::new_v4(), &[]), sql);
    }

    #[test]
    fn appends_where_clause_when_absent() {
        let user_id = Uuid::new_v4();
        let out = apply_row_policies(
            "SELECT * FROM customers",
            user_id,
            &[policy("owner_id = $user_id")],
        );
        assert_eq!(
            out,
            format!("SELECT * FROM customers WHERE (owner_id = '{user_id}')")
        );
    }

    #[test]
    fn splices_where_before_order_by_when_absent() {
        let user_id = Uuid::new_v4();
        let out = apply_row_policies(
            "SELECT * FROM users ORDER BY id",
            user_id,
            &[policy("owner_id = $user_id")],
        );
        assert_eq!(
            out,
            format!("SELECT * FROM users WHERE (owner_id = '{user_id}') ORDER BY id")
        );
    }

    #[test]
    fn splices_where_before_the_earliest_of_several_trailing_clauses() {
        let user_id = Uuid::new_v4();
        let out = apply_row_policies(
            "SELECT * FROM users GROUP BY team HAVING count(*) > 1 ORDER BY id LIMIT 10",
            user_id,
            &[policy("owner_id = $user_id")],
        );
        assert_eq!(
            out,
            format!(
                "SELECT * FROM users WHERE (owner_id = '{user_id}') GROUP BY team HAVING count(*) > 1 ORDER BY id LIMIT 10"
            )
        );
    }

    #[test]
    fn conjoins_with_an_existing_where_clause() {
        let user_id = Uuid::new_v4();
        let out = apply_row_policies(
            "SELECT * FROM customers WHERE active = 1",
            user_id,
            &[policy("owner_id = $user_id")],
        );
        assert_eq!(
            out,
            format!("SELECT * FROM customers WHERE (owner_id = '{user_id}') AND (active = 1)")
        );
    }

    #[test]
    fn multiple_policies_combine_by_conjunction() {
        let user_id = Uuid::new_v4();
        let out = apply_row_policies(
            "SELECT * FROM customers",
            user_id,
            &[policy("owner_id = $user_id"), policy("deleted = 0")],
        );
        assert!(out.contains("AND"));
        assert!(out.contains("deleted = 0"));
    }

    #[test]
    fn unknown_statements_are_rejected_outright() {
        assert_eq!(
            validate_and_rewrite("create table x(a int)", Uuid::new_v4(), &[]),
            Err(RewriteError::UnmediatedStatement)
        );
    }

    #[test]
    fn insert_statements_are_never_filtered_by_row_policy() {
        let user_id = Uuid::new_v4();
        let result =
            validate_and_rewrite("INSERT INTO customers(a) VALUES (1)", user_id, &[policy("a=1")])
                .unwrap();
        assert_eq!(result.table_name, "customers");
        assert!(!result.sql.contains("WHERE"));
    }
}
