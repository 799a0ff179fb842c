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

//! §4.H SQL parser/rewriter — statement classification and table-name
//! extraction.
//!
//! This is a guardrail classifier, not a parser: it recognizes the four DML
//! verbs and pulls the primary table name out with regexes, the same
//! lightweight-validation approach the pack's SQL-adjacent examples take
//! rather than pulling in a full grammar (`sqlparser` et al. parse far more
//! SQL than this oracle ever needs to act on).

use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Select,
    Insert,
    Update,
    Delete,
    Unknown,
}

static SELECT_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfrom\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static INSERT_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\binsert\s+into\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static UPDATE_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bupdate\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static DELETE_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdelete\s+from\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Classifies the leading keyword of a single statement. Multiple statements
/// joined by `;`, comments, or any of `ATTACH`/`PRAGMA`/DDL verbs classify as
/// [`Statement::Unknown`] — the oracle refuses to mediate what it cannot
/// confidently name a table for (§4.H edge case, §9 design note: "unknown
/// statements are rejected, not passed through").
pub fn classify(sql: &str) -> Statement {
    let trimmed = sql.trim_start();
    let first_word: String = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();

    match first_word.as_str() {
        "SELECT" => Statement::Select,
        "INSERT" => Statement::Insert,
        "UPDATE" => Statement::Update,
        "DELETE" => Statement::Delete,
        _ => Statement::Unknown,
    }
}

/// Extracts the first table name referenced by the statement's primary
/// clause (`FROM`/`INTO`/`UPDATE`). Returns `None` if the statement doesn't
/// classify or the table name can't be found.
pub fn extract_table_name(sql: &str, statement: Statement) -> Option<String> {
    let pattern = match statement {
        Statement::Select => &*SELECT_TABLE,
        Statement::Insert => &*INSERT_TABLE,
        Statement::Update => &*UPDATE_TABLE,
        Statement::Delete => &*DELETE_TABLE,
        Statement::Unknown => return None,
    };
    pattern
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_the_four_dml_verbs() {
        assert_eq!(classify("select * from customers"), Statement::Select);
        assert_eq!(classify("INSERT into customers(a) values (1)"), Statement::Insert);
        assert_eq!(classify("update customers set a=1"), Statement::Update);
        assert_eq!(classify("delete from customers"), Statement::Delete);
    }

    #[test]
    fn unrecognized_leading_keyword_is_unknown() {
        assert_eq!(classify("create table x(a int)"), Statement::Unknown);
        assert_eq!(classify("pragma journal_mode"), Statement::Unknown);
        assert_eq!(classify("attach database 'x' as y"), Statement::Unknown);
        assert_eq!(classify(""), Statement::Unknown);
    }

    #[test]
    fn extracts_table_names_case_insensitively() {
        assert_eq!(
            extract_table_name("SELECT * FROM Customers WHERE id=1", Statement::Select),
            Some("Customers".to_string())
        );
        assert_eq!(
            extract_table_name("insert into orders(a) values (1)", Statement::Insert),
            Some("orders".to_string())
        );
        assert_eq!(
            extract_table_name("update orders set a=1", Statement::Update),
            Some("orders".to_string())
        );
        assert_eq!(
            extract_table_name("delete from orders", Statement::Delete),
            Some("orders".to_string())
        );
    }

    #[test]
    fn unknown_statement_has_no_table_name() {
        assert_eq!(extract_table_name("pragma journal_mode", Statement::Unknown), None);
    }
}
