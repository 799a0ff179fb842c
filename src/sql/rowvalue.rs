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

//! Converts an arbitrary `SqliteRow` — the shape only known at query time,
//! never at compile time for the generic data-plane and scripting paths — into
//! a `serde_json::Value`. Everything else in this crate uses `query_as!`-style
//! compile-time-known rows; this is the one place genuinely dynamic column
//! decoding is needed (§4.H generic dispatch, §4.I script `db.query`).

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Binds a `serde_json::Value` as a positional `?` parameter for an
/// ad-hoc-shaped `sqlx::query` — the parameter-side counterpart to
/// [`row_to_json`], shared by the §4.H data-plane query endpoint and the
/// §4.I script runtime's `db.query`/`db.execute`.
pub fn bind_json<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    value: Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s),
        other => query.bind(other.to_string()),
    }
}

pub fn row_to_json(row: &SqliteRow) -> Value {
    let mut map = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = column_value(row, i, column.type_info().name());
        map.insert(column.name().to_string(), value);
    }
    Value::Object(map)
}

fn column_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    let raw = match row.try_get_raw(index) {
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };
    if raw.is_null() {
        return Value::Null;
    }

    match type_name {
        "INTEGER" | "BIGINT" | "INT" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<f64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BOOLEAN" | "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        // BLOBs surface as strings (§4.I type bridge), not as a nested
        // encoding — lossily decoded, since the column carries arbitrary bytes.
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::from(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
    }
}
