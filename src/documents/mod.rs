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

pub mod dto;
pub mod handler;
pub mod repository;
pub mod routes;

/// Logical resource name used for permission checks (§4.G) — deliberately
/// *not* the literal `_wce_documents` table name. The oracle's system-table
/// branch exists to stop raw user SQL from mutating control-plane tables
/// (§4.G, §9); it was never meant to lock owners/admins out of the
/// document feature their own dedicated handlers expose. Documents are
/// mediated here, never via the SQL rewriter, so they're checked as an
/// ordinary grantable resource instead.
pub const TABLE_NAME: &str = "documents";
