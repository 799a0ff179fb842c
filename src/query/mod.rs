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

//! The data-plane raw-SQL endpoint (§2 control-flow table: "data-plane
//! endpoints that accept raw SQL use H"). `sql::service` implements the
//! classify/authorize/rewrite contract as a pool-free, Axum-free library;
//! this module is its one HTTP entry point.

pub mod dto;
pub mod handler;
pub mod routes;
