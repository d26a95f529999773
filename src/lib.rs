// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Waitress - Restaurant Management API Server
//!
//! Every request is bound to a registered client application (web, iOS or
//! Android) and optionally to an authenticated user through a signed bearer
//! token. Routes declare the user types they admit using the tiered
//! permission groups in [`auth::permissions`].
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Token codec, request context resolution and route guards
//! - `config` - Environment configuration
//! - `storage` - Embedded redb database

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
