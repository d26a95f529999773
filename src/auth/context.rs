// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request authentication context and its extractors.
//!
//! The resolver inserts a [`RequestContext`] into the request extensions
//! before routing. Handlers read it with one of:
//!
//! ```rust,ignore
//! async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> { .. }
//! async fn login(CurrentClient(client): CurrentClient, ..) { .. }
//! async fn anything(Ctx(ctx): Ctx) { .. }
//! ```

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::guard::{check_client, check_user};
use crate::error::{ApiError, ErrorCode};
use crate::models::{Client, User};
use crate::state::AppState;

/// Identities resolved for one request. Never shared between requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client: Option<Client>,
    pub user: Option<User>,
    /// One-time secret carried by the token, if any.
    pub keypair_secret: Option<String>,
    pub timezone: Arc<str>,
}

impl RequestContext {
    /// Context with no client and no user.
    pub fn anonymous(timezone: Arc<str>) -> Self {
        Self {
            client: None,
            user: None,
            keypair_secret: None,
            timezone,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.client.is_none() && self.user.is_none()
    }
}

/// The whole context. Anonymous when the resolver did not run.
#[derive(Debug, Clone)]
pub struct Ctx(pub RequestContext);

impl FromRequestParts<AppState> for Ctx {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::anonymous(state.timezone.clone()));
        Ok(Ctx(ctx))
    }
}

/// The resolved user. Rejects with `AUTH_USER_REQUIRED` when absent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<RequestContext>()
            .ok_or_else(|| ApiError::new(ErrorCode::AuthUserRequired))?;
        Ok(CurrentUser(check_user(ctx)?.clone()))
    }
}

/// The resolved client. Rejects with `AUTH_CLIENT_REQUIRED` when absent.
#[derive(Debug, Clone)]
pub struct CurrentClient(pub Client);

impl<S: Send + Sync> FromRequestParts<S> for CurrentClient {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<RequestContext>()
            .ok_or_else(|| ApiError::new(ErrorCode::AuthClientRequired))?;
        Ok(CurrentClient(check_client(ctx)?.clone()))
    }
}
