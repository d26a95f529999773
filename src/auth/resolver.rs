// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request authentication resolver.
//!
//! Runs once per request, ahead of routing, and leaves a
//! [`RequestContext`] in the request extensions:
//!
//! 1. No `Authorization` header: anonymous context.
//! 2. Header not exactly `Bearer <token>`: `AUTH_HEADER_INVALID`.
//! 3. Token fails to decode or lacks a client id: `AUTH_DECODE_ERROR`.
//! 4. The active client and, when the token names one, the active user are
//!    loaded. Missing or revoked records simply stay unset; route guards
//!    decide whether that matters.
//!
//! Requests under [`SETUP_PATH_PREFIX`] skip all of the above and always
//! get an anonymous context, since the database may not exist yet.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::context::RequestContext;
use super::token::{TokenClaims, TokenCodec};
use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;
use crate::storage::{IdentityStore, StorageError};

/// Paths that bypass authentication entirely.
pub const SETUP_PATH_PREFIX: &str = "/setup/";

/// Extract the token from an `Authorization` header value.
///
/// After trimming the whole value it must read `Bearer ` followed by one
/// non-empty run of non-whitespace characters.
pub fn bearer_token(value: &str) -> Option<&str> {
    let token = value.trim().strip_prefix("Bearer ")?;
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return None;
    }
    Some(token)
}

/// Resolve the identities named by the request headers.
pub async fn resolve_context<S>(
    headers: &HeaderMap,
    codec: &TokenCodec,
    store: Arc<S>,
    timezone: Arc<str>,
) -> Result<RequestContext, ApiError>
where
    S: IdentityStore + ?Sized + 'static,
{
    let mut ctx = RequestContext::anonymous(timezone);

    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(ctx);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::new(ErrorCode::AuthHeaderInvalid))?;

    let TokenClaims {
        client_id,
        user_id,
        keypair_secret,
    } = codec.decode(token).map_err(|e| {
        tracing::warn!(error = %e, "bearer token rejected");
        ApiError::new(ErrorCode::AuthDecodeError)
    })?;

    let (client, user) = tokio::task::spawn_blocking(move || {
        let client = store.find_active_client_by_id(client_id)?;
        let user = match user_id {
            Some(id) => store.find_active_user_by_id(id)?,
            None => None,
        };
        Ok::<_, StorageError>((client, user))
    })
    .await
    .map_err(ApiError::internal)?
    .map_err(ApiError::db_error)?;

    if client.is_none() {
        tracing::debug!(client_id, "token names an unknown or revoked client");
    }

    ctx.client = client;
    ctx.user = user;
    ctx.keypair_secret = keypair_secret;
    Ok(ctx)
}

/// Outermost middleware attaching a [`RequestContext`] to every request.
pub async fn resolve_request_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path().starts_with(SETUP_PATH_PREFIX) {
        request.extensions_mut().remove::<RequestContext>();
        request
            .extensions_mut()
            .insert(RequestContext::anonymous(state.timezone.clone()));
        return next.run(request).await;
    }

    let resolved = resolve_context(
        request.headers(),
        &state.codec,
        state.db.clone(),
        state.timezone.clone(),
    )
    .await;

    match resolved {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %request.uri().path(), code = %err.code, "authentication failed");
            err.into_response()
        }
    }
}
