// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance endpoints.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, State},
    http::{header::USER_AGENT, request::Parts},
    Json,
};
use chrono::Utc;

use super::blocking;
use crate::{
    auth::{secrets::secrets_match, CurrentClient, TokenClaims},
    error::{ApiError, ApiJson, ErrorCode},
    models::{
        ClientResponse, ClientTokenRequest, ClientTokenResponse, LoginRequest, LoginResponse,
        UserResponse,
    },
    state::AppState,
};

/// Peer address of the request, when known.
///
/// Taken from the connection when the server was started with connect info,
/// otherwise from the first `X-Forwarded-For` entry.
pub struct RemoteAddr(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for RemoteAddr {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            return Ok(RemoteAddr(Some(addr.ip().to_string())));
        }
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(RemoteAddr(forwarded))
    }
}

/// Exchange client credentials for a client-only token.
///
/// The previous secret is accepted until the rotation grace window ends.
#[utoipa::path(
    post,
    path = "/api/auth/client-token",
    tag = "Auth",
    request_body = ClientTokenRequest,
    responses(
        (status = 200, description = "Client token issued", body = ClientTokenResponse),
        (status = 400, description = "Unknown client or wrong secret", body = crate::error::ErrorResponse)
    )
)]
pub async fn client_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClientTokenRequest>,
) -> Result<Json<ClientTokenResponse>, ApiError> {
    let db = state.db.clone();
    let public_uid = request.public_uid.clone();
    let client = blocking(move || Ok(db.find_active_client_by_public_uid(&public_uid)?))
        .await?
        .ok_or_else(|| ApiError::new(ErrorCode::AuthWebappInvalid))?;

    let current = secrets_match(&client.secret, &request.secret);
    let previous = client.previous_secret_valid(Utc::now(), state.client_secret_grace)
        && client
            .previous_secret
            .as_deref()
            .is_some_and(|old| secrets_match(old, &request.secret));
    if !(current || previous) {
        tracing::warn!(client_id = client.client_id, "client secret mismatch");
        return Err(ApiError::new(ErrorCode::AuthWebappInvalid));
    }

    let token = state.codec.encode(&TokenClaims::client(client.client_id))?;
    Ok(Json(ClientTokenResponse {
        token,
        client: ClientResponse::from(&client),
    }))
}

/// Log a user in through the calling client.
///
/// A wrong password answers `202 PASSWORD_INCORRECT`.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    security(("bearer" = [])),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 202, description = "Password incorrect", body = crate::error::ErrorResponse),
        (status = 403, description = "No client token", body = crate::error::ErrorResponse),
        (status = 404, description = "No active user with this email", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    CurrentClient(client): CurrentClient,
    RemoteAddr(remote_addr): RemoteAddr,
    headers: axum::http::HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::validation("email and password are required"));
    }

    let db = state.db.clone();
    let hasher = state.hasher.clone();
    let user = blocking(move || {
        let Some(user) = db.find_active_user_by_email(&request.email)? else {
            return Err(ApiError::new(ErrorCode::UserNotFound));
        };
        if !hasher.verify(&request.password, &user.password_hash)? {
            return Err(ApiError::new(ErrorCode::PasswordIncorrect));
        }
        Ok(user)
    })
    .await?;

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| client.client_type.to_string());

    let db = state.db.clone();
    let (user_id, client_id) = (user.user_id, client.client_id);
    blocking(move || Ok(db.record_login(user_id, client_id, &user_agent, remote_addr)?)).await?;

    let token = state.codec.encode(&TokenClaims::user(client_id, user_id))?;
    tracing::info!(user_id, client_id, "user logged in");
    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(&user),
    }))
}
