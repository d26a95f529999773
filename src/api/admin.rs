// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints for account management.
//!
//! Only reachable from the web frontend. These endpoints provide:
//! - Soft revocation of users (admins)
//! - Soft revocation of client applications (elevated admins)
//! - Client secret rotation (elevated admins)
//!
//! Revocation is permanent and never deletes the record.

use axum::{extract::State, Json};
use chrono::Utc;

use super::{blocking, users::creator_group};
use crate::{
    auth::{secrets, CurrentUser},
    error::{ApiError, ApiPath, ErrorCode},
    models::{ClientCredentials, ClientResponse, UserResponse},
    state::AppState,
};

/// Revoke a user's access.
///
/// The caller must be allowed to create users of the target's type, so an
/// admin cannot revoke an elevated admin.
#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/revoke",
    tag = "Admin",
    security(("bearer" = [])),
    params(("user_id" = i64, Path, description = "User to revoke")),
    responses(
        (status = 200, description = "User revoked", body = UserResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn revoke_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    if admin.user_id == user_id {
        return Err(ApiError::validation("administrators cannot revoke themselves"));
    }

    let db = state.db.clone();
    let revoked = blocking(move || {
        let target = db
            .get_user(user_id)?
            .ok_or_else(|| ApiError::not_found(format!("user {user_id} does not exist")))?;
        let allowed = creator_group(target.auth_type).is_none_or(|group| group.contains(admin.auth_type));
        if !allowed {
            return Err(ApiError::new(ErrorCode::AuthUserNotPermitted)
                .with_extra("target_auth_type", target.auth_type.as_str()));
        }
        Ok(db.revoke_user(user_id, Utc::now())?)
    })
    .await?;

    tracing::warn!(user_id, "user access revoked");
    Ok(Json(UserResponse::from(&revoked)))
}

/// Revoke a client application. Tokens naming it stop resolving a client.
#[utoipa::path(
    post,
    path = "/api/admin/clients/{client_id}/revoke",
    tag = "Admin",
    security(("bearer" = [])),
    params(("client_id" = i64, Path, description = "Client to revoke")),
    responses(
        (status = 200, description = "Client revoked", body = ClientResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorResponse),
        (status = 404, description = "Client not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn revoke_client(
    State(state): State<AppState>,
    ApiPath(client_id): ApiPath<i64>,
) -> Result<Json<ClientResponse>, ApiError> {
    let db = state.db.clone();
    let revoked = blocking(move || Ok(db.revoke_client(client_id, Utc::now())?)).await?;
    tracing::warn!(client_id, "client access revoked");
    Ok(Json(ClientResponse::from(&revoked)))
}

/// Issue a new secret for a client.
///
/// The old secret keeps working for `CLIENT_SECRET_GRACE_SECS`.
#[utoipa::path(
    post,
    path = "/api/admin/clients/{client_id}/rotate-secret",
    tag = "Admin",
    security(("bearer" = [])),
    params(("client_id" = i64, Path, description = "Client whose secret is rotated")),
    responses(
        (status = 200, description = "New credentials, shown once", body = ClientCredentials),
        (status = 403, description = "Not permitted", body = crate::error::ErrorResponse),
        (status = 404, description = "Client not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn rotate_client_secret(
    State(state): State<AppState>,
    ApiPath(client_id): ApiPath<i64>,
) -> Result<Json<ClientCredentials>, ApiError> {
    let secret = secrets::random_token(&state.rng, secrets::CLIENT_SECRET_LEN).map_err(ApiError::internal)?;
    let db = state.db.clone();
    let rotated = blocking(move || {
        let client = db
            .get_client(client_id)?
            .ok_or_else(|| ApiError::not_found(format!("client {client_id} does not exist")))?;
        if !client.is_active() {
            return Err(ApiError::validation("revoked clients cannot be rotated"));
        }
        Ok(db.rotate_client_secret(client_id, &secret, Utc::now())?)
    })
    .await?;

    tracing::info!(client_id, "client secret rotated");
    Ok(Json(ClientCredentials::from(&rotated)))
}
