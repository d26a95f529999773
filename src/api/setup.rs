// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! First-run setup endpoints.
//!
//! Only mounted when `SETUP_ROUTES_ENABLED` is set; otherwise they answer
//! `GENUINE_404` like any unknown path. The resolver never authenticates
//! these requests since the database may not exist yet.

use axum::{extract::State, http::StatusCode, Json};

use super::blocking;
use crate::{
    auth::secrets,
    error::{ApiError, ErrorCode},
    models::{ClientCredentials, ClientType, SetupInitResponse, SetupSeedResponse},
    state::AppState,
    storage::database::TABLE_NAMES,
};

fn ensure_enabled(state: &AppState) -> Result<(), ApiError> {
    if state.setup_enabled {
        Ok(())
    } else {
        Err(ApiError::new(ErrorCode::Genuine404))
    }
}

/// Create any missing database table.
#[utoipa::path(
    post,
    path = "/setup/db/init",
    tag = "Setup",
    responses(
        (status = 200, description = "Tables present and those created now", body = SetupInitResponse),
        (status = 404, description = "Setup routes disabled", body = crate::error::ErrorResponse)
    )
)]
pub async fn init_db(State(state): State<AppState>) -> Result<Json<SetupInitResponse>, ApiError> {
    ensure_enabled(&state)?;
    let db = state.db.clone();
    let created = blocking(move || Ok(db.ensure_tables()?)).await?;
    tracing::info!(created = created.len(), "database initialized");
    Ok(Json(SetupInitResponse {
        tables: TABLE_NAMES.iter().map(|name| name.to_string()).collect(),
        created,
    }))
}

/// Provision one client per client type that has no active client yet.
///
/// Secrets of newly created clients are returned once and never again.
#[utoipa::path(
    post,
    path = "/setup/db/seed",
    tag = "Setup",
    responses(
        (status = 201, description = "Clients created", body = SetupSeedResponse),
        (status = 200, description = "Every client type already provisioned", body = SetupSeedResponse),
        (status = 404, description = "Setup routes disabled", body = crate::error::ErrorResponse)
    )
)]
pub async fn seed_db(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SetupSeedResponse>), ApiError> {
    ensure_enabled(&state)?;
    let db = state.db.clone();
    let rng = state.rng.clone();

    let created = blocking(move || {
        db.ensure_tables()?;
        let existing = db.list_clients()?;

        let mut created = Vec::new();
        for client_type in ClientType::ALL {
            let provisioned = existing
                .iter()
                .any(|c| c.client_type == client_type && c.is_active());
            if provisioned {
                continue;
            }
            let (public_uid, secret) = secrets::client_credentials(&rng).map_err(ApiError::internal)?;
            let client = db.create_client(client_type, client_type.default_name(), &public_uid, &secret)?;
            tracing::info!(client_id = client.client_id, client_type = %client_type, "client provisioned");
            created.push(ClientCredentials::from(&client));
        }
        Ok(created)
    })
    .await?;

    let status = if created.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(SetupSeedResponse { created })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::uninitialized_state;

    #[tokio::test]
    async fn disabled_setup_is_not_found() {
        let (mut state, _dir) = uninitialized_state();
        state.setup_enabled = false;
        let err = init_db(State(state)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Genuine404);
    }

    #[tokio::test]
    async fn init_creates_tables() {
        let (state, _dir) = uninitialized_state();
        let Json(body) = init_db(State(state.clone())).await.unwrap();
        assert!(body.tables.contains(&"clients".to_string()));
        assert_eq!(body.created, body.tables);
        assert!(state.db.is_initialized().unwrap());

        let Json(again) = init_db(State(state)).await.unwrap();
        assert_eq!(again.tables.len(), TABLE_NAMES.len());
        assert!(again.created.is_empty());
    }

    #[tokio::test]
    async fn seed_provisions_each_type_once() {
        let (state, _dir) = uninitialized_state();

        let (status, Json(first)) = seed_db(State(state.clone())).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first.created.len(), 3);
        for creds in &first.created {
            assert_eq!(creds.public_uid.len(), secrets::PUBLIC_UID_LEN);
            assert_eq!(creds.secret.len(), secrets::CLIENT_SECRET_LEN);
        }

        let (status, Json(second)) = seed_db(State(state.clone())).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(second.created.is_empty());
        assert_eq!(state.db.list_clients().unwrap().len(), 3);
    }
}
