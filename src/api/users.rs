// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use super::blocking;
use crate::{
    auth::{
        guard::check_user_in, permissions::UserTypeSet, Ctx, CurrentClient, CurrentUser,
        TokenClaims, UserType, AUTH_GROUPS,
    },
    error::{ApiError, ApiJson, ErrorCode},
    models::{CreateUserRequest, CreateUserResponse, UpdateAccountRequest, UserResponse, UserRole},
    state::AppState,
    storage::{
        database::{NewUser, UserUpdate},
        StorageError,
    },
};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Group the caller must belong to in order to create a user of `user_type`.
/// `None` means open registration.
pub fn creator_group(user_type: UserType) -> Option<UserTypeSet> {
    match user_type {
        UserType::Customer => None,
        UserType::Staff | UserType::StaffSuper | UserType::Admin => Some(AUTH_GROUPS.admin.all),
        UserType::AdminSuper => Some(AUTH_GROUPS.admin.elevated_or_all()),
        UserType::Dev => Some(AUTH_GROUPS.dev.all),
    }
}

fn is_valid_email(email: &str) -> bool {
    email
        .trim()
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
}

fn validate(request: &CreateUserRequest) -> Result<(), ApiError> {
    let mut missing = Vec::new();
    for (field, value) in [
        ("first_name", &request.first_name),
        ("last_name", &request.last_name),
        ("email", &request.email),
    ] {
        if value.trim().is_empty() {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(ApiError::validation("required fields are empty").with_extra("fields", missing));
    }

    if !is_valid_email(&request.email) {
        return Err(ApiError::validation("email address is malformed").with_extra("fields", vec!["email"]));
    }

    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ))
        .with_extra("fields", vec!["password"]));
    }
    Ok(())
}

/// Register a user.
///
/// Anyone holding a client token may register a `customer`. Every other
/// user type needs an authenticated admin.
#[utoipa::path(
    post,
    path = "/api/users/create",
    tag = "Users",
    security(("bearer" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Invalid request data", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller may not create this user type", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentClient(client): CurrentClient,
    Ctx(ctx): Ctx,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    let user_type = request.user_type.unwrap_or(UserType::Customer);
    if let Some(group) = creator_group(user_type) {
        check_user_in(&ctx, group)?;
    }
    validate(&request)?;

    let db = state.db.clone();
    let hasher = state.hasher.clone();
    let user = blocking(move || {
        let password_hash = hasher.hash(&request.password)?;
        let new_user = NewUser {
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: request.email.trim().to_string(),
            password_hash,
            auth_type: user_type,
            role: request.role.unwrap_or_else(|| UserRole::default_for(user_type)),
        };
        db.create_user(new_user).map_err(|e| match e {
            StorageError::Conflict(_) => ApiError::new(ErrorCode::EmailAlreadyExists),
            other => other.into(),
        })
    })
    .await?;

    tracing::info!(user_id = user.user_id, user_type = %user_type, "user created");
    let token = state
        .codec
        .encode(&TokenClaims::user(client.client_id, user.user_id))?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: UserResponse::from(&user),
            token,
        }),
    ))
}

/// Trim the fields of an account update and reject blank or malformed ones.
fn account_update(request: UpdateAccountRequest) -> Result<UserUpdate, ApiError> {
    let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string());
    let update = UserUpdate {
        first_name: trimmed(request.first_name),
        last_name: trimmed(request.last_name),
        email: trimmed(request.email),
        phone: trimmed(request.phone),
    };

    let blank: Vec<&str> = [
        ("first_name", &update.first_name),
        ("last_name", &update.last_name),
        ("email", &update.email),
    ]
    .into_iter()
    .filter(|(_, value)| value.as_deref().is_some_and(str::is_empty))
    .map(|(field, _)| field)
    .collect();
    if !blank.is_empty() {
        return Err(ApiError::validation("fields cannot be blank").with_extra("fields", blank));
    }
    if update.email.as_deref().is_some_and(|email| !is_valid_email(email)) {
        return Err(ApiError::validation("email address is malformed").with_extra("fields", vec!["email"]));
    }
    if update.first_name.is_none()
        && update.last_name.is_none()
        && update.email.is_none()
        && update.phone.is_none()
    {
        return Err(ApiError::validation("no fields to update"));
    }
    Ok(update)
}

/// Update the current user's account information.
///
/// Existing tokens stay valid since they name the user by id.
#[utoipa::path(
    post,
    path = "/api/users/update-account-info",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid request data", body = crate::error::ErrorResponse),
        (status = 403, description = "No client or no user", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let update = account_update(request)?;
    let email_changed = update.email.is_some();

    let db = state.db.clone();
    let user_id = user.user_id;
    let updated = blocking(move || {
        db.update_user(user_id, update, Utc::now()).map_err(|e| match e {
            StorageError::Conflict(_) => ApiError::new(ErrorCode::EmailAlreadyExists),
            other => other.into(),
        })
    })
    .await?;

    tracing::info!(user_id, email_changed, "account information updated");
    Ok(Json(UserResponse::from(&updated)))
}

/// Get the current authenticated user.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserResponse),
        (status = 403, description = "No client or no user", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
