// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Restaurant and table endpoints.

use axum::{extract::State, http::StatusCode, Json};

use super::blocking;
use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiJson, ApiPath, ErrorCode},
    models::{
        CreateRestaurantRequest, CreateTableRequest, Restaurant, RestaurantListResponse, Table,
        TableListResponse, User, UserRole,
    },
    state::AppState,
};

fn validate_restaurant(request: &CreateRestaurantRequest) -> Result<(), ApiError> {
    let missing: Vec<&str> = [
        ("name", &request.name),
        ("address", &request.address),
        ("phone", &request.phone),
        ("email", &request.email),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("required fields are empty").with_extra("fields", missing))
    }
}

/// Staff assigned to a restaurant may only manage that restaurant.
fn ensure_assigned(user: &User, restaurant_id: i64) -> Result<(), ApiError> {
    match user.role {
        UserRole::Staff {
            restaurant_id: Some(assigned),
            ..
        } if assigned != restaurant_id => Err(ApiError::new(ErrorCode::AuthUserNotPermitted)
            .with_description("Staff may only manage the restaurant they are assigned to.")),
        _ => Ok(()),
    }
}

#[utoipa::path(
    post,
    path = "/api/restaurant/create",
    tag = "Restaurants",
    security(("bearer" = [])),
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = Restaurant),
        (status = 400, description = "Invalid request data", body = crate::error::ErrorResponse),
        (status = 403, description = "Admins only", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_restaurant(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    ApiJson(request): ApiJson<CreateRestaurantRequest>,
) -> Result<(StatusCode, Json<Restaurant>), ApiError> {
    validate_restaurant(&request)?;
    let db = state.db.clone();
    let restaurant = blocking(move || Ok(db.create_restaurant(owner.user_id, &request)?)).await?;
    tracing::info!(restaurant_id = restaurant.restaurant_id, "restaurant created");
    Ok((StatusCode::CREATED, Json(restaurant)))
}

#[utoipa::path(
    get,
    path = "/api/restaurants",
    tag = "Restaurants",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All restaurants", body = RestaurantListResponse),
        (status = 403, description = "No client or no user", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<RestaurantListResponse>, ApiError> {
    let db = state.db.clone();
    let restaurants = blocking(move || Ok(db.list_restaurants()?)).await?;
    Ok(Json(RestaurantListResponse { restaurants }))
}

#[utoipa::path(
    get,
    path = "/api/restaurant/{restaurant_id}",
    tag = "Restaurants",
    security(("bearer" = [])),
    params(("restaurant_id" = i64, Path, description = "Restaurant identifier")),
    responses(
        (status = 200, description = "Restaurant", body = Restaurant),
        (status = 404, description = "Restaurant not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_restaurant(
    State(state): State<AppState>,
    ApiPath(restaurant_id): ApiPath<i64>,
) -> Result<Json<Restaurant>, ApiError> {
    let db = state.db.clone();
    let restaurant = blocking(move || Ok(db.get_restaurant(restaurant_id)?))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("restaurant {restaurant_id} does not exist")))?;
    Ok(Json(restaurant))
}

/// Add a table. Elevated staff and above.
#[utoipa::path(
    post,
    path = "/api/restaurant/{restaurant_id}/tables",
    tag = "Restaurants",
    security(("bearer" = [])),
    params(("restaurant_id" = i64, Path, description = "Restaurant identifier")),
    request_body = CreateTableRequest,
    responses(
        (status = 201, description = "Table created", body = Table),
        (status = 400, description = "Invalid request data", body = crate::error::ErrorResponse),
        (status = 403, description = "Not permitted", body = crate::error::ErrorResponse),
        (status = 404, description = "Restaurant not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_table(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(restaurant_id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateTableRequest>,
) -> Result<(StatusCode, Json<Table>), ApiError> {
    ensure_assigned(&user, restaurant_id)?;
    if request.capacity == 0 {
        return Err(ApiError::validation("capacity must be positive").with_extra("fields", vec!["capacity"]));
    }

    let db = state.db.clone();
    let table = blocking(move || Ok(db.add_table(restaurant_id, &request)?)).await?;
    Ok((StatusCode::CREATED, Json(table)))
}

#[utoipa::path(
    get,
    path = "/api/restaurant/{restaurant_id}/tables",
    tag = "Restaurants",
    security(("bearer" = [])),
    params(("restaurant_id" = i64, Path, description = "Restaurant identifier")),
    responses(
        (status = 200, description = "Tables of the restaurant", body = TableListResponse),
        (status = 404, description = "Restaurant not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(restaurant_id): ApiPath<i64>,
) -> Result<Json<TableListResponse>, ApiError> {
    ensure_assigned(&user, restaurant_id)?;
    let db = state.db.clone();
    let tables = blocking(move || {
        if db.get_restaurant(restaurant_id)?.is_none() {
            return Err(ApiError::not_found(format!("restaurant {restaurant_id} does not exist")));
        }
        Ok(db.list_tables(restaurant_id)?)
    })
    .await?;
    Ok(Json(TableListResponse { tables }))
}
