// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        permissions::UserTypeSet, require_client, require_user, require_web_client,
        resolver::resolve_request_context, UserType, AUTH_GROUPS,
    },
    error::{
        method_not_allowed, panic_response, route_not_found, ApiError, ErrorDetail, ErrorResponse,
    },
    models::{
        ClientCredentials, ClientResponse, ClientTokenRequest, ClientTokenResponse, ClientType,
        CreateRestaurantRequest, CreateTableRequest, CreateUserRequest, CreateUserResponse,
        LoginRequest, LoginResponse, Restaurant, RestaurantListResponse, SetupInitResponse,
        SetupSeedResponse, Table, TableListResponse, UpdateAccountRequest, UserResponse, UserRole,
    },
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod restaurants;
pub mod setup;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

/// Run storage or hashing work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(ApiError::internal)?
}

/// Routes open to any active client that also carry a user in `group`.
fn for_users(group: UserTypeSet, routes: Router<AppState>) -> Router<AppState> {
    routes
        .route_layer(from_fn_with_state(group, require_user))
        .route_layer(from_fn(require_client))
}

/// Routes restricted to the web frontend and a user in `group`.
fn for_web_users(group: UserTypeSet, routes: Router<AppState>) -> Router<AppState> {
    routes
        .route_layer(from_fn_with_state(group, require_user))
        .route_layer(from_fn(require_web_client))
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/setup/db/init", post(setup::init_db))
        .route("/setup/db/seed", post(setup::seed_db))
        .route("/api/auth/client-token", post(auth::client_token));

    let client_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/users/create", post(users::create_user))
        .route_layer(from_fn(require_client));

    let user_routes = for_users(
        AUTH_GROUPS.all,
        Router::new()
            .route("/api/users/me", get(users::get_current_user))
            .route("/api/users/update-account-info", post(users::update_account)),
    );

    let admin_routes = for_users(
        AUTH_GROUPS.admin.all,
        Router::new().route("/api/restaurant/create", post(restaurants::create_restaurant)),
    );

    let customer_routes = for_users(
        AUTH_GROUPS.customer.all,
        Router::new()
            .route("/api/restaurants", get(restaurants::list_restaurants))
            .route("/api/restaurant/{restaurant_id}", get(restaurants::get_restaurant)),
    );

    let staff_routes = for_users(
        AUTH_GROUPS.staff.all,
        Router::new().route(
            "/api/restaurant/{restaurant_id}/tables",
            get(restaurants::list_tables),
        ),
    );

    let staff_elevated_routes = for_users(
        AUTH_GROUPS.staff.elevated_or_all(),
        Router::new().route(
            "/api/restaurant/{restaurant_id}/tables",
            post(restaurants::add_table),
        ),
    );

    let web_admin_routes = for_web_users(
        AUTH_GROUPS.admin.all,
        Router::new().route("/api/admin/users/{user_id}/revoke", post(admin::revoke_user)),
    );

    let web_admin_elevated_routes = for_web_users(
        AUTH_GROUPS.admin.elevated_or_all(),
        Router::new()
            .route(
                "/api/admin/clients/{client_id}/revoke",
                post(admin::revoke_client),
            )
            .route(
                "/api/admin/clients/{client_id}/rotate-secret",
                post(admin::rotate_client_secret),
            ),
    );

    Router::new()
        .merge(public_routes)
        .merge(client_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .merge(customer_routes)
        .merge(staff_routes)
        .merge(staff_elevated_routes)
        .merge(web_admin_routes)
        .merge(web_admin_elevated_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .layer(from_fn_with_state(state.clone(), resolve_request_context))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http",
                method = %request.method(),
                path = %request.uri().path(),
                request_id
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Registers the `bearer` security scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        setup::init_db,
        setup::seed_db,
        auth::client_token,
        auth::login,
        users::create_user,
        users::get_current_user,
        users::update_account,
        admin::revoke_user,
        admin::revoke_client,
        admin::rotate_client_secret,
        restaurants::create_restaurant,
        restaurants::list_restaurants,
        restaurants::get_restaurant,
        restaurants::add_table,
        restaurants::list_tables
    ),
    components(
        schemas(
            ErrorResponse,
            ErrorDetail,
            UserType,
            UserRole,
            ClientType,
            ClientResponse,
            ClientCredentials,
            ClientTokenRequest,
            ClientTokenResponse,
            LoginRequest,
            LoginResponse,
            CreateUserRequest,
            CreateUserResponse,
            UpdateAccountRequest,
            UserResponse,
            Restaurant,
            Table,
            CreateRestaurantRequest,
            CreateTableRequest,
            RestaurantListResponse,
            TableListResponse,
            SetupInitResponse,
            SetupSeedResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Setup", description = "First-run database setup"),
        (name = "Auth", description = "Client and user token issuance"),
        (name = "Users", description = "Registration and current user"),
        (name = "Admin", description = "User and client revocation"),
        (name = "Restaurants", description = "Restaurants and their tables")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use tower::ServiceExt;

    use crate::api::test_support::{body_json, test_state};

    #[tokio::test]
    async fn unknown_path_is_genuine_404() {
        let (state, _dir) = test_state();
        let response = router(state)
            .oneshot(axum::http::Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
        let body = body_json(response).await;
        assert_eq!(body["err"]["type"], "GENUINE_404");
    }

    #[tokio::test]
    async fn wrong_method_keeps_the_error_envelope() {
        let (state, _dir) = test_state();
        let response = router(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/auth/client-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["http_status_code"], 404);
        assert_eq!(body["err"]["type"], "GENUINE_404");
        assert_eq!(body["err"]["extras"]["method"], "GET");
    }

    #[tokio::test]
    async fn openapi_lists_protected_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/users/me"));
        assert!(doc.paths.paths.contains_key("/api/users/update-account-info"));
        assert!(doc.paths.paths.contains_key("/api/restaurant/{restaurant_id}/tables"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
    }

    #[tokio::test]
    async fn openapi_json_is_served() {
        let (state, _dir) = test_state();
        let response = router(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api-doc/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
