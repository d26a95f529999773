// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization checks and the route middleware built on them.
//!
//! Guards read the [`RequestContext`] left by the resolver and either let
//! the request through untouched or answer with a structured 403. They are
//! attached with `route_layer`, so the handler never runs on denial:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/api/restaurant/create", post(create_restaurant))
//!     .route_layer(from_fn_with_state(AUTH_GROUPS.admin.all, require_user))
//!     .route_layer(from_fn(require_client));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::context::RequestContext;
use super::permissions::{UserTypeSet, AUTH_GROUPS};
use crate::error::{ApiError, ErrorCode};
use crate::models::{Client, ClientType, User};

/// Group actually enforced for `required`. An empty group means any
/// authenticated user, never "no restriction".
fn effective_group(required: UserTypeSet) -> UserTypeSet {
    if required.is_empty() {
        AUTH_GROUPS.all
    } else {
        required
    }
}

/// Whether the context holds a user whose type is in `required`.
pub fn authorize(ctx: &RequestContext, required: UserTypeSet) -> bool {
    match &ctx.user {
        Some(user) => effective_group(required).contains(user.auth_type),
        None => false,
    }
}

/// Whether the context holds a client.
pub fn authorize_client(ctx: &RequestContext) -> bool {
    ctx.client.is_some()
}

/// The context's user, if any.
pub fn check_user(ctx: &RequestContext) -> Result<&User, ApiError> {
    ctx.user
        .as_ref()
        .ok_or_else(|| ApiError::new(ErrorCode::AuthUserRequired))
}

/// The context's user, if its type is in `required`.
pub fn check_user_in(ctx: &RequestContext, required: UserTypeSet) -> Result<&User, ApiError> {
    let user = check_user(ctx)?;
    if authorize(ctx, required) {
        Ok(user)
    } else {
        Err(ApiError::new(ErrorCode::AuthUserNotPermitted)
            .with_extra("auth_type", user.auth_type.as_str()))
    }
}

pub fn check_client(ctx: &RequestContext) -> Result<&Client, ApiError> {
    ctx.client
        .as_ref()
        .ok_or_else(|| ApiError::new(ErrorCode::AuthClientRequired))
}

/// The context's client, if it is of `required` type.
pub fn check_client_type(ctx: &RequestContext, required: ClientType) -> Result<&Client, ApiError> {
    let client = check_client(ctx)?;
    if client.client_type == required {
        return Ok(client);
    }
    let code = match required {
        ClientType::Web => ErrorCode::AuthWebOnly,
        ClientType::Ios | ClientType::Android => ErrorCode::AuthClientNotPermitted,
    };
    Err(ApiError::new(code))
}

fn context(request: &Request) -> Option<&RequestContext> {
    request.extensions().get::<RequestContext>()
}

fn deny(request: &Request, err: ApiError) -> Response {
    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        code = %err.code,
        "request denied"
    );
    err.into_response()
}

/// Require a user whose type is in the state's group.
pub async fn require_user(State(required): State<UserTypeSet>, request: Request, next: Next) -> Response {
    let checked = match context(&request) {
        Some(ctx) => check_user_in(ctx, required).map(|_| ()),
        None => Err(ApiError::new(ErrorCode::AuthUserRequired)),
    };
    match checked {
        Ok(()) => next.run(request).await,
        Err(err) => deny(&request, err),
    }
}

/// Require any active client.
pub async fn require_client(request: Request, next: Next) -> Response {
    let checked = match context(&request) {
        Some(ctx) => check_client(ctx).map(|_| ()),
        None => Err(ApiError::new(ErrorCode::AuthClientRequired)),
    };
    match checked {
        Ok(()) => next.run(request).await,
        Err(err) => deny(&request, err),
    }
}

/// Require the web frontend client.
pub async fn require_web_client(request: Request, next: Next) -> Response {
    let checked = match context(&request) {
        Some(ctx) => check_client_type(ctx, ClientType::Web).map(|_| ()),
        None => Err(ApiError::new(ErrorCode::AuthClientRequired)),
    };
    match checked {
        Ok(()) => next.run(request).await,
        Err(err) => deny(&request, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use chrono::Utc;
    use tower::ServiceExt;

    use crate::auth::permissions::UserType;
    use crate::models::UserRole;

    fn user(auth_type: UserType) -> User {
        User {
            user_id: 42,
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: "grace@example.com".into(),
            password_hash: "hash".into(),
            auth_type,
            role: UserRole::default_for(auth_type),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            access_revoked: None,
        }
    }

    fn client(client_type: ClientType) -> Client {
        Client {
            client_id: 5,
            public_uid: "abcdefgh".into(),
            client_type,
            name: "test".into(),
            secret: "secret".into(),
            previous_secret: None,
            last_secret_rotation: None,
            access_revoked: None,
            created_at: Utc::now(),
        }
    }

    fn ctx(client: Option<Client>, user: Option<User>) -> RequestContext {
        RequestContext {
            client,
            user,
            keypair_secret: None,
            timezone: Arc::from("UTC"),
        }
    }

    #[test]
    fn authorize_requires_a_user() {
        let anonymous = ctx(Some(client(ClientType::Web)), None);
        assert!(!authorize(&anonymous, AUTH_GROUPS.customer.all));
        assert_eq!(
            check_user_in(&anonymous, AUTH_GROUPS.staff.all).unwrap_err().code,
            ErrorCode::AuthUserRequired
        );
    }

    #[test]
    fn authorize_checks_membership() {
        let admin = ctx(None, Some(user(UserType::AdminSuper)));
        assert!(authorize(&admin, AUTH_GROUPS.admin.all));
        assert!(authorize(&admin, AUTH_GROUPS.staff.all));
        assert!(!authorize(&admin, AUTH_GROUPS.dev.all));

        let staff = ctx(None, Some(user(UserType::Staff)));
        assert!(!authorize(&staff, AUTH_GROUPS.staff.elevated_or_all()));
        let err = check_user_in(&staff, AUTH_GROUPS.admin.all).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthUserNotPermitted);
        assert_eq!(err.extras["auth_type"], "staff");
    }

    #[test]
    fn empty_group_means_any_authenticated_user() {
        let customer = ctx(None, Some(user(UserType::Customer)));
        assert!(authorize(&customer, UserTypeSet::EMPTY));
        assert!(!authorize(&ctx(None, None), UserTypeSet::EMPTY));
    }

    #[test]
    fn client_checks() {
        assert!(!authorize_client(&ctx(None, None)));
        assert!(authorize_client(&ctx(Some(client(ClientType::Ios)), None)));

        let ios = ctx(Some(client(ClientType::Ios)), None);
        assert_eq!(
            check_client_type(&ios, ClientType::Web).unwrap_err().code,
            ErrorCode::AuthWebOnly
        );
        assert_eq!(
            check_client_type(&ctx(None, None), ClientType::Web).unwrap_err().code,
            ErrorCode::AuthClientRequired
        );
        assert!(check_client_type(&ios, ClientType::Ios).is_ok());
    }

    fn guarded_app(required: UserTypeSet, context: RequestContext) -> Router {
        Router::new()
            .route("/guarded", get(|| async { "handler ran" }))
            .route_layer(middleware::from_fn_with_state(required, require_user))
            .route_layer(middleware::from_fn(require_client))
            .layer(axum::Extension(context))
    }

    async fn status_of(app: Router) -> StatusCode {
        let request = axum::http::Request::builder().uri("/guarded").body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn middleware_allows_member() {
        let context = ctx(Some(client(ClientType::Web)), Some(user(UserType::AdminSuper)));
        assert_eq!(status_of(guarded_app(AUTH_GROUPS.admin.all, context)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn middleware_denies_without_user() {
        let context = ctx(Some(client(ClientType::Web)), None);
        assert_eq!(
            status_of(guarded_app(AUTH_GROUPS.staff.all, context)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn middleware_denies_without_client() {
        let context = ctx(None, Some(user(UserType::AdminSuper)));
        assert_eq!(
            status_of(guarded_app(AUTH_GROUPS.admin.all, context)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn web_only_rejects_mobile_clients() {
        let app = Router::new()
            .route("/guarded", get(|| async { "handler ran" }))
            .route_layer(middleware::from_fn(require_web_client))
            .layer(axum::Extension(ctx(Some(client(ClientType::Android)), None)));
        assert_eq!(status_of(app).await, StatusCode::FORBIDDEN);
    }
}
