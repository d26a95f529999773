// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication bound to registered client applications.
//!
//! ## Auth Flow
//!
//! 1. A frontend exchanges its client credentials at `/api/auth/client-token`
//!    for a client-only token.
//! 2. Users log in with that token; `/api/auth/login` returns a token that
//!    names both the client and the user.
//! 3. Every request passes through [`resolver::resolve_request_context`],
//!    which verifies the token and loads the active client and user.
//! 4. Route guards in [`guard`] compare the resolved user's type against the
//!    tiers in [`permissions::AUTH_GROUPS`].
//!
//! ## Security
//!
//! - Tokens are HS256 with a process-wide secret and carry no expiry;
//!   revoking the client or user is how access ends
//! - Revoked clients and users are never attached to a request
//! - Client secrets are compared in constant time

pub mod context;
pub mod guard;
pub mod password;
pub mod permissions;
pub mod resolver;
pub mod secrets;
pub mod token;

pub use context::{CurrentClient, CurrentUser, Ctx, RequestContext};
pub use guard::{require_client, require_user, require_web_client};
pub use permissions::{UserType, UserTypeSet, AUTH_GROUPS};
pub use token::{TokenClaims, TokenCodec, TokenError};
