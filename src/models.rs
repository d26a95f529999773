// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Stored records and the request/response bodies of the REST API. Records
//! that hold secret material ([`Client`], [`User`]) are never serialized to
//! API clients directly; handlers convert them to the matching `*Response`
//! type first.
//!
//! ## Model Categories
//!
//! - **Clients**: registered frontend applications and their credentials
//! - **Users**: accounts with a permission [`UserType`] and a structural [`UserRole`]
//! - **Restaurants & Tables**: the resources the permission tiers protect

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

use crate::auth::permissions::UserType;

// =============================================================================
// Clients
// =============================================================================

/// Kind of frontend a client application is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Web,
    Ios,
    Android,
}

impl ClientType {
    pub const ALL: [ClientType; 3] = [ClientType::Web, ClientType::Ios, ClientType::Android];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Web => "web",
            ClientType::Ios => "ios",
            ClientType::Android => "android",
        }
    }

    /// Name given to the client provisioned during setup.
    pub fn default_name(&self) -> &'static str {
        match self {
            ClientType::Web => "waitress-web-frontend",
            ClientType::Ios => "waitress-mobile-ios",
            ClientType::Android => "waitress-mobile-android",
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered client application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub client_id: i64,
    /// Short public identifier handed to frontends.
    pub public_uid: String,
    pub client_type: ClientType,
    pub name: String,
    pub secret: String,
    /// Secret replaced by the last rotation, accepted during the grace window.
    pub previous_secret: Option<String>,
    pub last_secret_rotation: Option<DateTime<Utc>>,
    /// Set once; a revoked client is never resolved again.
    pub access_revoked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn is_active(&self) -> bool {
        self.access_revoked.is_none()
    }

    /// Whether `previous_secret` may still be used at `now`.
    pub fn previous_secret_valid(&self, now: DateTime<Utc>, grace: chrono::Duration) -> bool {
        match (&self.previous_secret, self.last_secret_rotation) {
            (Some(_), Some(rotated)) => now - rotated <= grace,
            _ => false,
        }
    }
}

/// Client details safe to return over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ClientResponse {
    pub client_id: i64,
    pub public_uid: String,
    pub client_type: ClientType,
    pub name: String,
    pub last_secret_rotation: Option<DateTime<Utc>>,
    pub access_revoked: Option<DateTime<Utc>>,
}

impl From<&Client> for ClientResponse {
    fn from(client: &Client) -> Self {
        Self {
            client_id: client.client_id,
            public_uid: client.public_uid.clone(),
            client_type: client.client_type,
            name: client.name.clone(),
            last_secret_rotation: client.last_secret_rotation,
            access_revoked: client.access_revoked,
        }
    }
}

/// Credentials of a freshly provisioned client. Shown once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientCredentials {
    pub client_id: i64,
    pub public_uid: String,
    pub client_type: ClientType,
    pub name: String,
    pub secret: String,
}

impl From<&Client> for ClientCredentials {
    fn from(client: &Client) -> Self {
        Self {
            client_id: client.client_id,
            public_uid: client.public_uid.clone(),
            client_type: client.client_type,
            name: client.name.clone(),
            secret: client.secret.clone(),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// Structural role of a user, with role-specific attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Staff {
        #[serde(default)]
        restaurant_id: Option<i64>,
        #[serde(default)]
        position: Option<String>,
    },
    Customer {
        #[serde(default)]
        phone: Option<String>,
    },
}

impl UserRole {
    /// Role implied by a user type when the caller does not send one.
    pub fn default_for(user_type: UserType) -> Self {
        match user_type {
            UserType::StaffSuper | UserType::Staff => UserRole::Staff {
                restaurant_id: None,
                position: None,
            },
            UserType::Customer => UserRole::Customer { phone: None },
            UserType::Dev | UserType::AdminSuper | UserType::Admin => UserRole::User,
        }
    }
}

/// A person who may authenticate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Email as entered. Uniqueness is enforced on [`normalize_email`].
    pub email: String,
    pub password_hash: String,
    /// Permission-group membership.
    pub auth_type: UserType,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub access_revoked: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.access_revoked.is_none()
    }
}

/// User details safe to return over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserResponse {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub auth_type: UserType,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub access_revoked: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            auth_type: user.auth_type,
            role: user.role.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            access_revoked: user.access_revoked,
        }
    }
}

/// Lookup key for an email address: NFKC, lowercased, trimmed.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

/// Login history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserLogin {
    pub login_id: i64,
    pub user_id: i64,
    pub client_id: i64,
    pub user_agent: String,
    pub remote_addr: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Restaurants & Tables
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Restaurant {
    pub restaurant_id: i64,
    /// User that created the restaurant.
    pub owner_id: i64,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: Option<String>,
    pub number_of_tables: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Table {
    pub table_id: i64,
    pub restaurant_id: i64,
    pub table_number: u32,
    /// Seats, always positive.
    pub capacity: u32,
    pub location_description: Option<String>,
}

// =============================================================================
// Requests & Responses
// =============================================================================

/// Exchange client credentials for a client-only token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientTokenRequest {
    pub public_uid: String,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientTokenResponse {
    pub token: String,
    pub client: ClientResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Token bound to the calling client and the user.
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Defaults to `customer`. Any other type requires an admin caller.
    #[serde(default)]
    pub user_type: Option<UserType>,
    /// Defaults to the role implied by `user_type`.
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserResponse {
    pub user: UserResponse,
    /// Token bound to the calling client and the new user.
    pub token: String,
}

/// Edit-account form. Omitted fields stay as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Stored on customer accounts only.
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRestaurantRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub number_of_tables: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTableRequest {
    pub table_number: u32,
    pub capacity: u32,
    #[serde(default)]
    pub location_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestaurantListResponse {
    pub restaurants: Vec<Restaurant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableListResponse {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetupInitResponse {
    /// Tables present after initialization.
    pub tables: Vec<String>,
    /// Tables this call created. Empty when the database was ready.
    pub created: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetupSeedResponse {
    /// Clients created by this call. Existing clients are left untouched.
    pub created: Vec<ClientCredentials>,
}
