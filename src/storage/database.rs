// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded identity and restaurant database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `clients`: client_id → serialized Client
//! - `client_uid_index`: public_uid → client_id
//! - `users`: user_id → serialized User
//! - `user_email_index`: normalized email → user_id
//! - `user_logins`: (user_id, login_id) → serialized UserLogin
//! - `restaurants`: restaurant_id → serialized Restaurant
//! - `tables`: (restaurant_id, table_id) → serialized Table
//! - `counters`: sequence name → last issued id
//!
//! Tables are created by [`Database::ensure_tables`]. Until then every
//! lookup behaves as if the store were empty.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{
    ReadableDatabase, ReadableTable, TableDefinition, TableError, TableHandle, WriteTransaction,
};
use serde::de::DeserializeOwned;

use super::{IdentityStore, StorageError, StorageResult};
use crate::auth::permissions::UserType;
use crate::models::{
    normalize_email, Client, ClientType, CreateRestaurantRequest, CreateTableRequest, Restaurant,
    Table, User, UserLogin, UserRole,
};

// =============================================================================
// Table Definitions
// =============================================================================

const CLIENTS: TableDefinition<i64, &[u8]> = TableDefinition::new("clients");

const CLIENT_UID_INDEX: TableDefinition<&str, i64> = TableDefinition::new("client_uid_index");

const USERS: TableDefinition<i64, &[u8]> = TableDefinition::new("users");

/// Keyed by [`normalize_email`], never by the raw address.
const USER_EMAIL_INDEX: TableDefinition<&str, i64> = TableDefinition::new("user_email_index");

/// Keyed by user first so one user's history is a range scan.
const USER_LOGINS: TableDefinition<(i64, i64), &[u8]> = TableDefinition::new("user_logins");

const RESTAURANTS: TableDefinition<i64, &[u8]> = TableDefinition::new("restaurants");

/// Composite key so a restaurant's tables are one range scan.
const TABLES: TableDefinition<(i64, i64), &[u8]> = TableDefinition::new("tables");

const COUNTERS: TableDefinition<&str, i64> = TableDefinition::new("counters");

/// Names of every table, in creation order.
pub const TABLE_NAMES: [&str; 8] = [
    "clients",
    "client_uid_index",
    "users",
    "user_email_index",
    "user_logins",
    "restaurants",
    "tables",
    "counters",
];

// =============================================================================
// Helpers
// =============================================================================

/// Treat a table that was never created as empty.
fn existing<T>(result: Result<T, TableError>) -> StorageResult<Option<T>> {
    match result {
        Ok(table) => Ok(Some(table)),
        Err(TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Allocate the next id of a sequence inside `txn`.
fn next_id(txn: &WriteTransaction, sequence: &str) -> StorageResult<i64> {
    let mut counters = txn.open_table(COUNTERS)?;
    let next = counters.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    counters.insert(sequence, next)?;
    Ok(next)
}

/// Fields of a user before it is assigned an id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub auth_type: UserType,
    pub role: UserRole,
}

/// Profile fields a user may change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Only applied to customers.
    pub phone: Option<String>,
}

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID database.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database file. Tables are not created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;
        Ok(Self { db })
    }

    /// Create any missing table and return the names of those created.
    /// Idempotent: a second call returns an empty list.
    pub fn ensure_tables(&self) -> StorageResult<Vec<String>> {
        let write_txn = self.db.begin_write()?;
        let present: HashSet<String> = write_txn
            .list_tables()?
            .map(|handle| handle.name().to_string())
            .collect();
        {
            let _ = write_txn.open_table(CLIENTS)?;
            let _ = write_txn.open_table(CLIENT_UID_INDEX)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAIL_INDEX)?;
            let _ = write_txn.open_table(USER_LOGINS)?;
            let _ = write_txn.open_table(RESTAURANTS)?;
            let _ = write_txn.open_table(TABLES)?;
            let _ = write_txn.open_table(COUNTERS)?;
        }
        write_txn.commit()?;
        Ok(TABLE_NAMES
            .iter()
            .filter(|name| !present.contains(**name))
            .map(|name| name.to_string())
            .collect())
    }

    /// Whether [`Database::ensure_tables`] has run.
    pub fn is_initialized(&self) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        Ok(existing(read_txn.open_table(CLIENTS))?.is_some())
    }

    // =========================================================================
    // Clients
    // =========================================================================

    /// Register a client application.
    pub fn create_client(
        &self,
        client_type: ClientType,
        name: &str,
        public_uid: &str,
        secret: &str,
    ) -> StorageResult<Client> {
        let write_txn = self.db.begin_write()?;
        let client = {
            let mut uid_index = write_txn.open_table(CLIENT_UID_INDEX)?;
            if uid_index.get(public_uid)?.is_some() {
                return Err(StorageError::Conflict(format!("client uid {public_uid}")));
            }

            let client = Client {
                client_id: next_id(&write_txn, "clients")?,
                public_uid: public_uid.to_string(),
                client_type,
                name: name.to_string(),
                secret: secret.to_string(),
                previous_secret: None,
                last_secret_rotation: None,
                access_revoked: None,
                created_at: Utc::now(),
            };
            let json = serde_json::to_vec(&client)?;
            write_txn
                .open_table(CLIENTS)?
                .insert(client.client_id, json.as_slice())?;
            uid_index.insert(public_uid, client.client_id)?;
            client
        };
        write_txn.commit()?;
        Ok(client)
    }

    /// Look up a client regardless of revocation.
    pub fn get_client(&self, client_id: i64) -> StorageResult<Option<Client>> {
        let read_txn = self.db.begin_read()?;
        let Some(table) = existing(read_txn.open_table(CLIENTS))? else {
            return Ok(None);
        };
        match table.get(client_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn find_active_client_by_public_uid(&self, public_uid: &str) -> StorageResult<Option<Client>> {
        let client_id = {
            let read_txn = self.db.begin_read()?;
            let Some(index) = existing(read_txn.open_table(CLIENT_UID_INDEX))? else {
                return Ok(None);
            };
            match index.get(public_uid)? {
                Some(id) => id.value(),
                None => return Ok(None),
            }
        };
        Ok(self.get_client(client_id)?.filter(Client::is_active))
    }

    pub fn list_clients(&self) -> StorageResult<Vec<Client>> {
        let read_txn = self.db.begin_read()?;
        let Some(table) = existing(read_txn.open_table(CLIENTS))? else {
            return Ok(Vec::new());
        };
        let mut clients = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            clients.push(decode(value.value())?);
        }
        Ok(clients)
    }

    /// Soft-revoke a client. Revoking twice keeps the first timestamp.
    pub fn revoke_client(&self, client_id: i64, at: DateTime<Utc>) -> StorageResult<Client> {
        self.update_client(client_id, |client| {
            client.access_revoked.get_or_insert(at);
        })
    }

    /// Replace the secret, keeping the old one as `previous_secret`.
    pub fn rotate_client_secret(
        &self,
        client_id: i64,
        new_secret: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<Client> {
        self.update_client(client_id, |client| {
            client.previous_secret = Some(std::mem::replace(&mut client.secret, new_secret.to_string()));
            client.last_secret_rotation = Some(at);
        })
    }

    fn update_client(&self, client_id: i64, apply: impl FnOnce(&mut Client)) -> StorageResult<Client> {
        let write_txn = self.db.begin_write()?;
        let client = {
            let mut table = write_txn.open_table(CLIENTS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(client_id)?
                    .ok_or_else(|| StorageError::NotFound(format!("client {client_id}")))?;
                existing.value().to_vec()
            };

            let mut client: Client = decode(&existing_bytes)?;
            apply(&mut client);
            let json = serde_json::to_vec(&client)?;
            table.insert(client_id, json.as_slice())?;
            client
        };
        write_txn.commit()?;
        Ok(client)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a user. Fails with [`StorageError::Conflict`] when the
    /// normalized email is taken, including by a revoked user.
    pub fn create_user(&self, new: NewUser) -> StorageResult<User> {
        let email_key = normalize_email(&new.email);
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut email_index = write_txn.open_table(USER_EMAIL_INDEX)?;
            if email_index.get(email_key.as_str())?.is_some() {
                return Err(StorageError::Conflict(format!("email {email_key}")));
            }

            let now = Utc::now();
            let user = User {
                user_id: next_id(&write_txn, "users")?,
                first_name: new.first_name,
                last_name: new.last_name,
                email: new.email,
                password_hash: new.password_hash,
                auth_type: new.auth_type,
                role: new.role,
                created_at: now,
                updated_at: now,
                access_revoked: None,
            };
            let json = serde_json::to_vec(&user)?;
            write_txn
                .open_table(USERS)?
                .insert(user.user_id, json.as_slice())?;
            email_index.insert(email_key.as_str(), user.user_id)?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// Look up a user regardless of revocation.
    pub fn get_user(&self, user_id: i64) -> StorageResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let Some(table) = existing(read_txn.open_table(USERS))? else {
            return Ok(None);
        };
        match table.get(user_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive lookup of an active user.
    pub fn find_active_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let email_key = normalize_email(email);
        let user_id = {
            let read_txn = self.db.begin_read()?;
            let Some(index) = existing(read_txn.open_table(USER_EMAIL_INDEX))? else {
                return Ok(None);
            };
            match index.get(email_key.as_str())? {
                Some(id) => id.value(),
                None => return Ok(None),
            }
        };
        Ok(self.get_user(user_id)?.filter(User::is_active))
    }

    /// Soft-revoke a user. Revoking twice keeps the first timestamp.
    pub fn revoke_user(&self, user_id: i64, at: DateTime<Utc>) -> StorageResult<User> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut table = write_txn.open_table(USERS)?;
            let existing_bytes = {
                let existing = table
                    .get(user_id)?
                    .ok_or_else(|| StorageError::NotFound(format!("user {user_id}")))?;
                existing.value().to_vec()
            };

            let mut user: User = decode(&existing_bytes)?;
            if user.access_revoked.is_none() {
                user.access_revoked = Some(at);
                user.updated_at = at;
            }
            let json = serde_json::to_vec(&user)?;
            table.insert(user_id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// Apply a profile update in one transaction.
    ///
    /// An email change moves the user's entry in the email index and fails
    /// with [`StorageError::Conflict`] when the new normalized address
    /// belongs to someone else.
    pub fn update_user(
        &self,
        user_id: i64,
        update: UserUpdate,
        at: DateTime<Utc>,
    ) -> StorageResult<User> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut table = write_txn.open_table(USERS)?;
            let existing_bytes = {
                let existing = table
                    .get(user_id)?
                    .ok_or_else(|| StorageError::NotFound(format!("user {user_id}")))?;
                existing.value().to_vec()
            };
            let mut user: User = decode(&existing_bytes)?;

            if let Some(email) = update.email {
                let old_key = normalize_email(&user.email);
                let new_key = normalize_email(&email);
                if new_key != old_key {
                    let mut email_index = write_txn.open_table(USER_EMAIL_INDEX)?;
                    if email_index.get(new_key.as_str())?.is_some() {
                        return Err(StorageError::Conflict(format!("email {new_key}")));
                    }
                    email_index.remove(old_key.as_str())?;
                    email_index.insert(new_key.as_str(), user_id)?;
                }
                user.email = email;
            }
            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                user.last_name = last_name;
            }
            if let (Some(phone), UserRole::Customer { phone: slot }) = (update.phone, &mut user.role) {
                *slot = Some(phone);
            }
            user.updated_at = at;

            let json = serde_json::to_vec(&user)?;
            table.insert(user_id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// Append a login history entry.
    pub fn record_login(
        &self,
        user_id: i64,
        client_id: i64,
        user_agent: &str,
        remote_addr: Option<String>,
    ) -> StorageResult<UserLogin> {
        let write_txn = self.db.begin_write()?;
        let login = {
            let login = UserLogin {
                login_id: next_id(&write_txn, "user_logins")?,
                user_id,
                client_id,
                user_agent: user_agent.to_string(),
                remote_addr,
                created_at: Utc::now(),
            };
            let json = serde_json::to_vec(&login)?;
            write_txn
                .open_table(USER_LOGINS)?
                .insert((login.user_id, login.login_id), json.as_slice())?;
            login
        };
        write_txn.commit()?;
        Ok(login)
    }

    /// Login history of one user, oldest first.
    pub fn list_logins_for_user(&self, user_id: i64) -> StorageResult<Vec<UserLogin>> {
        let read_txn = self.db.begin_read()?;
        let Some(table) = existing(read_txn.open_table(USER_LOGINS))? else {
            return Ok(Vec::new());
        };
        let mut logins = Vec::new();
        for entry in table.range((user_id, i64::MIN)..=(user_id, i64::MAX))? {
            let (_, value) = entry?;
            logins.push(decode(value.value())?);
        }
        Ok(logins)
    }

    // =========================================================================
    // Restaurants & Tables
    // =========================================================================

    pub fn create_restaurant(
        &self,
        owner_id: i64,
        request: &CreateRestaurantRequest,
    ) -> StorageResult<Restaurant> {
        let write_txn = self.db.begin_write()?;
        let restaurant = {
            let restaurant = Restaurant {
                restaurant_id: next_id(&write_txn, "restaurants")?,
                owner_id,
                name: request.name.clone(),
                address: request.address.clone(),
                phone: request.phone.clone(),
                email: request.email.clone(),
                website: request.website.clone(),
                number_of_tables: request.number_of_tables,
                created_at: Utc::now(),
            };
            let json = serde_json::to_vec(&restaurant)?;
            write_txn
                .open_table(RESTAURANTS)?
                .insert(restaurant.restaurant_id, json.as_slice())?;
            restaurant
        };
        write_txn.commit()?;
        Ok(restaurant)
    }

    pub fn get_restaurant(&self, restaurant_id: i64) -> StorageResult<Option<Restaurant>> {
        let read_txn = self.db.begin_read()?;
        let Some(table) = existing(read_txn.open_table(RESTAURANTS))? else {
            return Ok(None);
        };
        match table.get(restaurant_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_restaurants(&self) -> StorageResult<Vec<Restaurant>> {
        let read_txn = self.db.begin_read()?;
        let Some(table) = existing(read_txn.open_table(RESTAURANTS))? else {
            return Ok(Vec::new());
        };
        let mut restaurants = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            restaurants.push(decode(value.value())?);
        }
        Ok(restaurants)
    }

    /// Add a table to an existing restaurant.
    pub fn add_table(&self, restaurant_id: i64, request: &CreateTableRequest) -> StorageResult<Table> {
        let write_txn = self.db.begin_write()?;
        let table = {
            if write_txn.open_table(RESTAURANTS)?.get(restaurant_id)?.is_none() {
                return Err(StorageError::NotFound(format!("restaurant {restaurant_id}")));
            }

            let table = Table {
                table_id: next_id(&write_txn, "tables")?,
                restaurant_id,
                table_number: request.table_number,
                capacity: request.capacity,
                location_description: request.location_description.clone(),
            };
            let json = serde_json::to_vec(&table)?;
            write_txn
                .open_table(TABLES)?
                .insert((restaurant_id, table.table_id), json.as_slice())?;
            table
        };
        write_txn.commit()?;
        Ok(table)
    }

    pub fn list_tables(&self, restaurant_id: i64) -> StorageResult<Vec<Table>> {
        let read_txn = self.db.begin_read()?;
        let Some(table) = existing(read_txn.open_table(TABLES))? else {
            return Ok(Vec::new());
        };
        let mut tables = Vec::new();
        for entry in table.range((restaurant_id, i64::MIN)..=(restaurant_id, i64::MAX))? {
            let (_, value) = entry?;
            tables.push(decode(value.value())?);
        }
        Ok(tables)
    }
}

impl IdentityStore for Database {
    fn find_active_client_by_id(&self, client_id: i64) -> StorageResult<Option<Client>> {
        Ok(self.get_client(client_id)?.filter(Client::is_active))
    }

    fn find_active_user_by_id(&self, user_id: i64) -> StorageResult<Option<User>> {
        Ok(self.get_user(user_id)?.filter(User::is_active))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.redb")).unwrap();
        db.ensure_tables().unwrap();
        (db, dir)
    }

    fn new_user(email: &str, auth_type: UserType) -> NewUser {
        NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "hash".into(),
            auth_type,
            role: UserRole::default_for(auth_type),
        }
    }

    fn restaurant_request() -> CreateRestaurantRequest {
        CreateRestaurantRequest {
            name: "Grill House".into(),
            address: "123 Main St".into(),
            phone: "123-456-7890".into(),
            email: "contact@grillhouse.com".into(),
            website: None,
            number_of_tables: Some(12),
        }
    }

    #[test]
    fn lookups_before_init_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("fresh.redb")).unwrap();
        assert!(!db.is_initialized().unwrap());
        assert!(db.find_active_client_by_id(1).unwrap().is_none());
        assert!(db.find_active_user_by_id(1).unwrap().is_none());
        assert!(db.list_restaurants().unwrap().is_empty());
    }

    #[test]
    fn ensure_tables_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("fresh.redb")).unwrap();
        assert_eq!(db.ensure_tables().unwrap(), TABLE_NAMES.to_vec());
        assert!(db.is_initialized().unwrap());
        assert!(db.ensure_tables().unwrap().is_empty());
    }

    #[test]
    fn client_ids_are_sequential() {
        let (db, _dir) = temp_db();
        let a = db.create_client(ClientType::Web, "web", "uid-a", "secret-a").unwrap();
        let b = db.create_client(ClientType::Ios, "ios", "uid-b", "secret-b").unwrap();
        assert_eq!(a.client_id, 1);
        assert_eq!(b.client_id, 2);
        assert_eq!(db.list_clients().unwrap().len(), 2);
    }

    #[test]
    fn duplicate_public_uid_conflicts() {
        let (db, _dir) = temp_db();
        db.create_client(ClientType::Web, "web", "uid-a", "s1").unwrap();
        let err = db.create_client(ClientType::Ios, "ios", "uid-a", "s2").unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn revoked_client_is_not_active() {
        let (db, _dir) = temp_db();
        let client = db.create_client(ClientType::Web, "web", "uid-a", "s").unwrap();
        assert!(db.find_active_client_by_id(client.client_id).unwrap().is_some());

        let first = Utc::now();
        let revoked = db.revoke_client(client.client_id, first).unwrap();
        assert_eq!(revoked.access_revoked, Some(first));
        assert!(db.find_active_client_by_id(client.client_id).unwrap().is_none());
        assert!(db.find_active_client_by_public_uid("uid-a").unwrap().is_none());
        assert!(db.get_client(client.client_id).unwrap().is_some());

        let again = db
            .revoke_client(client.client_id, first + chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(again.access_revoked, Some(first));
    }

    #[test]
    fn revoke_missing_client_is_not_found() {
        let (db, _dir) = temp_db();
        assert!(matches!(
            db.revoke_client(99, Utc::now()),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn rotation_keeps_previous_secret() {
        let (db, _dir) = temp_db();
        let client = db.create_client(ClientType::Web, "web", "uid-a", "old").unwrap();
        let at = Utc::now();
        let rotated = db.rotate_client_secret(client.client_id, "new", at).unwrap();
        assert_eq!(rotated.secret, "new");
        assert_eq!(rotated.previous_secret.as_deref(), Some("old"));
        assert_eq!(rotated.last_secret_rotation, Some(at));
    }

    #[test]
    fn user_email_is_case_insensitive() {
        let (db, _dir) = temp_db();
        let user = db
            .create_user(new_user("Ada@Example.com", UserType::Customer))
            .unwrap();
        assert_eq!(user.email, "Ada@Example.com");

        let found = db.find_active_user_by_email("ada@EXAMPLE.com").unwrap().unwrap();
        assert_eq!(found.user_id, user.user_id);

        let err = db
            .create_user(new_user("ADA@example.COM", UserType::Staff))
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn revoked_user_is_hidden_but_kept() {
        let (db, _dir) = temp_db();
        let user = db.create_user(new_user("a@b.c", UserType::Admin)).unwrap();
        db.revoke_user(user.user_id, Utc::now()).unwrap();

        assert!(db.find_active_user_by_id(user.user_id).unwrap().is_none());
        assert!(db.find_active_user_by_email("a@b.c").unwrap().is_none());
        assert!(db.get_user(user.user_id).unwrap().is_some());
    }

    #[test]
    fn email_change_moves_the_index_entry() {
        let (db, _dir) = temp_db();
        let user = db.create_user(new_user("old@example.com", UserType::Customer)).unwrap();
        let at = Utc::now();

        let updated = db
            .update_user(
                user.user_id,
                UserUpdate {
                    email: Some("New@Example.com".into()),
                    last_name: Some("Byron".into()),
                    phone: Some("555-0199".into()),
                    ..UserUpdate::default()
                },
                at,
            )
            .unwrap();
        assert_eq!(updated.email, "New@Example.com");
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Byron");
        assert_eq!(updated.updated_at, at);
        assert_eq!(updated.role, UserRole::Customer { phone: Some("555-0199".into()) });

        assert!(db.find_active_user_by_email("old@example.com").unwrap().is_none());
        let found = db.find_active_user_by_email("new@example.com").unwrap().unwrap();
        assert_eq!(found, updated);

        // The freed address can be registered again.
        db.create_user(new_user("old@example.com", UserType::Customer)).unwrap();
    }

    #[test]
    fn email_change_to_a_taken_address_conflicts() {
        let (db, _dir) = temp_db();
        let ada = db.create_user(new_user("ada@example.com", UserType::Customer)).unwrap();
        db.create_user(new_user("grace@example.com", UserType::Staff)).unwrap();

        let err = db
            .update_user(
                ada.user_id,
                UserUpdate {
                    email: Some(" GRACE@example.com".into()),
                    first_name: Some("Changed".into()),
                    ..UserUpdate::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        // Nothing from the failed update was written.
        let unchanged = db.get_user(ada.user_id).unwrap().unwrap();
        assert_eq!(unchanged, ada);
        assert!(db.find_active_user_by_email("ada@example.com").unwrap().is_some());
    }

    #[test]
    fn case_only_email_change_keeps_the_index() {
        let (db, _dir) = temp_db();
        let ada = db.create_user(new_user("ada@example.com", UserType::Admin)).unwrap();
        let updated = db
            .update_user(
                ada.user_id,
                UserUpdate {
                    email: Some("ADA@example.com".into()),
                    phone: Some("ignored".into()),
                    ..UserUpdate::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(updated.email, "ADA@example.com");
        assert_eq!(updated.role, UserRole::User);
        assert!(db.find_active_user_by_email("ada@example.com").unwrap().is_some());
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let (db, _dir) = temp_db();
        let err = db.update_user(404, UserUpdate::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn logins_are_recorded_per_user() {
        let (db, _dir) = temp_db();
        db.record_login(1, 7, "web", Some("127.0.0.1".into())).unwrap();
        db.record_login(2, 7, "ios", None).unwrap();
        db.record_login(1, 8, "android", None).unwrap();

        let logins = db.list_logins_for_user(1).unwrap();
        assert_eq!(logins.len(), 2);
        assert_eq!(logins[0].client_id, 7);
        assert_eq!(logins[1].user_agent, "android");
    }

    #[test]
    fn tables_belong_to_their_restaurant() {
        let (db, _dir) = temp_db();
        let first = db.create_restaurant(1, &restaurant_request()).unwrap();
        let second = db.create_restaurant(1, &restaurant_request()).unwrap();

        let table = CreateTableRequest {
            table_number: 4,
            capacity: 6,
            location_description: Some("patio".into()),
        };
        db.add_table(first.restaurant_id, &table).unwrap();
        db.add_table(first.restaurant_id, &table).unwrap();
        db.add_table(second.restaurant_id, &table).unwrap();

        assert_eq!(db.list_tables(first.restaurant_id).unwrap().len(), 2);
        assert_eq!(db.list_tables(second.restaurant_id).unwrap().len(), 1);
        assert_eq!(db.list_restaurants().unwrap().len(), 2);
    }

    #[test]
    fn table_for_missing_restaurant_is_not_found() {
        let (db, _dir) = temp_db();
        let table = CreateTableRequest {
            table_number: 1,
            capacity: 2,
            location_description: None,
        };
        assert!(matches!(db.add_table(5, &table), Err(StorageError::NotFound(_))));
    }
}
