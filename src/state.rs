// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use ring::rand::SystemRandom;

use crate::auth::password::{BcryptHasher, PasswordHasher};
use crate::auth::token::TokenCodec;
use crate::config::AppConfig;
use crate::storage::Database;

/// Process-wide, read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub codec: Arc<TokenCodec>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub rng: SystemRandom,
    /// Timezone attached to every request context.
    pub timezone: Arc<str>,
    pub client_secret_grace: chrono::Duration,
    pub setup_enabled: bool,
}

impl AppState {
    pub fn new(db: Database, codec: TokenCodec, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            db: Arc::new(db),
            codec: Arc::new(codec),
            hasher,
            rng: SystemRandom::new(),
            timezone: Arc::from("UTC"),
            client_secret_grace: chrono::Duration::days(1),
            setup_enabled: false,
        }
    }

    /// State built from the startup configuration.
    pub fn from_config(config: &AppConfig, db: Database, codec: TokenCodec) -> Self {
        let mut state = Self::new(db, codec, Arc::new(BcryptHasher::new(config.bcrypt_cost)));
        state.timezone = Arc::from(config.default_timezone.as_str());
        state.client_secret_grace = config.client_secret_grace;
        state.setup_enabled = config.setup_routes_enabled;
        state
    }
}
