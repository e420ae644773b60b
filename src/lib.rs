// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Trailshare: live location sharing between connected users
//!
//! This crate provides the client-side core of the app: accounts and
//! profiles on Firebase, and the location-sharing session that publishes
//! this device's position, follows every other connected user and keeps
//! their travel trails for the map.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod platform;
pub mod routes;
pub mod services;
pub mod session;

use config::Config;
use platform::{BlobStore, IdentityProvider, UserStore};
use services::{AccountService, ProfileService, ReportedPosition};
use session::{SessionDeps, SessionHandle, SessionSettings};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub accounts: AccountService,
    pub profiles: ProfileService,
    pub positions: Arc<ReportedPosition>,
    pub session_deps: SessionDeps,
    pub session_settings: SessionSettings,
    /// Session of the map screen, if open
    pub session: Mutex<Option<SessionHandle>>,
}

impl AppState {
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn UserStore>,
        blobs: Arc<dyn BlobStore>,
        positions: Arc<ReportedPosition>,
    ) -> Self {
        let session_settings = SessionSettings::from_config(&config);
        Self {
            accounts: AccountService::new(identity.clone(), store.clone()),
            profiles: ProfileService::new(identity, store.clone(), blobs),
            session_deps: SessionDeps {
                store,
                positions: positions.clone(),
            },
            positions,
            session_settings,
            session: Mutex::new(None),
            config,
        }
    }
}
