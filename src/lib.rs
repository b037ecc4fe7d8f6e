// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Amoro planner: shared activity data layer for a couples' calendar.
//!
//! This crate fetches activities from the remote task store, normalizes
//! their inconsistent shapes, caches them per user and month, and keeps the
//! calendar, to-do, mood and notification views in sync through refresh
//! flags.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::ActivityService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub activities: ActivityService,
}
