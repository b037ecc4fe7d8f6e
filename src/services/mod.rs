// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod flags;
pub mod normalizer;
pub mod notification;
pub mod period_cache;
pub mod task_store;
pub mod views;

pub use activity::ActivityService;
pub use flags::{FileFlagStore, FlagStore, MemoryFlagStore, RefreshFlag, RefreshFlags};
pub use normalizer::{normalize, tag_emoji, NormalizeError};
pub use period_cache::{PeriodCache, PeriodState};
pub use task_store::{TaskStore, TaskStoreClient};
pub use views::View;
