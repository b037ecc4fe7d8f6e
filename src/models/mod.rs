// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod period;
pub mod raw;
pub mod session;

pub use activity::{Activity, ActivityType, Mood, NewActivity, ReviewInput};
pub use period::Period;
pub use raw::{RawActivity, TaskStoreResponse};
pub use session::Session;
