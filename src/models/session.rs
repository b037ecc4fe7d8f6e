//! Signed-in user identity.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Identity of the signed-in user and their partner linkage.
///
/// Every fetch and mutation is scoped by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/lib/generated/")
)]
pub struct Session {
    /// Owning user id (path segment of every task store call)
    pub user_id: String,
    /// Linked partner's user id, if the couple is paired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, partner_id: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            partner_id: partner_id.filter(|p| !p.is_empty()),
        }
    }

    pub fn is_paired(&self) -> bool {
        self.partner_id.is_some()
    }
}
