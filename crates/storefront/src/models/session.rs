//! Session-related types.
//!
//! Types persisted in local storage for authentication state.

use serde::{Deserialize, Serialize};

use pizzeria_core::UserId;

/// Persisted user identity.
///
/// Minimal data kept under the `user` storage key to identify the signed-in
/// customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Whether the user may open the admin ledger.
    #[serde(default)]
    pub is_admin: bool,
}
