//! Order history and the operator ledger.
//!
//! - [`HistoryLedger`] - the signed-in customer's recent orders, bounded
//! - [`AdminLedger`] - every order plus incrementally maintained
//!   [`AdminStats`], persisted under `adminData`
//! - [`OrderService`] - the backend operations that feed both

mod admin;
mod history;
mod service;

pub use admin::{AdminLedger, AdminStats};
pub use history::HistoryLedger;
pub use service::OrderService;
