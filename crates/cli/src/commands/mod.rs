//! CLI command implementations.

pub mod admin;
pub mod favorites;
pub mod menu;
pub mod orders;
