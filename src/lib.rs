//! Storefront client core: a tag-invalidated resource cache over the shop
//! backend, with the signed-in session and cart persisted between runs.

pub mod api;
pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
pub mod session;
