//! Shopper-facing operations composed from the cache, session and cart.

pub mod error;
pub mod storefront;

pub use storefront::Storefront;
