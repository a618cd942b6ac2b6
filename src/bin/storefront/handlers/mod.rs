pub mod cart;
pub mod orders;
pub mod products;
pub mod profile;
pub mod session;
pub mod users;
