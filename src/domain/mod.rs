//! Domain layer: value types for the cart, orders, payments and uploaded
//! assets, plus the ports the application layer talks through.

pub mod asset;
pub mod cart;
pub mod order;
pub mod payment;
pub mod ports;
pub mod records;
pub mod submission;
