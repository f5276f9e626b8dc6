//! Domain types shared by the storefront crates.
//!
//! This crate is deliberately free of database and HTTP dependencies:
//! it holds ID/timestamp aliases, the domain error enum, slug derivation,
//! role constants, and the session cart value type.

pub mod cart;
pub mod error;
pub mod roles;
pub mod slug;
pub mod types;
