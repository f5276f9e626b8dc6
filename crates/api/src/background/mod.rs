//! Background maintenance tasks: stale-checkout release and cart TTL
//! pruning. Both run as interval loops until their cancellation token
//! fires during graceful shutdown.

pub mod cart_expiry;
pub mod checkout_expiry;
