//! Payment verification and subscription lifecycle service for the Wise
//! Guide bot.
//!
//! Receives Robokassa-style result notifications, verifies their MD5
//! signatures, records payments in an idempotent ledger, extends
//! subscriptions additively, and answers entitlement queries for the bot.
//!
//! The crate follows a hexagonal layout:
//! - [`domain`] holds the value objects, entities, and pure rules
//! - [`ports`] are the async trait boundaries
//! - [`application`] wires ports and domain into command handlers
//! - [`adapters`] provide SQLite, Telegram, and HTTP implementations
//! - [`config`] loads environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
