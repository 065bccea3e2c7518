//! Application layer: command and query handlers wiring ports to the domain.

pub mod handlers;
