//! Connections carrying one quasi-HTTP exchange each.
//!
//! A [`QuasiConnection`] wraps any duplex tokio stream supplied by a
//! transport. It exposes exactly two operations, reading and writing a
//! message, both raced against the [`ExchangeTimer`] of the exchange.
//!
//! # Components
//!
//! - [`QuasiConnection`]: stream, effective options, environment, deadline
//! - [`ConnectionWriter`] / [`ConnectionReader`]: the two directions, usable
//!   concurrently
//! - [`ExchangeTimer`]: deadline shared by every operation of the exchange

mod quasi_connection;
mod timer;

pub use quasi_connection::{ConnectionReader, ConnectionRole, ConnectionWriter, QuasiConnection};
pub use timer::ExchangeTimer;
