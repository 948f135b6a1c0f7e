//! A Redis-compatible in-memory key/value server.
//!
//! This crate implements the core of a RESP-speaking server:
//!
//! - String operations with millisecond expiry (GET, SET, INCR, DEL)
//! - List operations including blocking pops (LPUSH, RPUSH, LPOP, BLPOP,
//!   LRANGE, LLEN)
//! - Append-only streams (XADD, XRANGE, XREAD with tail-follow blocking)
//! - Per-connection transactions (MULTI, EXEC, DISCARD)
//! - Primary/replica replication: handshake, synthetic full-resync snapshot
//!   and write-command propagation
//!
//! Clients are served concurrently, one Tokio task per connection.

pub mod commands;
pub mod connection;
pub mod input;
pub mod key_value_store;
pub mod rdb;
pub mod resp;
pub mod server;
pub mod state;
