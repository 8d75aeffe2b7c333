//! WebSockets load generator for Rust!
//!
//! Simulates a fleet of independent clients against a WebSockets server. Every client
//! opens its own connection, sends batches of JSON messages at a fixed pace and,
//! at the same time, counts the replies coming back, until it has received every
//! reply it expects, the server closes the connection, or the run is interrupted.
//!
//! It's an async library based on tokio runtime, which carries its own client side
//! implementation of the [WebSocket Protocol RFC](https://datatracker.ietf.org/doc/html/rfc6455):
//! handshake, masked frames, fragmentation and the close handshake.
//!
pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod fleet;
pub mod frame;
pub mod handshake;
pub mod message;
mod read;
mod request;
pub mod session;
pub mod split;
mod write;
