//! Network Module
//!
//! TCP server, client, and connection handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection (request-handling path)
//! - Store work runs on the service's dispatcher, not here

mod client;
mod connection;
mod server;

pub use client::Client;
pub use connection::Connection;
pub use server::Server;
