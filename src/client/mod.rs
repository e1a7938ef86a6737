//! Client Facades
//!
//! [`Client`] blocks the calling thread; [`AsyncClient`] runs on tokio.
//! Both expose one method per server command and share the command layer,
//! so a value comes back with the same type from either client.
//!
//! ## Connection Discipline
//! - One connection per client, one command on the wire at a time
//! - A fatal error drops the connection; the next call opens a new one
//! - The failed call itself is never retried
//! - `close()` fails the running call, queued calls and later calls with
//!   `ConnectionClosed`

mod blocking;
mod async_client;

pub use blocking::Client;
pub use async_client::AsyncClient;
