//! # ssdbkv
//!
//! A client for key-value servers speaking the SSDB block protocol, with:
//! - Binary-safe block codec shared by requests and responses
//! - Blocking and tokio-based clients over a single connection
//! - Typed key-value, hash, sorted set and queue commands
//! - Strict request/response ordering, including under cancellation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Client / AsyncClient (facades)                 │
//! │         one method per command, calls serialized            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Request<T>
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Command Layer                            │
//! │        argument lists in, typed results out                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command / Response
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Connection  │─────────▶│    Codec    │
//!   │ (TCP + buf) │          │  (blocks)   │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use ssdbkv::Client;
//!
//! # fn main() -> ssdbkv::Result<()> {
//! let client = Client::connect("127.0.0.1", 8888)?;
//! client.set("greeting", "hello")?;
//! assert_eq!(client.get("greeting")?.as_deref(), Some(&b"hello"[..]));
//! client.zset("scores", "alice", 123)?;
//! assert_eq!(client.zget("scores", "alice")?, Some(123));
//! client.close();
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod command;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SsdbError};
pub use config::{Config, ConfigBuilder};
pub use protocol::{Arg, Command, Response, Status};
pub use client::{AsyncClient, Client};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ssdbkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
