//! Wicket server - multi-client authenticated TCP menu service
//!
//! This crate provides:
//! - The connection multiplexer (accept loop, allow-list admission,
//!   one task per connection)
//! - IP allow-list loading and matching
//! - The append-only audit log
//! - JSON configuration for the file paths the daemon uses

pub mod allowlist;
pub mod audit;
pub mod config;
pub mod error;
pub mod server;

pub use allowlist::AllowList;
pub use audit::{AuditEvent, AuditLog};
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use server::Server;
