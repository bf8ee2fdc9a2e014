//! Wicket core - credential storage and the connection protocol
//!
//! This crate provides:
//! - The file-backed credential store (Argon2i hashes, linear-scan lookup)
//! - The per-connection protocol state machine
//! - Line framing for the byte-stream wire protocol
//!
//! Nothing here performs socket I/O. The server crate feeds raw bytes into
//! a [`Session`] and executes the [`Action`]s it returns.

pub mod error;
pub mod line;
pub mod session;
pub mod store;

pub use error::{Result, StoreError};
pub use line::LineBuffer;
pub use session::{Action, Phase, Session, SessionEvent};
pub use store::PasswdStore;

/// Length of the Argon2i digest stored per record
pub const HASH_LEN: usize = 32;

/// Length of the per-record salt
pub const SALT_LEN: usize = 16;

/// The fixed-length hash+salt block that follows each username line
pub const BLOCK_LEN: usize = HASH_LEN + SALT_LEN;
