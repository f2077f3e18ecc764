//! Shared utilities (file enumeration, ownership, MySQL configuration, audit log).

#[cfg(feature = "cli")]
pub mod audit;
pub mod fs;
pub mod mysql;
pub mod owner;
