//! Core types for the Kisan Mitra chat client
//!
//! Sessions, the conversation view, markdown fragments and the reveal
//! scheduler, plus the shared error, config and logging setup used by the
//! gateway, chat engine and CLI crates.

pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod logging;
pub mod prompts;
pub mod render;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
