//! Core types shared between the bfrun host embedding and its front ends.

pub mod config;
pub mod error;
pub mod types;

pub use config::RunConfig;
pub use error::{Error, Result};
pub use types::*;
