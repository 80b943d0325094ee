//! Error types for the host embedding.
//!
//! Every failure is terminal for the run: nothing in this crate retries, and
//! callers are expected to surface the error rather than swallow it.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The artifact bytes are not a valid module, or the module's declared
    /// imports cannot be satisfied by the capability table. Raised before any
    /// guest code executes.
    #[error("load error: {0}")]
    Load(String),

    /// The requested export does not exist or is not invocable as a
    /// no-argument function returning a scalar. Raised after a successful
    /// load, before invocation.
    #[error("entry point not found: {0}")]
    EntryPoint(String),

    /// A mid-execution guest fault, propagated verbatim from the runtime.
    #[error("guest trap: {0}")]
    Trap(String),

    /// The configured wall-clock deadline elapsed while the guest was running.
    #[error("deadline of {0:?} exceeded")]
    Deadline(Duration),

    #[error("runtime error: {0}")]
    Runtime(String),
}
