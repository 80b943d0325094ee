//! WASM host embedding for compiled Brainfuck modules.
//!
//! This crate provides the execution environment for guest modules, including:
//! - Host capability implementations (byte output, byte input)
//! - Linear memory provisioning and the post-run diagnostic snapshot
//! - An optional wall-clock deadline on the guest call
//!
//! The guest is opaque: the host never inspects its code beyond what
//! instantiation requires. One `GuestInstance` serves exactly one run.

pub mod bridge;
pub mod instance;
pub mod io;

pub use bridge::{HostBridge, END_OF_INPUT};
pub use instance::{GuestInstance, DIAG_PREFIX_LEN};
pub use io::{InputCursor, OutputSink};

use bfrun_core::{Error, Result};
use std::time::Duration;
use wasmtime::*;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Initial linear memory size in 64 KiB wasm pages
    pub initial_pages: u32,
    /// Wall-clock limit on the guest call. `None` means the call may block
    /// the host forever; that is the deliberate default.
    pub deadline: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_pages: 1,
            deadline: None,
        }
    }
}

/// The WASM runtime manager
pub struct Runtime {
    engine: Engine,
    config: RuntimeConfig,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let mut wasm_config = Config::new();
        // Epoch interruption carries a small per-loop cost, so it is only
        // enabled when a deadline is actually configured.
        wasm_config.epoch_interruption(config.deadline.is_some());

        let engine = Engine::new(&wasm_config)
            .map_err(|e| Error::Runtime(format!("Failed to create engine: {}", e)))?;

        Ok(Self { engine, config })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Create a new guest instance from WASM bytes
    pub fn instantiate(&self, wasm_bytes: &[u8], bridge: HostBridge) -> Result<GuestInstance> {
        GuestInstance::new(&self.engine, wasm_bytes, bridge, self.config.clone())
    }
}
