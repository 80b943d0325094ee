//! Run configuration.

use serde::{Deserialize, Serialize};

/// Parameters for a single load-invoke-report cycle.
///
/// State never persists across runs; a fresh `RunConfig` describes each one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Name of the exported entry point to invoke
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Input bytes served to the guest, one byte per read
    #[serde(default)]
    pub input: Vec<u8>,
    /// Wall-clock limit on the guest call, in milliseconds.
    ///
    /// `None` means the call may block the host forever. That is the
    /// deliberate default, not an accident of the implementation.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    /// Initial linear memory size in 64 KiB wasm pages
    #[serde(default = "default_initial_pages")]
    pub initial_pages: u32,
}

fn default_entry_point() -> String {
    "main".to_string()
}

fn default_initial_pages() -> u32 {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            entry_point: default_entry_point(),
            input: Vec::new(),
            deadline_ms: None,
            initial_pages: default_initial_pages(),
        }
    }
}
