//! Result and report types for a run.

use serde::{Deserialize, Serialize};

/// The scalar value returned by the invoked entry point.
///
/// Advisory only: the host never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub value: i32,
}

/// Final report for one run: the entry point's return value, the guest's
/// emitted output, and the 16-byte diagnostic prefix of linear memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub value: i32,
    pub output: String,
    pub memory_prefix: Vec<u8>,
}

impl RunReport {
    pub fn new(result: ExecutionResult, output: &[u8], memory_prefix: &[u8]) -> Self {
        Self {
            value: result.value,
            output: String::from_utf8_lossy(output).into_owned(),
            memory_prefix: memory_prefix.to_vec(),
        }
    }
}
