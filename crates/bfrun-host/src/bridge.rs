//! Host capability implementations for the guest ABI.

use crate::io::{InputCursor, OutputSink};
use wasmtime::*;

/// Sentinel returned by `env.getch` once the input is exhausted.
///
/// Out of byte range, so a guest can distinguish it from any real input
/// byte. Returned on every call after the cursor has consumed the whole
/// input.
pub const END_OF_INPUT: i32 = -1;

/// Capabilities provided to guest WASM modules.
///
/// Lives as store data so the guest-callable closures reach it through the
/// `Caller` rather than through ambient state. Exactly two functions cross
/// the boundary, and the guest may interleave them freely:
///
/// - `env.putch(code: i32)`: appends the low byte of `code` to the output
///   sink. Always succeeds; no range validation is performed, so values
///   outside the printable range pass through verbatim.
/// - `env.getch() -> i32`: returns the byte at the input cursor's position
///   and advances it by one, or [`END_OF_INPUT`] once exhausted.
#[derive(Debug)]
pub struct HostBridge {
    pub cursor: InputCursor,
    pub sink: OutputSink,
}

impl HostBridge {
    pub fn new(cursor: InputCursor, sink: OutputSink) -> Self {
        Self { cursor, sink }
    }

    /// Add the capability imports to a linker
    pub fn add_to_linker(linker: &mut Linker<Self>) -> Result<(), anyhow::Error> {
        // putch: (code: i32) -> void
        linker.func_wrap("env", "putch", |mut caller: Caller<'_, Self>, code: i32| {
            caller.data_mut().sink.append(code as u8);
        })?;

        // getch: () -> i32
        linker.func_wrap("env", "getch", |mut caller: Caller<'_, Self>| -> i32 {
            match caller.data_mut().cursor.read() {
                Some(byte) => i32::from(byte),
                None => END_OF_INPUT,
            }
        })?;

        Ok(())
    }
}
