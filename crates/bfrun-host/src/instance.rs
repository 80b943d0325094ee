//! Guest instance management: loading, invocation, and the diagnostic
//! memory snapshot.

use crate::bridge::HostBridge;
use crate::RuntimeConfig;
use bfrun_core::{Error, ExecutionResult, Result};
use wasmtime::*;

/// Length of the linear-memory prefix reported after a run.
pub const DIAG_PREFIX_LEN: usize = 16;

/// A loaded guest module bound to its capability table.
///
/// Owns the store, the instance, and the linear memory it provisioned for the
/// guest. One instance serves exactly one load-invoke-report cycle; the input
/// cursor is never reset, so a second `run` would observe the first run's
/// leftover state.
pub struct GuestInstance {
    store: Store<HostBridge>,
    instance: Instance,
    memory: Memory,
    config: RuntimeConfig,
}

impl std::fmt::Debug for GuestInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestInstance")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GuestInstance {
    /// Compile and instantiate `wasm_bytes` against the capability table:
    /// `env.putch`, `env.getch`, and a host-created `env.memory` of
    /// `config.initial_pages` zero-initialized pages.
    ///
    /// Fails with [`Error::Load`] when the bytes are not a valid module or
    /// the module's declared imports are not fully satisfiable. Load failures
    /// are fatal to the run; nothing is retried.
    pub fn new(
        engine: &Engine,
        wasm_bytes: &[u8],
        bridge: HostBridge,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let module = Module::new(engine, wasm_bytes)
            .map_err(|e| Error::Load(format!("Failed to compile module: {}", e)))?;

        let mut linker = Linker::new(engine);
        HostBridge::add_to_linker(&mut linker)
            .map_err(|e| Error::Load(format!("Failed to add capability imports: {}", e)))?;

        let mut store = Store::new(engine, bridge);
        if config.deadline.is_some() {
            // Trap at the first epoch tick; the timer thread in `run` bumps
            // the epoch once the deadline elapses.
            store.set_epoch_deadline(1);
        }

        let memory = Memory::new(&mut store, MemoryType::new(config.initial_pages, None))
            .map_err(|e| Error::Load(format!("Failed to create linear memory: {}", e)))?;
        linker
            .define(&mut store, "env", "memory", memory)
            .map_err(|e| Error::Load(format!("Failed to define memory import: {}", e)))?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| Error::Load(format!("Failed to instantiate: {}", e)))?;

        tracing::debug!(
            module_bytes = wasm_bytes.len(),
            initial_pages = config.initial_pages,
            "guest module instantiated"
        );

        Ok(Self {
            store,
            instance,
            memory,
            config,
        })
    }

    /// Look up the named export and invoke it with no arguments, blocking
    /// until the guest returns.
    ///
    /// Fails with [`Error::EntryPoint`] when the export is missing or not
    /// invocable as `() -> i32`. Without a configured deadline the call may
    /// block forever; with one, an overrunning guest traps and surfaces as
    /// [`Error::Deadline`]. Any other mid-execution fault propagates as
    /// [`Error::Trap`].
    pub fn run(&mut self, entry_point: &str) -> Result<ExecutionResult> {
        let entry = self
            .instance
            .get_typed_func::<(), i32>(&mut self.store, entry_point)
            .map_err(|e| Error::EntryPoint(format!("{}: {}", entry_point, e)))?;

        // The timer only bumps the engine's epoch counter, so it is harmless
        // if it fires after the guest has already returned.
        let _timer = self.config.deadline.map(|deadline| {
            let engine = self.store.engine().clone();
            std::thread::spawn(move || {
                std::thread::sleep(deadline);
                engine.increment_epoch();
            })
        });

        let value = entry.call(&mut self.store, ()).map_err(|e| {
            if let Some(trap) = e.downcast_ref::<Trap>() {
                if matches!(trap, Trap::Interrupt) {
                    return Error::Deadline(self.config.deadline.unwrap_or_default());
                }
            }
            Error::Trap(format!("{}", e))
        })?;

        tracing::debug!(
            value,
            emitted = self.store.data().sink.len(),
            consumed = self.store.data().cursor.position(),
            "entry point returned"
        );

        Ok(ExecutionResult { value })
    }

    /// Non-destructive snapshot of the first [`DIAG_PREFIX_LEN`] bytes of
    /// linear memory. Memory starts at one page and never shrinks, so the
    /// prefix is always addressable regardless of guest-initiated growth.
    pub fn memory_prefix(&self) -> [u8; DIAG_PREFIX_LEN] {
        let mut prefix = [0u8; DIAG_PREFIX_LEN];
        prefix.copy_from_slice(&self.memory.data(&self.store)[..DIAG_PREFIX_LEN]);
        prefix
    }

    /// Bytes the guest emitted through `env.putch`, in call order.
    pub fn output(&self) -> &[u8] {
        self.store.data().sink.bytes()
    }

    /// Get reference to the capability bridge
    pub fn bridge(&self) -> &HostBridge {
        self.store.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{InputCursor, OutputSink};
    use crate::Runtime;
    use std::time::Duration;

    // Emits "Hi" and returns 0. Declares getch without calling it.
    const HI_GUEST: &str = r#"
        (module
          (import "env" "memory" (memory 1))
          (import "env" "putch" (func $putch (param i32)))
          (import "env" "getch" (func $getch (result i32)))
          (func (export "main") (result i32)
            (call $putch (i32.const 72))
            (call $putch (i32.const 105))
            (i32.const 0)))
    "#;

    // Copies three input bytes to the output, then returns 0.
    const ECHO3_GUEST: &str = r#"
        (module
          (import "env" "memory" (memory 1))
          (import "env" "putch" (func $putch (param i32)))
          (import "env" "getch" (func $getch (result i32)))
          (func (export "main") (result i32)
            (call $putch (call $getch))
            (call $putch (call $getch))
            (call $putch (call $getch))
            (i32.const 0)))
    "#;

    // Returns the sum of two reads. With empty input both reads hit the
    // end-of-input sentinel, so the result is -2.
    const READ_PAST_END_GUEST: &str = r#"
        (module
          (import "env" "memory" (memory 1))
          (import "env" "getch" (func $getch (result i32)))
          (func (export "main") (result i32)
            (i32.add (call $getch) (call $getch))))
    "#;

    // Stores 1, 2, 3 at cells 0..3 and returns 3 as the final pointer.
    const STORE_GUEST: &str = r#"
        (module
          (import "env" "memory" (memory 1))
          (func (export "main") (result i32)
            (i32.store8 (i32.const 0) (i32.const 1))
            (i32.store8 (i32.const 1) (i32.const 2))
            (i32.store8 (i32.const 2) (i32.const 3))
            (i32.const 3)))
    "#;

    // Grows memory by one page and returns the old size in pages.
    const GROW_GUEST: &str = r#"
        (module
          (import "env" "memory" (memory 1))
          (func (export "main") (result i32)
            (memory.grow (i32.const 1))))
    "#;

    // Spins forever; only terminates via the epoch deadline.
    const LOOP_GUEST: &str = r#"
        (module
          (import "env" "memory" (memory 1))
          (func (export "main") (result i32)
            (loop $spin (br $spin))
            (i32.const 0)))
    "#;

    // Exports a global alongside main, to probe non-invocable exports.
    const GLOBAL_EXPORT_GUEST: &str = r#"
        (module
          (import "env" "memory" (memory 1))
          (global (export "flag") i32 (i32.const 1))
          (func (export "main") (result i32) (i32.const 0)))
    "#;

    // Declares an import no capability table satisfies.
    const UNSATISFIABLE_GUEST: &str = r#"
        (module
          (import "env" "memory" (memory 1))
          (import "env" "nosuch" (func $nosuch (result i32)))
          (func (export "main") (result i32) (call $nosuch)))
    "#;

    fn compile(wat_source: &str) -> Vec<u8> {
        wat::parse_str(wat_source).unwrap()
    }

    fn run_guest(wat_source: &str, input: &[u8]) -> (ExecutionResult, Vec<u8>, [u8; 16], usize) {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let bridge = HostBridge::new(InputCursor::new(input.to_vec()), OutputSink::buffered());
        let mut instance = runtime.instantiate(&compile(wat_source), bridge).unwrap();
        let result = instance.run("main").unwrap();
        let output = instance.output().to_vec();
        let prefix = instance.memory_prefix();
        let consumed = instance.bridge().cursor.position();
        (result, output, prefix, consumed)
    }

    #[test]
    fn test_hi_scenario() {
        let (result, output, _, _) = run_guest(HI_GUEST, b"");
        assert_eq!(output, b"Hi");
        assert_eq!(result.value, 0);
    }

    #[test]
    fn test_input_fidelity() {
        let (_, output, _, consumed) = run_guest(ECHO3_GUEST, b"abc");
        assert_eq!(output, b"abc");
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_read_past_end_returns_sentinel_every_time() {
        let (result, _, _, consumed) = run_guest(READ_PAST_END_GUEST, b"");
        assert_eq!(result.value, -2);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_sentinel_after_partial_consumption() {
        // One real byte then one exhausted read: 65 + (-1).
        let (result, _, _, consumed) = run_guest(READ_PAST_END_GUEST, b"A");
        assert_eq!(result.value, 65 - 1);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_memory_prefix_reflects_guest_writes() {
        let (result, _, prefix, _) = run_guest(STORE_GUEST, b"");
        assert_eq!(result.value, 3);
        assert_eq!(&prefix[..3], &[1, 2, 3]);
        assert_eq!(&prefix[3..], &[0u8; 13]);
    }

    #[test]
    fn test_memory_prefix_is_sixteen_bytes_after_growth() {
        let (result, _, prefix, _) = run_guest(GROW_GUEST, b"");
        assert_eq!(result.value, 1);
        assert_eq!(prefix.len(), DIAG_PREFIX_LEN);
        assert_eq!(prefix, [0u8; 16]);
    }

    #[test]
    fn test_unread_input_does_not_affect_run() {
        let (with_input, output_a, prefix_a, consumed) = run_guest(HI_GUEST, b"ignored");
        let (without_input, output_b, prefix_b, _) = run_guest(HI_GUEST, b"");
        assert_eq!(consumed, 0);
        assert_eq!(with_input.value, without_input.value);
        assert_eq!(output_a, output_b);
        assert_eq!(prefix_a, prefix_b);
    }

    #[test]
    fn test_determinism_across_independent_runs() {
        let first = run_guest(ECHO3_GUEST, b"xyz");
        let second = run_guest(ECHO3_GUEST, b"xyz");
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_entry_point() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let bridge = HostBridge::new(InputCursor::new(Vec::new()), OutputSink::buffered());
        let mut instance = runtime.instantiate(&compile(HI_GUEST), bridge).unwrap();
        let err = instance.run("not_there").unwrap_err();
        assert!(matches!(err, Error::EntryPoint(_)));
    }

    #[test]
    fn test_non_invocable_export() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let bridge = HostBridge::new(InputCursor::new(Vec::new()), OutputSink::buffered());
        let mut instance = runtime
            .instantiate(&compile(GLOBAL_EXPORT_GUEST), bridge)
            .unwrap();
        let err = instance.run("flag").unwrap_err();
        assert!(matches!(err, Error::EntryPoint(_)));
    }

    #[test]
    fn test_malformed_artifact() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let bridge = HostBridge::new(InputCursor::new(Vec::new()), OutputSink::buffered());
        let err = runtime.instantiate(b"not a module", bridge).unwrap_err();
        assert!(matches!(err, Error::Load(_)));
    }

    #[test]
    fn test_unsatisfiable_import() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let bridge = HostBridge::new(InputCursor::new(Vec::new()), OutputSink::buffered());
        let err = runtime
            .instantiate(&compile(UNSATISFIABLE_GUEST), bridge)
            .unwrap_err();
        assert!(matches!(err, Error::Load(_)));
    }

    #[test]
    fn test_deadline_interrupts_non_terminating_guest() {
        let runtime = Runtime::new(RuntimeConfig {
            initial_pages: 1,
            deadline: Some(Duration::from_millis(50)),
        })
        .unwrap();
        let bridge = HostBridge::new(InputCursor::new(Vec::new()), OutputSink::buffered());
        let mut instance = runtime.instantiate(&compile(LOOP_GUEST), bridge).unwrap();
        let err = instance.run("main").unwrap_err();
        assert!(matches!(err, Error::Deadline(_)));
    }

    #[test]
    fn test_deadline_does_not_affect_terminating_guest() {
        let runtime = Runtime::new(RuntimeConfig {
            initial_pages: 1,
            deadline: Some(Duration::from_secs(5)),
        })
        .unwrap();
        let bridge = HostBridge::new(InputCursor::new(Vec::new()), OutputSink::buffered());
        let mut instance = runtime.instantiate(&compile(HI_GUEST), bridge).unwrap();
        let result = instance.run("main").unwrap();
        assert_eq!(result.value, 0);
        assert_eq!(instance.output(), b"Hi");
    }
}
