use crate::error::WasiError;

/// `proc_exit`: never returns normally; the caller (the generated linker
/// trampoline) turns this into the engine's typed exit mechanism.
pub(crate) fn proc_exit(code: i32) -> WasiError {
    WasiError::ProcessExit(code)
}

/// `proc_raise`: signals are not modeled; always succeeds.
pub(crate) fn proc_raise(_signal: i32) {}
