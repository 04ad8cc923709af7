//! Runs a guest instance to completion.
//!
//! This is the thin layer the crate's design notes describe as an external
//! collaborator of the core: once [`crate::add_to_linker`] has wired the
//! import table and the host has instantiated the guest, [`start`] and
//! [`initialize`] invoke the guest's conventional entry points and translate
//! the `proc_exit` control-flow signal into a plain `i32` exit code.

use wasmi::{Instance, Store};

use crate::{ctx::WasiCtx, error::WasiError};

fn require_memory_export<T>(store: &Store<T>, instance: &Instance) -> Result<(), WasiError> {
    instance
        .get_memory(store, "memory")
        .map(|_| ())
        .ok_or_else(|| WasiError::trap("guest module does not export linear memory named `memory`"))
}

/// Runs the guest's `_start` export (the command model) to completion.
///
/// Returns the process exit code: `0` if `_start` returns normally, or the
/// value passed to `proc_exit` if the guest called it. Any other trap
/// propagates as an error.
///
/// # Errors
///
/// - The guest does not export linear memory named `memory`.
/// - The guest does not export a zero-argument, zero-result `_start`
///   function.
/// - `start` or `initialize` was already called once on this `WasiCtx`.
/// - The guest traps for a reason other than `proc_exit`.
pub fn start<T>(
    store: &mut Store<T>,
    instance: Instance,
    get_cx: impl Fn(&mut T) -> &mut WasiCtx,
) -> Result<i32, WasiError> {
    {
        let ctx = get_cx(store.data_mut());
        if ctx.started || ctx.initialized {
            return Err(WasiError::trap(
                "start/initialize may each be called at most once, and are mutually exclusive",
            ));
        }
        ctx.started = true;
    }
    require_memory_export(store, &instance)?;
    let entry = instance
        .get_typed_func::<(), ()>(&*store, "_start")
        .map_err(|error| WasiError::trap(format!("guest does not export `_start`: {error}")))?;
    match entry.call(&mut *store, ()) {
        Ok(()) => Ok(0),
        Err(error) => match error.i32_exit_status() {
            Some(code) => Ok(code),
            None => Err(WasiError::trap(error.to_string())),
        },
    }
}

/// Runs the guest's `_initialize` export (the reactor model) once.
///
/// Unlike [`start`], `_initialize` is expected to return normally; a
/// `proc_exit` call during initialization still propagates as a trap rather
/// than being converted to an exit code, since a reactor has no exit code.
///
/// # Errors
///
/// Same conditions as [`start`], substituting `_initialize` for `_start`.
pub fn initialize<T>(
    store: &mut Store<T>,
    instance: Instance,
    get_cx: impl Fn(&mut T) -> &mut WasiCtx,
) -> Result<(), WasiError> {
    {
        let ctx = get_cx(store.data_mut());
        if ctx.started || ctx.initialized {
            return Err(WasiError::trap(
                "start/initialize may each be called at most once, and are mutually exclusive",
            ));
        }
        ctx.initialized = true;
    }
    require_memory_export(store, &instance)?;
    let entry = instance
        .get_typed_func::<(), ()>(&*store, "_initialize")
        .map_err(|error| WasiError::trap(format!("guest does not export `_initialize`: {error}")))?;
    entry
        .call(&mut *store, ())
        .map_err(|error| WasiError::trap(error.to_string()))
}
