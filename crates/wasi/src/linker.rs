//! Wires a [`WasiCtx`]'s selected features into a [`wasmi::Linker`].
//!
//! This is the only module in the crate that depends directly on `wasmi`'s
//! linker API; every handler it calls into ([`crate::providers`],
//! [`crate::fs`]) is plain Rust operating on a `&mut [u8]` borrowed from the
//! guest's `memory` export, re-acquired on every call since the guest may
//! grow memory in between (see the crate's design notes).

use wasmi::{Caller, Extern, Linker};

use crate::{
    error::WasiError,
    memory::{self, RawIoVec},
    providers::{args, clock, environ, proc, random},
    types::Errno,
    WasiCtx,
};

fn guest_memory<'a, T>(caller: &'a mut Caller<'_, T>) -> Result<&'a mut [u8], WasiError> {
    let memory = caller
        .get_export("memory")
        .and_then(Extern::into_memory)
        .ok_or_else(|| WasiError::trap("guest module does not export linear memory named `memory`"))?;
    Ok(memory.data_mut(caller))
}

fn errno_result(result: Result<(), Errno>) -> i32 {
    match result {
        Ok(()) => Errno::Success.code() as i32,
        Err(errno) => errno.code() as i32,
    }
}

/// Adds the `wasi_snapshot_preview1` import namespace to `linker`, using
/// `wasi.features()` to decide which names get a real implementation and
/// filling the rest with `ENOSYS` stubs.
///
/// `get_cx` extracts the [`WasiCtx`] from the store's data type `T`; it is
/// invoked on every host call, not just once, because the store (and thus
/// `T`) only exists once `wasmi::Store::new` has run.
pub fn add_wasi_snapshot_preview1_to_linker<T>(
    linker: &mut Linker<T>,
    wasi: &WasiCtx,
    get_cx: impl Fn(&mut T) -> &mut WasiCtx + Send + Sync + Copy + 'static,
) -> Result<(), WasiError>
where
    T: 'static,
{
    let features = wasi.features;
    let tracing = features.tracing;

    macro_rules! register {
        ($name:literal, $body:expr) => {
            linker
                .func_wrap("wasi_snapshot_preview1", $name, $body)
                .map_err(|error| WasiError::trap(error.to_string()))?;
        };
    }

    macro_rules! enosys_stub {
        ($name:literal, ($($ty:ty),*)) => {
            register!($name, move |_: Caller<'_, T>, $(_: $ty),*| -> i32 {
                if tracing {
                    tracing::trace!(name = $name, "ENOSYS (feature not selected)");
                }
                Errno::Nosys.code() as i32
            });
        };
    }

    if features.args {
        register!("args_get", move |mut caller: Caller<'_, T>, argv: i32, argv_buf: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let ctx_args = ctx as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            // SAFETY: `ctx_args` and `mem` borrow disjoint parts of the store
            // data / guest memory for the duration of this call.
            let ctx_ref = unsafe { &*ctx_args };
            let result = args::args_get(ctx_ref, mem, argv as u32, argv_buf as u32);
            if tracing {
                tracing::trace!(name = "args_get", argv, argv_buf, ?result);
            }
            errno_result(result)
        });
        register!("args_sizes_get", move |mut caller: Caller<'_, T>, argc: i32, argv_buf_size: i32| -> i32 {
            let ctx = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx };
            errno_result(args::args_sizes_get(ctx_ref, mem, argc as u32, argv_buf_size as u32))
        });
    } else {
        enosys_stub!("args_get", (i32, i32));
        enosys_stub!("args_sizes_get", (i32, i32));
    }

    if features.environ {
        register!("environ_get", move |mut caller: Caller<'_, T>, environ: i32, environ_buf: i32| -> i32 {
            let ctx = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx };
            errno_result(environ::environ_get(ctx_ref, mem, environ as u32, environ_buf as u32))
        });
        register!("environ_sizes_get", move |mut caller: Caller<'_, T>, environc: i32, environ_buf_size: i32| -> i32 {
            let ctx = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx };
            errno_result(environ::environ_sizes_get(ctx_ref, mem, environc as u32, environ_buf_size as u32))
        });
    } else {
        enosys_stub!("environ_get", (i32, i32));
        enosys_stub!("environ_sizes_get", (i32, i32));
    }

    if features.clock {
        register!("clock_res_get", move |mut caller: Caller<'_, T>, clock_id: i32, out: i32| -> i32 {
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            errno_result(clock::clock_res_get(mem, clock_id as u32, out as u32))
        });
        register!("clock_time_get", move |mut caller: Caller<'_, T>, clock_id: i32, precision: i64, out: i32| -> i32 {
            let ctx = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx };
            errno_result(clock::clock_time_get(ctx_ref, mem, clock_id as u32, precision as u64, out as u32))
        });
    } else {
        enosys_stub!("clock_res_get", (i32, i32));
        enosys_stub!("clock_time_get", (i32, i64, i32));
    }

    if features.proc {
        register!("proc_exit", move |_: Caller<'_, T>, code: i32| -> Result<(), wasmi::Error> {
            Err(wasmi::Error::i32_exit(proc::proc_exit(code).i32_exit_status().unwrap_or(code)))
        });
        register!("proc_raise", move |_: Caller<'_, T>, signal: i32| -> i32 {
            proc::proc_raise(signal);
            Errno::Success.code() as i32
        });
    } else {
        // `proc_exit` is declared `(@witx noreturn)` in preview1: it has no
        // result to carry an ENOSYS back through, unlike every other import
        // here. A guest linked against libc still expects this exact arity,
        // so the stub keeps it and traps instead of returning.
        register!("proc_exit", move |_: Caller<'_, T>, _code: i32| -> Result<(), wasmi::Error> {
            if tracing {
                tracing::trace!(name = "proc_exit", "ENOSYS (feature not selected)");
            }
            Err(wasmi::Error::new(
                "wasi_snapshot_preview1::proc_exit called but the `proc` feature was not selected",
            ))
        });
        enosys_stub!("proc_raise", (i32));
    }

    if features.random {
        register!("random_get", move |mut caller: Caller<'_, T>, buf: i32, len: i32| -> i32 {
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx = get_cx(caller.data_mut());
            // SAFETY: `mem_ptr` was derived from the same call's guest memory
            // borrow and is not aliased elsewhere during this call.
            let mem = unsafe { &mut *mem_ptr };
            errno_result(random::random_get(ctx, mem, buf as u32, len as u32))
        });
    } else {
        enosys_stub!("random_get", (i32, i32));
    }

    if features.stdio || features.fs {
        register!("fd_write", move |mut caller: Caller<'_, T>, fd: i32, iovs: i32, iovs_len: i32, nwritten: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let mem = unsafe { &mut *mem_ptr };
            let iovecs = match memory::read_iovecs(mem, iovs as u32, iovs_len as u32) {
                Ok(v) => v,
                Err(e) => return e.code() as i32,
            };
            errno_result(ctx.fs.fd_write(mem, fd as u32, &iovecs, nwritten as u32))
        });
        register!("fd_read", move |mut caller: Caller<'_, T>, fd: i32, iovs: i32, iovs_len: i32, nread: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let mem = unsafe { &mut *mem_ptr };
            let iovecs = match memory::read_iovecs(mem, iovs as u32, iovs_len as u32) {
                Ok(v) => v,
                Err(e) => return e.code() as i32,
            };
            errno_result(ctx.fs.fd_read(mem, fd as u32, &iovecs, nread as u32))
        });
        register!("fd_close", move |mut caller: Caller<'_, T>, fd: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            errno_result(ctx.fs.fd_close(fd as u32))
        });
        register!("fd_fdstat_get", move |mut caller: Caller<'_, T>, fd: i32, stat: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let ctx_ptr = ctx as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx_ptr };
            errno_result(ctx_ref.fs.fd_fdstat_get(mem, fd as u32, stat as u32))
        });
    } else {
        enosys_stub!("fd_write", (i32, i32, i32, i32));
        enosys_stub!("fd_read", (i32, i32, i32, i32));
        enosys_stub!("fd_close", (i32));
        enosys_stub!("fd_fdstat_get", (i32, i32));
    }

    if features.fs {
        register!("fd_filestat_get", move |mut caller: Caller<'_, T>, fd: i32, stat: i32| -> i32 {
            let ctx_ptr = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx_ptr };
            errno_result(ctx_ref.fs.fd_filestat_get(mem, fd as u32, stat as u32))
        });
        register!("fd_prestat_get", move |mut caller: Caller<'_, T>, fd: i32, prestat: i32| -> i32 {
            let ctx_ptr = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx_ptr };
            errno_result(ctx_ref.fs.fd_prestat_get(mem, fd as u32, prestat as u32))
        });
        register!("fd_prestat_dir_name", move |mut caller: Caller<'_, T>, fd: i32, buf: i32, buf_len: i32| -> i32 {
            let ctx_ptr = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx_ptr };
            errno_result(ctx_ref.fs.fd_prestat_dir_name(mem, fd as u32, buf as u32, buf_len as u32))
        });
        register!("fd_seek", move |mut caller: Caller<'_, T>, fd: i32, offset: i64, whence: i32, new_offset: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let mem = unsafe { &mut *mem_ptr };
            errno_result(ctx.fs.fd_seek(mem, fd as u32, offset, whence as u8, new_offset as u32))
        });
        register!("fd_tell", move |mut caller: Caller<'_, T>, fd: i32, out: i32| -> i32 {
            let ctx_ptr = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx_ptr };
            errno_result(ctx_ref.fs.fd_tell(mem, fd as u32, out as u32))
        });
        register!("fd_readdir", move |mut caller: Caller<'_, T>, fd: i32, buf: i32, buf_len: i32, cookie: i64, bufused: i32| -> i32 {
            let ctx_ptr = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem = match guest_memory(&mut caller) {
                Ok(mem) => mem,
                Err(_) => return Errno::Inval.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx_ptr };
            errno_result(ctx_ref.fs.fd_readdir(mem, fd as u32, buf as u32, buf_len as u32, cookie as u64, bufused as u32))
        });
        register!("path_open", move |mut caller: Caller<'_, T>, dir_fd: i32, _dirflags: i32, path_ptr: i32, path_len: i32, oflags: i32, _fs_rights_base: i64, _fs_rights_inheriting: i64, _fdflags: i32, opened_fd: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let mem = unsafe { &mut *mem_ptr };
            let rel_path = match memory::read_string(mem, path_ptr as u32, path_len as u32) {
                Ok(s) => s,
                Err(e) => return e.code() as i32,
            };
            match ctx.fs.path_open(dir_fd as u32, &rel_path, oflags as u16) {
                Ok(fd) => {
                    match memory::write_u32(mem, opened_fd as u32, fd) {
                        Ok(()) => Errno::Success.code() as i32,
                        Err(e) => e.code() as i32,
                    }
                }
                Err(e) => e.code() as i32,
            }
        });
        register!("path_create_directory", move |mut caller: Caller<'_, T>, dir_fd: i32, path_ptr: i32, path_len: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let mem = unsafe { &mut *mem_ptr };
            let rel_path = match memory::read_string(mem, path_ptr as u32, path_len as u32) {
                Ok(s) => s,
                Err(e) => return e.code() as i32,
            };
            errno_result(ctx.fs.path_create_directory(dir_fd as u32, &rel_path))
        });
        register!("path_filestat_get", move |mut caller: Caller<'_, T>, dir_fd: i32, _flags: i32, path_ptr: i32, path_len: i32, stat: i32| -> i32 {
            let ctx_ptr = get_cx(caller.data_mut()) as *const WasiCtx;
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let mem = unsafe { &mut *mem_ptr };
            let rel_path = match memory::read_string(mem, path_ptr as u32, path_len as u32) {
                Ok(s) => s,
                Err(e) => return e.code() as i32,
            };
            let ctx_ref = unsafe { &*ctx_ptr };
            errno_result(ctx_ref.fs.path_filestat_get(mem, dir_fd as u32, &rel_path, stat as u32))
        });
        register!("path_unlink_file", move |mut caller: Caller<'_, T>, dir_fd: i32, path_ptr: i32, path_len: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let mem = unsafe { &mut *mem_ptr };
            let rel_path = match memory::read_string(mem, path_ptr as u32, path_len as u32) {
                Ok(s) => s,
                Err(e) => return e.code() as i32,
            };
            errno_result(ctx.fs.path_remove(dir_fd as u32, &rel_path))
        });
        register!("path_remove_directory", move |mut caller: Caller<'_, T>, dir_fd: i32, path_ptr: i32, path_len: i32| -> i32 {
            let ctx = get_cx(caller.data_mut());
            let mem_ptr: *mut [u8] = match guest_memory(&mut caller) {
                Ok(mem) => mem as *mut [u8],
                Err(_) => return Errno::Inval.code() as i32,
            };
            let mem = unsafe { &mut *mem_ptr };
            let rel_path = match memory::read_string(mem, path_ptr as u32, path_len as u32) {
                Ok(s) => s,
                Err(e) => return e.code() as i32,
            };
            errno_result(ctx.fs.path_remove(dir_fd as u32, &rel_path))
        });
    } else {
        enosys_stub!("fd_filestat_get", (i32, i32));
        enosys_stub!("fd_prestat_get", (i32, i32));
        enosys_stub!("fd_prestat_dir_name", (i32, i32, i32));
        enosys_stub!("fd_seek", (i32, i64, i32, i32));
        enosys_stub!("fd_tell", (i32, i32));
        enosys_stub!("fd_readdir", (i32, i32, i32, i64, i32));
        enosys_stub!("path_open", (i32, i32, i32, i32, i32, i64, i64, i32, i32));
        enosys_stub!("path_create_directory", (i32, i32, i32));
        enosys_stub!("path_filestat_get", (i32, i32, i32, i32, i32));
        enosys_stub!("path_unlink_file", (i32, i32, i32));
        enosys_stub!("path_remove_directory", (i32, i32, i32));
    }

    enosys_stub!("fd_advise", (i32, i64, i64, i32));
    enosys_stub!("fd_allocate", (i32, i64, i64));
    enosys_stub!("fd_datasync", (i32));
    enosys_stub!("fd_fdstat_set_flags", (i32, i32));
    enosys_stub!("fd_fdstat_set_rights", (i32, i64, i64));
    enosys_stub!("fd_filestat_set_size", (i32, i64));
    enosys_stub!("fd_filestat_set_times", (i32, i64, i64, i32));
    enosys_stub!("fd_pread", (i32, i32, i32, i64, i32));
    enosys_stub!("fd_pwrite", (i32, i32, i32, i64, i32));
    enosys_stub!("fd_renumber", (i32, i32));
    enosys_stub!("fd_sync", (i32));
    enosys_stub!("path_filestat_set_times", (i32, i32, i32, i32, i64, i64, i32));
    enosys_stub!("path_link", (i32, i32, i32, i32, i32, i32, i32));
    enosys_stub!("path_readlink", (i32, i32, i32, i32, i32, i32));
    enosys_stub!("path_rename", (i32, i32, i32, i32, i32, i32));
    enosys_stub!("path_symlink", (i32, i32, i32, i32, i32));
    enosys_stub!("poll_oneoff", (i32, i32, i32, i32));
    enosys_stub!("sched_yield", ());
    enosys_stub!("sock_accept", (i32, i32, i32));
    enosys_stub!("sock_recv", (i32, i32, i32, i32, i32, i32));
    enosys_stub!("sock_send", (i32, i32, i32, i32, i32));
    enosys_stub!("sock_shutdown", (i32, i32));

    Ok(())
}
