//! End-to-end scenarios driving real `.wat` guests through the linker and
//! the `start`/`initialize` driver, mirroring the core's testable
//! properties: argv round-tripping, exit-code passthrough, ENOSYS fallback,
//! stdin chunking, and preopen/file round-trips.

use std::sync::{Arc, Mutex};

use wasmi::{Engine, Instance, Linker, Module, Store};
use wasmi_wasi::{add_to_linker, start, Feature, FixedReader, WasiCtx, WasiCtxBuilder, Writable};

fn wat2wasm(text: &str) -> Vec<u8> {
    wat::parse_str(text).unwrap()
}

/// A [`Writable`] that appends into a handle the test keeps around, since
/// `CapturingWriter` is consumed by value and the builder takes ownership.
#[derive(Clone, Default)]
struct SharedCapture(Arc<Mutex<Vec<u8>>>);

impl Writable for SharedCapture {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.0.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }
}

fn instantiate(wasm: &[u8], wasi: WasiCtx) -> (Store<WasiCtx>, Instance) {
    let engine = Engine::default();
    let module = Module::new(&engine, wasm).unwrap();
    let mut store = Store::new(&engine, wasi);
    let mut linker = Linker::new(&engine);
    add_to_linker(&mut linker, store.data(), |ctx| ctx).unwrap();
    let instance = linker
        .instantiate(&mut store, &module)
        .unwrap()
        .start(&mut store)
        .unwrap();
    (store, instance)
}

/// Scenario 1: `args=["prog","hi"]`; the guest writes `argv[1]` to fd 1.
#[test]
fn echo_argv_writes_second_argument_to_stdout() {
    const WAT: &str = r#"
        (module
            (import "wasi_snapshot_preview1" "args_sizes_get" (func $args_sizes_get (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "args_get" (func $args_get (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (func (export "_start")
                (drop (call $args_sizes_get (i32.const 0) (i32.const 4)))
                (drop (call $args_get (i32.const 8) (i32.const 100)))
                ;; iovec at 200 points at argv[1]'s bytes (offset read from argv[8+4])
                (i32.store (i32.const 200) (i32.load (i32.const 12)))
                (i32.store (i32.const 204) (i32.const 2))
                (drop (call $fd_write (i32.const 1) (i32.const 200) (i32.const 1) (i32.const 300)))
            )
        )
    "#;
    let wasm = wat2wasm(WAT);

    let stdout = SharedCapture::default();
    let captured = stdout.0.clone();
    let wasi = WasiCtxBuilder::new()
        .args(["prog", "hi"])
        .unwrap()
        .feature(Feature::Args)
        .feature(Feature::Stdio)
        .stdout(stdout)
        .build()
        .unwrap();
    let (mut store, instance) = instantiate(&wasm, wasi);

    let exit_code = start(&mut store, instance, |ctx| ctx).unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(&*captured.lock().unwrap(), b"hi");
}

/// Scenario 2: the guest calls `proc_exit(42)`; `start` returns 42.
#[test]
fn proc_exit_code_passes_through_start() {
    const WAT: &str = r#"
        (module
            (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
            (memory (export "memory") 1)
            (func (export "_start")
                (call $proc_exit (i32.const 42))
            )
        )
    "#;
    let wasm = wat2wasm(WAT);
    let wasi = WasiCtxBuilder::new().feature(Feature::Proc).build().unwrap();
    let (mut store, instance) = instantiate(&wasm, wasi);

    let exit_code = start(&mut store, instance, |ctx| ctx).unwrap();
    assert_eq!(exit_code, 42);
}

/// Scenario 3: with no features selected, `random_get` observes `ENOSYS` (52).
#[test]
fn enosys_reach_with_no_features_selected() {
    const WAT: &str = r#"
        (module
            (import "wasi_snapshot_preview1" "random_get" (func $random_get (param i32 i32) (result i32)))
            (memory (export "memory") 1)
            (global $result (mut i32) (i32.const -1))
            (func (export "_start")
                (global.set $result (call $random_get (i32.const 0) (i32.const 8)))
            )
            (func (export "result") (result i32) (global.get $result))
        )
    "#;
    let wasm = wat2wasm(WAT);
    let wasi = WasiCtxBuilder::new().build().unwrap();
    let (mut store, instance) = instantiate(&wasm, wasi);

    let exit_code = start(&mut store, instance, |ctx| ctx).unwrap();
    assert_eq!(exit_code, 0);
    let result = instance
        .get_typed_func::<(), i32>(&store, "result")
        .unwrap()
        .call(&mut store, ())
        .unwrap();
    assert_eq!(result, 52);
}

/// Scenario 4: stdin yields `"Y\nN\n"` then is exhausted; two two-byte
/// `fd_read`s drain it, a third observes EOF.
#[test]
fn stdin_pull_drains_a_fixed_reader_then_reports_eof() {
    const WAT: &str = r#"
        (module
            (import "wasi_snapshot_preview1" "fd_read" (func $fd_read (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (func (export "_start")
                (i32.store (i32.const 100) (i32.const 200))
                (i32.store (i32.const 104) (i32.const 2))
                (drop (call $fd_read (i32.const 0) (i32.const 100) (i32.const 1) (i32.const 300)))

                (i32.store (i32.const 100) (i32.const 210))
                (drop (call $fd_read (i32.const 0) (i32.const 100) (i32.const 1) (i32.const 304)))

                (i32.store (i32.const 100) (i32.const 220))
                (drop (call $fd_read (i32.const 0) (i32.const 100) (i32.const 1) (i32.const 308)))
            )
        )
    "#;
    let wasm = wat2wasm(WAT);
    let wasi = WasiCtxBuilder::new()
        .feature(Feature::Stdio)
        .stdin(FixedReader::new(*b"Y\nN\n"))
        .build()
        .unwrap();
    let (mut store, instance) = instantiate(&wasm, wasi);

    start(&mut store, instance, |ctx| ctx).unwrap();

    let memory = instance.get_memory(&store, "memory").unwrap();
    let data = memory.data(&store);
    assert_eq!(&data[200..202], b"Y\n");
    assert_eq!(&data[210..212], b"N\n");
    assert_eq!(u32::from_le_bytes(data[300..304].try_into().unwrap()), 2);
    assert_eq!(u32::from_le_bytes(data[304..308].try_into().unwrap()), 2);
    assert_eq!(u32::from_le_bytes(data[308..312].try_into().unwrap()), 0);
}

/// Scenario 5: `/sandbox/greet.txt` pre-seeded with `"hello"`; the guest
/// opens it relative to the preopen fd and reads it back whole.
#[test]
fn preopen_and_file_round_trip() {
    const WAT: &str = r#"
        (module
            (import "wasi_snapshot_preview1" "path_open" (func $path_open
                (param i32 i32 i32 i32 i32 i64 i64 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_read" (func $fd_read (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (data (i32.const 0) "greet.txt")
            (func (export "_start")
                (drop (call $path_open
                    (i32.const 3) (i32.const 0)
                    (i32.const 0) (i32.const 9)
                    (i32.const 0)
                    (i64.const 0) (i64.const 0)
                    (i32.const 0)
                    (i32.const 100)))
                (i32.store (i32.const 200) (i32.const 300))
                (i32.store (i32.const 204) (i32.const 5))
                (drop (call $fd_read
                    (i32.load (i32.const 100))
                    (i32.const 200) (i32.const 1) (i32.const 400)))
            )
        )
    "#;
    let wasm = wat2wasm(WAT);
    let wasi = WasiCtxBuilder::new()
        .preopened_dir("/sandbox")
        .unwrap()
        .file("/sandbox/greet.txt", *b"hello")
        .build()
        .unwrap();
    let (mut store, instance) = instantiate(&wasm, wasi);

    let exit_code = start(&mut store, instance, |ctx| ctx).unwrap();
    assert_eq!(exit_code, 0);

    let memory = instance.get_memory(&store, "memory").unwrap();
    let data = memory.data(&store);
    assert_eq!(&data[300..305], b"hello");
    assert_eq!(u32::from_le_bytes(data[400..404].try_into().unwrap()), 5);
}

/// Scenario 6: create `/sandbox/out`, write `"abcdef"`, seek to offset 2,
/// read 3 bytes back.
#[test]
fn create_write_seek_read_round_trip() {
    const WAT: &str = r#"
        (module
            (import "wasi_snapshot_preview1" "path_open" (func $path_open
                (param i32 i32 i32 i32 i32 i64 i64 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_seek" (func $fd_seek (param i32 i64 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_read" (func $fd_read (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (data (i32.const 0) "out")
            (data (i32.const 10) "abcdef")
            (func (export "_start")
                (local $fd i32)
                (drop (call $path_open
                    (i32.const 3) (i32.const 0)
                    (i32.const 0) (i32.const 3)
                    (i32.const 1) ;; OFLAGS_CREAT
                    (i64.const 0) (i64.const 0)
                    (i32.const 0)
                    (i32.const 100)))
                (local.set $fd (i32.load (i32.const 100)))

                (i32.store (i32.const 200) (i32.const 10))
                (i32.store (i32.const 204) (i32.const 6))
                (drop (call $fd_write (local.get $fd) (i32.const 200) (i32.const 1) (i32.const 300)))

                (drop (call $fd_seek (local.get $fd) (i64.const 2) (i32.const 0) (i32.const 310)))

                (i32.store (i32.const 200) (i32.const 320))
                (i32.store (i32.const 204) (i32.const 3))
                (drop (call $fd_read (local.get $fd) (i32.const 200) (i32.const 1) (i32.const 330)))
            )
        )
    "#;
    let wasm = wat2wasm(WAT);
    let wasi = WasiCtxBuilder::new().preopened_dir("/sandbox").unwrap().build().unwrap();
    let (mut store, instance) = instantiate(&wasm, wasi);

    let exit_code = start(&mut store, instance, |ctx| ctx).unwrap();
    assert_eq!(exit_code, 0);

    let memory = instance.get_memory(&store, "memory").unwrap();
    let data = memory.data(&store);
    assert_eq!(&data[320..323], b"cde");
}

/// Property: every name in the fixed `wasi_snapshot_preview1` import set is
/// callable with its documented arity, whether or not a feature backs it —
/// unimplemented names are filled with an `ENOSYS` stub rather than left
/// missing, so a guest linked against a full libc can still link.
#[test]
fn every_fixed_import_name_links_with_no_features_selected() {
    const WAT: &str = r#"
        (module
            (import "wasi_snapshot_preview1" "args_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "args_sizes_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "clock_res_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "clock_time_get" (func (param i32 i64 i32) (result i32)))
            (import "wasi_snapshot_preview1" "environ_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "environ_sizes_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_advise" (func (param i32 i64 i64 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_allocate" (func (param i32 i64 i64) (result i32)))
            (import "wasi_snapshot_preview1" "fd_close" (func (param i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_datasync" (func (param i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_fdstat_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_fdstat_set_flags" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_fdstat_set_rights" (func (param i32 i64 i64) (result i32)))
            (import "wasi_snapshot_preview1" "fd_filestat_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_filestat_set_size" (func (param i32 i64) (result i32)))
            (import "wasi_snapshot_preview1" "fd_filestat_set_times" (func (param i32 i64 i64 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_pread" (func (param i32 i32 i32 i64 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_prestat_dir_name" (func (param i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_prestat_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_pwrite" (func (param i32 i32 i32 i64 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_read" (func (param i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_readdir" (func (param i32 i32 i32 i64 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_renumber" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_seek" (func (param i32 i64 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_sync" (func (param i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_tell" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "fd_write" (func (param i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_create_directory" (func (param i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_filestat_get" (func (param i32 i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_filestat_set_times" (func (param i32 i32 i32 i32 i64 i64 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_link" (func (param i32 i32 i32 i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_open" (func (param i32 i32 i32 i32 i32 i64 i64 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_readlink" (func (param i32 i32 i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_remove_directory" (func (param i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_rename" (func (param i32 i32 i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_symlink" (func (param i32 i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "path_unlink_file" (func (param i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "poll_oneoff" (func (param i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "proc_exit" (func (param i32)))
            (import "wasi_snapshot_preview1" "proc_raise" (func (param i32) (result i32)))
            (import "wasi_snapshot_preview1" "random_get" (func (param i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "sched_yield" (func (result i32)))
            (import "wasi_snapshot_preview1" "sock_accept" (func (param i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "sock_recv" (func (param i32 i32 i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "sock_send" (func (param i32 i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "sock_shutdown" (func (param i32 i32) (result i32)))
            (memory (export "memory") 1)
            (func (export "_start"))
        )
    "#;
    let wasm = wat2wasm(WAT);
    let wasi = WasiCtxBuilder::new().build().unwrap();
    let (mut store, instance) = instantiate(&wasm, wasi);

    let exit_code = start(&mut store, instance, |ctx| ctx).unwrap();
    assert_eq!(exit_code, 0);
}
