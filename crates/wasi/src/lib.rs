//! This crate provides support for WASI `preview1` for the Wasmi interpreter.
//!
//! It owns the full host-side implementation: the binary encoding of WASI
//! structures in guest linear memory, a set of independently selectable
//! feature providers (arguments, environment, clock, process, randomness,
//! standard I/O, an in-memory file system), and the glue that links a chosen
//! set of providers into a [`wasmi::Linker`].
//!
//! Use [`add_to_linker`] to add the composed WASI import table to the Wasmi linker.

mod compose;
mod ctx;
mod driver;
mod error;
mod fs;
mod linker;
mod memory;
mod providers;
mod types;

pub use self::{
    compose::Feature,
    ctx::{RandomSource, WasiCtx, WasiCtxBuilder},
    driver::{initialize, start},
    error::WasiError,
    fs::MemoryFileSystem,
    linker::add_wasi_snapshot_preview1_to_linker as add_to_linker,
    providers::stdio::{
        CapturingWriter, FixedReader, InheritStderr, InheritStdin, InheritStdout, Readable,
        Writable,
    },
    types::{ClockId, Errno, FileType},
};
