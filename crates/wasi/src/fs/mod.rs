//! The in-memory sandboxed file system.
//!
//! A tree of directories, regular files, and two character devices
//! (`/dev/null` and stdio) backs every `fd_*`/`path_*` import. There is no
//! notion of host paths here: everything the guest sees is synthesized and
//! held in process memory, as described in the crate's design notes on
//! `path_open` deduplication and stdio close semantics.

mod node;
mod ops;
pub(crate) mod path;
mod table;

use std::collections::HashMap;

use crate::{
    providers::stdio::{Readable, StdioSlots, Writable},
    types::Errno,
};
use node::Node;
use table::{OpenFile, StdioKind};

/// The sandboxed file system and its open-file table.
///
/// One [`MemoryFileSystem`] belongs to exactly one [`crate::WasiCtx`]; it is
/// not `Sync` and must not be shared across concurrently-running guests.
pub struct MemoryFileSystem {
    root: Node,
    open: HashMap<u32, OpenFile>,
    path_to_fd: HashMap<String, u32>,
    next_fd: u32,
    preopens: Vec<String>,
    stdio: StdioSlots,
}

impl MemoryFileSystem {
    /// Creates an empty file system with only `/`, `/dev`, `/dev/null`, and
    /// the inherited stdio streams.
    pub fn new() -> Self {
        Self::with_stdio(StdioSlots::inherit())
    }

    pub(crate) fn with_stdio(stdio: StdioSlots) -> Self {
        let mut root = Node::new_dir();
        node::insert(&mut root, "/dev/null", Node::DevNull)
            .expect("root is always a directory");
        let mut fs = Self {
            root,
            open: HashMap::new(),
            path_to_fd: HashMap::new(),
            next_fd: 3,
            preopens: Vec::new(),
            stdio,
        };
        fs.open.insert(0, OpenFile::Stdio(StdioKind::In));
        fs.open.insert(1, OpenFile::Stdio(StdioKind::Out));
        fs.open.insert(2, OpenFile::Stdio(StdioKind::Err));
        fs
    }

    /// Overrides stdin with a custom [`Readable`].
    pub fn set_stdin(&mut self, reader: Box<dyn Readable>) {
        self.stdio.stdin = crate::providers::stdio::ReadableProxy::new(reader);
    }

    /// Overrides stdout with a custom [`Writable`].
    pub fn set_stdout(&mut self, writer: Box<dyn Writable>) {
        self.stdio.stdout = writer;
    }

    /// Overrides stderr with a custom [`Writable`].
    pub fn set_stderr(&mut self, writer: Box<dyn Writable>) {
        self.stdio.stderr = writer;
    }

    /// Registers `guest_path` as a preopened directory, creating it (and any
    /// missing parents) if it doesn't already exist. Returns the assigned
    /// file descriptor.
    ///
    /// Preopens are assigned consecutive descriptors starting at 3, in
    /// registration order; this must be called before any `path_open` so
    /// numbering matches what callers of `fd_prestat_get` expect.
    pub fn register_preopen(&mut self, guest_path: &str) -> u32 {
        let normalized = path::normalize(guest_path);
        node::ensure_dir_path(&mut self.root, &normalized)
            .expect("preopen path must not shadow a non-directory");
        let fd = self.alloc_fd();
        self.open.insert(
            fd,
            OpenFile::Node {
                path: normalized.clone(),
                position: 0,
                is_preopen: true,
            },
        );
        self.path_to_fd.insert(normalized.clone(), fd);
        self.preopens.push(normalized);
        fd
    }

    /// Creates a regular file at `guest_path` with the given `content`
    /// before the guest ever runs. Intended for test and embedder setup.
    pub fn write_file(&mut self, guest_path: &str, content: impl Into<Vec<u8>>) {
        let normalized = path::normalize(guest_path);
        node::insert(&mut self.root, &normalized, Node::File(content.into()))
            .expect("failed to seed file into memory file system");
    }

    fn alloc_fd(&mut self) -> u32 {
        let fd = self.next_fd;
        self.next_fd += 1;
        fd
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}
