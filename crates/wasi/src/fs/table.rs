/// Which of the three standard streams an `OpenFile::Stdio` entry refers to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum StdioKind {
    In,
    Out,
    Err,
}

/// An entry in the open-file table, keyed by file descriptor.
pub(crate) enum OpenFile {
    /// fd 0, 1 or 2. Never removed by `fd_close`.
    Stdio(StdioKind),
    /// Any descriptor addressing the path-addressable node tree: regular
    /// files, directories (including preopens), and `/dev/null`.
    Node {
        /// Absolute normalized guest path this descriptor was opened against.
        path: String,
        /// Current byte offset. Meaningless for directories.
        position: u64,
        /// Whether this descriptor was created during preopen registration.
        is_preopen: bool,
    },
}

impl OpenFile {
    pub(crate) fn path(&self) -> Option<&str> {
        match self {
            Self::Node { path, .. } => Some(path),
            Self::Stdio(_) => None,
        }
    }
}
