//! Feature selection and the closed set of importable names.
//!
//! A [`WasiCtx`](crate::WasiCtx) is built with an explicit list of
//! [`Feature`]s. [`crate::add_to_linker`] walks the fixed
//! `wasi_snapshot_preview1` name set, registers a real handler for every
//! name a selected feature covers, and fills every remaining name with a
//! stub that returns `ENOSYS` so a guest linked against a full libc can
//! still boot even when most features are left out.

/// A selectable group of `wasi_snapshot_preview1` imports.
///
/// Features are plain data, not implementations: [`crate::add_to_linker`]
/// is what interprets a [`FeatureSet`] and wires up the matching host
/// functions against a concrete [`wasmi::Linker`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Feature {
    /// `args_get`, `args_sizes_get`.
    Args,
    /// `environ_get`, `environ_sizes_get`.
    Environ,
    /// `clock_res_get`, `clock_time_get`.
    Clock,
    /// `proc_exit`, `proc_raise`.
    Proc,
    /// `random_get`.
    Random,
    /// `fd_read`, `fd_write`, `fd_close`, `fd_fdstat_get` restricted to the
    /// three standard streams; does not provide `path_*` or seeking.
    Stdio,
    /// The full in-memory file system, superseding [`Feature::Stdio`] for
    /// every name it shares and additionally providing `path_*`, `fd_seek`,
    /// `fd_tell`, `fd_readdir`, `fd_prestat_*`, and `fd_filestat_get`.
    Fs,
    /// Wraps every import registered by the other selected features with a
    /// `trace`-level log of `name(args) => result`. Composes with, rather
    /// than replaces, the other features.
    Tracing,
}

/// All features a `WasiCtxBuilder` can combine, pre-resolved into boolean
/// flags reflecting the "later overrides / supersedes earlier" composition
/// rule described for the fixed import set.
#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct FeatureSet {
    pub(crate) args: bool,
    pub(crate) environ: bool,
    pub(crate) clock: bool,
    pub(crate) proc: bool,
    pub(crate) random: bool,
    pub(crate) stdio: bool,
    pub(crate) fs: bool,
    pub(crate) tracing: bool,
}

impl FeatureSet {
    pub(crate) fn resolve(features: &[Feature]) -> Self {
        let mut set = Self::default();
        for feature in features {
            match feature {
                Feature::Args => set.args = true,
                Feature::Environ => set.environ = true,
                Feature::Clock => set.clock = true,
                Feature::Proc => set.proc = true,
                Feature::Random => set.random = true,
                Feature::Stdio => set.stdio = true,
                Feature::Fs => set.fs = true,
                Feature::Tracing => set.tracing = true,
            }
        }
        // `Fs` is a strict superset of `Stdio` for every name they share.
        if set.fs {
            set.stdio = true;
        }
        set
    }
}

/// The closed set of names an embedder may see in the
/// `wasi_snapshot_preview1` import namespace. Anything in this list that no
/// selected feature supplies is filled with an `ENOSYS` stub.
pub(crate) const IMPORT_NAMES: &[&str] = &[
    "args_get",
    "args_sizes_get",
    "clock_res_get",
    "clock_time_get",
    "environ_get",
    "environ_sizes_get",
    "fd_advise",
    "fd_allocate",
    "fd_close",
    "fd_datasync",
    "fd_fdstat_get",
    "fd_fdstat_set_flags",
    "fd_fdstat_set_rights",
    "fd_filestat_get",
    "fd_filestat_set_size",
    "fd_filestat_set_times",
    "fd_pread",
    "fd_prestat_dir_name",
    "fd_prestat_get",
    "fd_pwrite",
    "fd_read",
    "fd_readdir",
    "fd_renumber",
    "fd_seek",
    "fd_sync",
    "fd_tell",
    "fd_write",
    "path_create_directory",
    "path_filestat_get",
    "path_filestat_set_times",
    "path_link",
    "path_open",
    "path_readlink",
    "path_remove_directory",
    "path_rename",
    "path_symlink",
    "path_unlink_file",
    "poll_oneoff",
    "proc_exit",
    "proc_raise",
    "random_get",
    "sched_yield",
    "sock_accept",
    "sock_recv",
    "sock_send",
    "sock_shutdown",
];
