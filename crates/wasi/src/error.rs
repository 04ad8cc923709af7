use std::fmt;

/// Host-side failure surfaced to the embedder.
///
/// This is distinct from the guest-visible [`Errno`](crate::Errno): an
/// `Errno` is a normal return value every import hands back to the guest,
/// while a [`WasiError`] aborts the current host call and propagates to
/// whoever drives the [`wasmi::Store`].
#[derive(Debug, thiserror::Error)]
pub enum WasiError {
    /// The guest called `proc_exit`. Carries the exit code the driver should
    /// report to its own caller. This is a control-flow signal, not really
    /// an error, but it has to unwind like one.
    #[error("wasi process exited with status code {0}")]
    ProcessExit(i32),

    /// A [`WasiCtxBuilder`](crate::WasiCtxBuilder) was misconfigured.
    #[error("invalid wasi configuration: {0}")]
    Config(String),

    /// The guest module or its export table didn't satisfy what the driver
    /// requires (missing `memory`, missing `_start`/`_initialize`, called an
    /// entry point twice, ...).
    #[error("wasi driver error: {0}")]
    Trap(String),

    /// A host-provided callback (stdio hook, RNG) failed.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WasiError {
    /// Returns the exit code if `self` is a [`WasiError::ProcessExit`].
    pub fn i32_exit_status(&self) -> Option<i32> {
        match self {
            Self::ProcessExit(code) => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn trap(msg: impl Into<String>) -> Self {
        Self::Trap(msg.into())
    }
}

impl fmt::Display for crate::Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Badf => "bad file descriptor",
            Self::Exist => "file exists",
            Self::Inval => "invalid argument",
            Self::Isdir => "is a directory",
            Self::Noent => "no such file or directory",
            Self::Notdir => "not a directory",
            Self::Nosys => "function not supported",
        };
        f.write_str(s)
    }
}
