//! Numeric constants and small value types mirroring the `wasi_snapshot_preview1` ABI.

/// A WASI `errno` value.
///
/// Only the subset of preview1 errnos this crate ever returns is named; all
/// others are unreachable given the feature set implemented here.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u16)]
pub enum Errno {
    /// No error occurred. System call completed successfully.
    Success = 0,
    /// Bad file descriptor.
    Badf = 8,
    /// File exists.
    Exist = 20,
    /// Invalid argument.
    Inval = 28,
    /// Is a directory.
    Isdir = 31,
    /// No such file or directory.
    Noent = 44,
    /// Not a directory or a symbolic link to a directory.
    Notdir = 54,
    /// Function not supported.
    Nosys = 52,
}

impl Errno {
    /// Returns the raw `u16` value as written back to the guest.
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// A WASI `clockid`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum ClockId {
    Realtime = 0,
    Monotonic = 1,
}

impl ClockId {
    /// Decodes a raw guest-supplied `clockid` value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Realtime),
            1 => Some(Self::Monotonic),
            _ => None,
        }
    }
}

/// A WASI `filetype`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum FileType {
    Unknown = 0,
    CharacterDevice = 2,
    Directory = 3,
    RegularFile = 4,
}

/// Bitflags recognized in the `oflags` parameter of `path_open`.
pub mod oflags {
    pub const CREAT: u16 = 1;
    pub const DIRECTORY: u16 = 2;
    pub const EXCL: u16 = 4;
    pub const TRUNC: u16 = 8;
}

/// `whence` values recognized by `fd_seek`.
pub mod whence {
    pub const SET: u8 = 0;
    pub const CUR: u8 = 1;
    pub const END: u8 = 2;
}

/// Byte size of an encoded `fdstat` struct.
pub const FDSTAT_SIZE: u32 = 24;
/// Byte size of an encoded `filestat` struct.
pub const FILESTAT_SIZE: u32 = 64;
/// Byte size of an encoded `prestat` struct.
pub const PRESTAT_SIZE: u32 = 8;
/// Byte size of an encoded `iovec`/`ciovec`.
pub const IOVEC_SIZE: u32 = 8;
