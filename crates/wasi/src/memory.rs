//! Bit-exact encoding and decoding of `wasi_snapshot_preview1` data structures
//! in the guest's linear memory.
//!
//! Every function here takes a fresh `&mut [u8]` borrowed from the guest's
//! exported `memory` for the duration of a single host call. Callers must
//! never cache a slice across calls: the guest can grow its memory in
//! between, which would invalidate any previously captured view.

use crate::types::{Errno, FileType, FDSTAT_SIZE, FILESTAT_SIZE, IOVEC_SIZE, PRESTAT_SIZE};

/// One guest-addressed `iovec`/`ciovec`: `{ buf: u32, len: u32 }`.
#[derive(Copy, Clone, Debug)]
pub struct RawIoVec {
    pub buf: u32,
    pub len: u32,
}

fn check_bounds(memory: &[u8], offset: u32, len: u32) -> Result<(), Errno> {
    let end = (offset as usize).checked_add(len as usize).ok_or(Errno::Inval)?;
    if end > memory.len() {
        return Err(Errno::Inval);
    }
    Ok(())
}

/// Reads `count` little-endian `iovec` descriptors starting at `ptr`.
pub fn read_iovecs(memory: &[u8], ptr: u32, count: u32) -> Result<Vec<RawIoVec>, Errno> {
    check_bounds(memory, ptr, count.saturating_mul(IOVEC_SIZE))?;
    let mut iovecs = Vec::with_capacity(count as usize);
    for i in 0..count {
        let base = ptr as usize + (i * IOVEC_SIZE) as usize;
        let buf = u32::from_le_bytes(memory[base..base + 4].try_into().unwrap());
        let len = u32::from_le_bytes(memory[base + 4..base + 8].try_into().unwrap());
        iovecs.push(RawIoVec { buf, len });
    }
    Ok(iovecs)
}

/// Borrows mutable subviews of `memory` for each iovec in `iovecs`, in order.
///
/// Used by readers: each returned slice is writable guest memory the import
/// handler fills with data read from some source.
pub fn iov_views_mut<'m>(
    memory: &'m mut [u8],
    iovecs: &[RawIoVec],
) -> Result<Vec<&'m mut [u8]>, Errno> {
    for iov in iovecs {
        check_bounds(memory, iov.buf, iov.len)?;
    }
    // Non-overlapping by WASI convention; split_at_mut per slice via raw pointers
    // keeps this a single borrow of `memory` for the whole batch.
    let base_ptr = memory.as_mut_ptr();
    let mem_len = memory.len();
    let mut views = Vec::with_capacity(iovecs.len());
    for iov in iovecs {
        let start = iov.buf as usize;
        let len = iov.len as usize;
        debug_assert!(start + len <= mem_len);
        // SAFETY: bounds were checked above and iovecs are guest-supplied
        // buffer descriptors that the guest itself guarantees don't alias
        // in ways that would violate Rust's aliasing rules for this call.
        let slice = unsafe { std::slice::from_raw_parts_mut(base_ptr.add(start), len) };
        views.push(slice);
    }
    Ok(views)
}

/// Borrows immutable subviews of `memory` for each iovec in `iovecs`, in order.
///
/// Used by writers: each returned slice is the guest data to be written out.
pub fn iov_views<'m>(memory: &'m [u8], iovecs: &[RawIoVec]) -> Result<Vec<&'m [u8]>, Errno> {
    for iov in iovecs {
        check_bounds(memory, iov.buf, iov.len)?;
    }
    Ok(iovecs
        .iter()
        .map(|iov| &memory[iov.buf as usize..iov.buf as usize + iov.len as usize])
        .collect())
}

/// Writes `bytes` at `offset`. Returns the number of bytes written.
pub fn write_bytes(memory: &mut [u8], offset: u32, bytes: &[u8]) -> Result<u32, Errno> {
    check_bounds(memory, offset, bytes.len() as u32)?;
    let start = offset as usize;
    memory[start..start + bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len() as u32)
}

/// Writes the UTF-8 bytes of `s` at `offset`, with no NUL terminator.
pub fn write_string(memory: &mut [u8], offset: u32, s: &str) -> Result<u32, Errno> {
    write_bytes(memory, offset, s.as_bytes())
}

/// UTF-8 byte length of `s`, as reported by `*_sizes_get` companions.
pub fn byte_length(s: &str) -> u32 {
    s.len() as u32
}

/// Reads `len` bytes at `ptr` and decodes them as UTF-8.
pub fn read_string(memory: &[u8], ptr: u32, len: u32) -> Result<String, Errno> {
    check_bounds(memory, ptr, len)?;
    let bytes = &memory[ptr as usize..ptr as usize + len as usize];
    String::from_utf8(bytes.to_vec()).map_err(|_| Errno::Inval)
}

pub fn write_u16(memory: &mut [u8], offset: u32, value: u16) -> Result<(), Errno> {
    check_bounds(memory, offset, 2)?;
    memory[offset as usize..offset as usize + 2].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn write_u32(memory: &mut [u8], offset: u32, value: u32) -> Result<(), Errno> {
    check_bounds(memory, offset, 4)?;
    memory[offset as usize..offset as usize + 4].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn write_u64(memory: &mut [u8], offset: u32, value: u64) -> Result<(), Errno> {
    check_bounds(memory, offset, 8)?;
    memory[offset as usize..offset as usize + 8].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Writes a zeroed `fdstat` struct, setting only `filetype` and `fs_flags`.
pub fn write_fdstat(memory: &mut [u8], ptr: u32, filetype: FileType, flags: u16) -> Result<(), Errno> {
    check_bounds(memory, ptr, FDSTAT_SIZE)?;
    let base = ptr as usize;
    memory[base..base + FDSTAT_SIZE as usize].fill(0);
    memory[base] = filetype as u8;
    write_u16(memory, ptr + 2, flags)?;
    Ok(())
}

/// Writes a zeroed `filestat` struct except for `filetype`. Callers that know
/// a non-zero size overwrite it afterwards with [`write_filestat_size`].
pub fn write_filestat(memory: &mut [u8], ptr: u32, filetype: FileType) -> Result<(), Errno> {
    check_bounds(memory, ptr, FILESTAT_SIZE)?;
    let base = ptr as usize;
    memory[base..base + FILESTAT_SIZE as usize].fill(0);
    memory[base + 16] = filetype as u8;
    Ok(())
}

/// Overwrites the `size` field (offset 32) of an already-written `filestat`.
pub fn write_filestat_size(memory: &mut [u8], ptr: u32, size: u64) -> Result<(), Errno> {
    write_u64(memory, ptr + 32, size)
}

/// Writes a `prestat` tagged as a preopened directory with the given path length.
pub fn write_prestat_dir(memory: &mut [u8], ptr: u32, path_len: u32) -> Result<(), Errno> {
    check_bounds(memory, ptr, PRESTAT_SIZE)?;
    let base = ptr as usize;
    memory[base..base + PRESTAT_SIZE as usize].fill(0);
    write_u32(memory, ptr + 4, path_len)?;
    Ok(())
}
