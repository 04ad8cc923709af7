use crate::{ctx::WasiCtx, memory, types::Errno};

fn entry(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

/// `environ_sizes_get`: variable count and total byte size including NULs.
pub(crate) fn environ_sizes_get(
    ctx: &WasiCtx,
    memory: &mut [u8],
    environc_ptr: u32,
    environ_buf_size_ptr: u32,
) -> Result<(), Errno> {
    let count = ctx.env.len() as u32;
    let buf_size: u32 = ctx
        .env
        .iter()
        .map(|(k, v)| entry(k, v).len() as u32 + 1)
        .sum();
    memory::write_u32(memory, environc_ptr, count)?;
    memory::write_u32(memory, environ_buf_size_ptr, buf_size)
}

/// `environ_get`: writes a pointer table at `environ_ptr` and
/// NUL-terminated `KEY=VALUE` bytes at `environ_buf_ptr`.
pub(crate) fn environ_get(
    ctx: &WasiCtx,
    memory: &mut [u8],
    environ_ptr: u32,
    environ_buf_ptr: u32,
) -> Result<(), Errno> {
    let mut buf_offset = environ_buf_ptr;
    for (i, (key, value)) in ctx.env.iter().enumerate() {
        let pair = entry(key, value);
        memory::write_u32(memory, environ_ptr + (i as u32) * 4, buf_offset)?;
        memory::write_string(memory, buf_offset, &pair)?;
        buf_offset += pair.len() as u32;
        memory::write_bytes(memory, buf_offset, &[0])?;
        buf_offset += 1;
    }
    Ok(())
}
