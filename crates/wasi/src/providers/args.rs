use crate::{ctx::WasiCtx, memory, types::Errno};

/// `args_sizes_get`: argument count and total byte size including NULs.
pub(crate) fn args_sizes_get(
    ctx: &WasiCtx,
    memory: &mut [u8],
    argc_ptr: u32,
    argv_buf_size_ptr: u32,
) -> Result<(), Errno> {
    let argc = ctx.args.len() as u32;
    let buf_size: u32 = ctx.args.iter().map(|a| a.len() as u32 + 1).sum();
    memory::write_u32(memory, argc_ptr, argc)?;
    memory::write_u32(memory, argv_buf_size_ptr, buf_size)
}

/// `args_get`: writes a pointer table at `argv_ptr` and NUL-terminated
/// argument bytes at `argv_buf_ptr`.
pub(crate) fn args_get(
    ctx: &WasiCtx,
    memory: &mut [u8],
    argv_ptr: u32,
    argv_buf_ptr: u32,
) -> Result<(), Errno> {
    let mut buf_offset = argv_buf_ptr;
    for (i, arg) in ctx.args.iter().enumerate() {
        memory::write_u32(memory, argv_ptr + (i as u32) * 4, buf_offset)?;
        memory::write_string(memory, buf_offset, arg)?;
        buf_offset += arg.len() as u32;
        memory::write_bytes(memory, buf_offset, &[0])?;
        buf_offset += 1;
    }
    Ok(())
}
