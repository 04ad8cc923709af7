use crate::{ctx::WasiCtx, memory, types::Errno};

/// `random_get`: fills `len` bytes at `buf_ptr` using the context's
/// [`RandomSource`](crate::RandomSource).
pub(crate) fn random_get(ctx: &mut WasiCtx, memory: &mut [u8], buf_ptr: u32, len: u32) -> Result<(), Errno> {
    let mut bytes = vec![0u8; len as usize];
    ctx.random.fill(&mut bytes);
    memory::write_bytes(memory, buf_ptr, &bytes)?;
    Ok(())
}
