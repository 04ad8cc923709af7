use std::time::SystemTime;

use crate::{ctx::WasiCtx, memory, types::{ClockId, Errno}};

const REALTIME_RESOLUTION_NANOS: u64 = 1_000;
const MONOTONIC_RESOLUTION_NANOS: u64 = 5_000;

/// `clock_res_get`: `CLOCK_REALTIME` resolves to 1us, `CLOCK_MONOTONIC` to
/// 5us (backed by [`std::time::Instant`]). Any other clock id is `ENOSYS`.
pub(crate) fn clock_res_get(memory: &mut [u8], clock_id: u32, out_ptr: u32) -> Result<(), Errno> {
    let resolution = match ClockId::from_raw(clock_id).ok_or(Errno::Nosys)? {
        ClockId::Realtime => REALTIME_RESOLUTION_NANOS,
        ClockId::Monotonic => MONOTONIC_RESOLUTION_NANOS,
    };
    memory::write_u64(memory, out_ptr, resolution)
}

/// `clock_time_get`: nanoseconds since the Unix epoch for `CLOCK_REALTIME`,
/// or nanoseconds since this [`WasiCtx`] was built for `CLOCK_MONOTONIC`.
/// `precision` is accepted but ignored. Any other clock id is `ENOSYS`.
pub(crate) fn clock_time_get(
    ctx: &WasiCtx,
    memory: &mut [u8],
    clock_id: u32,
    _precision: u64,
    out_ptr: u32,
) -> Result<(), Errno> {
    let nanos = match ClockId::from_raw(clock_id).ok_or(Errno::Nosys)? {
        ClockId::Realtime => SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0),
        ClockId::Monotonic => ctx.start_instant.elapsed().as_nanos() as u64,
    };
    memory::write_u64(memory, out_ptr, nanos)
}
