use near_sdk::env;

use crate::error::SwapError;

const NANOS_IN_SEC: u64 = 1_000_000_000;

/// Current block time in whole seconds.
///
/// `now_secs() < timelock` holds exactly when the block timestamp in
/// nanoseconds is below `timelock * NANOS_IN_SEC`, so truncation never moves a
/// deadline.
pub fn now_secs() -> u64 {
    env::block_timestamp() / NANOS_IN_SEC
}

/// A new swap must expire strictly after the block it is created in.
pub fn ensure_in_future(timelock: u64, now: u64) -> Result<(), SwapError> {
    if timelock <= now {
        return Err(SwapError::InvalidInput("timelock must be in the future"));
    }
    Ok(())
}

/// Claims are accepted only while `now < timelock`.
pub fn ensure_claim_window(timelock: u64, now: u64) -> Result<(), SwapError> {
    if now >= timelock {
        return Err(SwapError::TimelockExpired);
    }
    Ok(())
}

/// Refunds open at the timelock itself, the instant claims close.
pub fn ensure_refund_window(timelock: u64, now: u64) -> Result<(), SwapError> {
    if now < timelock {
        return Err(SwapError::TimelockNotYetExpired);
    }
    Ok(())
}
