use near_sdk::FunctionError;
use thiserror::Error;

/// Every way an escrow operation can be rejected.
///
/// Returned from `#[handle_result]` methods; the runtime turns an `Err` into a
/// panic carrying the `Display` text, which rolls back the whole receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, FunctionError)]
pub enum SwapError {
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Swap with these parameters already exists")]
    DuplicateSwap,

    #[error("Swap not found")]
    SwapNotFound,

    #[error("Swap already completed or refunded")]
    SwapAlreadyFinalized,

    #[error("Secret does not match hashlock")]
    InvalidSecret,

    #[error("Timelock expired, only refund is possible")]
    TimelockExpired,

    #[error("Timelock not yet expired")]
    TimelockNotYetExpired,

    #[error("Transfer failed")]
    TransferFailed,
}
