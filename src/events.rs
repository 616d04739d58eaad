use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128};
use near_sdk::{log, near, AccountId, NearToken};

/// NEP-297 events watched by the counterpart chain. `swap_completed` is the
/// only place the secret becomes public.
#[near(event_json(standard = "htlc"))]
pub enum SwapEvent {
    #[event_version("1.0.0")]
    SwapInitiated {
        swap_id: Base58CryptoHash,
        initiator: AccountId,
        participant: AccountId,
        amount: U128,
        hashlock: Base58CryptoHash,
        timelock: u64,
    },
    #[event_version("1.0.0")]
    SwapCompleted {
        swap_id: Base58CryptoHash,
        secret: Base64VecU8,
    },
    #[event_version("1.0.0")]
    SwapRefunded { swap_id: Base58CryptoHash },
}

// Helper for consistent custody logging
pub fn log_custody_event(event: &str, account_id: &AccountId, amount: NearToken) {
    log!(
        "CUSTODY_{}: account='{}', amount='{}'",
        event,
        account_id,
        amount.as_yoctonear()
    );
}
