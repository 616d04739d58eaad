use near_sdk::json_types::{Base58CryptoHash, U128};
use near_sdk::{borsh, env, near, AccountId, CryptoHash, NearToken};

// Unique identifier for a swap: SHA256 over all of its terms.
pub type SwapId = CryptoHash;

// A single hashed time-lock swap. Terms never change after creation; only one
// of the two flags ever flips.
#[near(serializers = [borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct Swap {
    pub initiator: AccountId,   // Funded the swap, may reclaim after the timelock
    pub participant: AccountId, // Receives the funds when the secret is revealed
    pub amount: NearToken,
    pub hashlock: CryptoHash,
    pub timelock: u64, // Unix seconds

    pub completed: bool,
    pub refunded: bool,
}

impl Swap {
    pub fn is_finalized(&self) -> bool {
        self.completed || self.refunded
    }
}

/// Content-addressed swap id. Identical terms always map to the same id, which
/// is what makes a second identical initiation a duplicate.
///
/// The Borsh encoding length-prefixes both account ids, so no two distinct
/// term tuples share a preimage.
pub fn derive_swap_id(
    initiator: &AccountId,
    participant: &AccountId,
    amount: NearToken,
    hashlock: &CryptoHash,
    timelock: u64,
) -> SwapId {
    let preimage = borsh::to_vec(&(
        initiator,
        participant,
        amount.as_yoctonear(),
        hashlock,
        timelock,
    ))
    .unwrap_or_else(|_| env::panic_str("Failed to encode swap terms"));
    env::sha256_array(&preimage)
}

pub fn hash_secret(secret: &[u8]) -> CryptoHash {
    env::sha256_array(secret)
}

/// Compact status tuple. Unknown ids report a zero amount.
#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq)]
pub struct SwapStatus {
    pub amount: U128,
    pub timelock: u64,
    pub completed: bool,
    pub refunded: bool,
}

impl SwapStatus {
    pub fn not_found() -> Self {
        Self {
            amount: U128(0),
            timelock: 0,
            completed: false,
            refunded: false,
        }
    }
}

impl From<&Swap> for SwapStatus {
    fn from(swap: &Swap) -> Self {
        Self {
            amount: U128(swap.amount.as_yoctonear()),
            timelock: swap.timelock,
            completed: swap.completed,
            refunded: swap.refunded,
        }
    }
}

// Full record as served to watchers and UIs.
#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq)]
pub struct SwapView {
    pub swap_id: Base58CryptoHash,
    pub initiator: AccountId,
    pub participant: AccountId,
    pub amount: U128,
    pub hashlock: Base58CryptoHash,
    pub timelock: u64,
    pub completed: bool,
    pub refunded: bool,
}

impl SwapView {
    pub fn new(swap_id: SwapId, swap: &Swap) -> Self {
        Self {
            swap_id: swap_id.into(),
            initiator: swap.initiator.clone(),
            participant: swap.participant.clone(),
            amount: U128(swap.amount.as_yoctonear()),
            hashlock: swap.hashlock.into(),
            timelock: swap.timelock,
            completed: swap.completed,
            refunded: swap.refunded,
        }
    }
}
