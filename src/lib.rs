use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128};
use near_sdk::store::IterableMap;
use near_sdk::{
    env, ext_contract, near, AccountId, Gas, NearToken, Promise, PromiseError, StorageUsage,
};

mod deposit;
mod error;
mod events;
mod swap;
mod timelocks;

pub use deposit::{Custody, DepositLedger};
pub use error::SwapError;
pub use events::SwapEvent;
pub use swap::{derive_swap_id, hash_secret, Swap, SwapId, SwapStatus, SwapView};

use events::log_custody_event;

const GAS_FOR_WITHDRAW_CALLBACK: Gas = Gas::from_tgas(10);
const MAX_SWAPS_PAGE: u32 = 100;

#[ext_contract(ext_self)]
pub trait SelfCallbacks {
    fn on_withdraw_settled(&mut self, account_id: AccountId, amount: U128);
}

// Define the contract structure
#[near(contract_state)]
pub struct EscrowRegistry {
    // Every swap ever created, keyed by its content-addressed id. Never pruned.
    pub swaps: IterableMap<SwapId, Swap>,
    pub custody: DepositLedger,
    // Upper bounds measured at init with the longest possible account ids
    pub swap_storage_bytes: StorageUsage,
    pub account_storage_bytes: StorageUsage,
}

impl Default for EscrowRegistry {
    fn default() -> Self {
        let mut this = Self {
            swaps: IterableMap::new(b"s"),
            custody: DepositLedger::new(),
            swap_storage_bytes: 0,
            account_storage_bytes: 0,
        };
        this.measure_storage_usage();
        this
    }
}

#[near]
impl EscrowRegistry {
    #[init]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks `amount` yoctoNEAR for `participant` behind `hashlock` until
    /// `timelock` (unix seconds).
    ///
    /// Any attached deposit is credited to the caller's custody balance first.
    /// The caller also pays the storage for the new record and for any balance
    /// entry it opens, so a single call attaching `amount` plus
    /// `swap_storage_cost` funds the swap. Fails without side effects if the
    /// caller's balance cannot cover both.
    #[payable]
    #[handle_result]
    pub fn initiate(
        &mut self,
        participant: AccountId,
        hashlock: Base58CryptoHash,
        timelock: u64,
        amount: U128,
    ) -> Result<Base58CryptoHash, SwapError> {
        let initiator = env::predecessor_account_id();
        let attached = env::attached_deposit();
        let swap_id = self.initiate_swap(
            initiator,
            participant,
            hashlock.into(),
            timelock,
            NearToken::from_yoctonear(amount.0),
            attached,
        )?;
        Ok(swap_id.into())
    }

    /// Releases the swap to its participant. Anyone holding the secret may
    /// call this; the funds only ever go to the recorded participant.
    #[handle_result]
    pub fn complete(
        &mut self,
        swap_id: Base58CryptoHash,
        secret: Base64VecU8,
    ) -> Result<(), SwapError> {
        let swap_id: SwapId = swap_id.into();
        let mut swap = self.active_swap(&swap_id)?;

        if hash_secret(&secret.0) != swap.hashlock {
            return Err(SwapError::InvalidSecret);
        }
        timelocks::ensure_claim_window(swap.timelock, timelocks::now_secs())?;

        swap.completed = true;
        self.custody.release(&swap.participant, swap.amount)?;
        self.swaps.insert(swap_id, swap);

        SwapEvent::SwapCompleted {
            swap_id: swap_id.into(),
            secret,
        }
        .emit();
        Ok(())
    }

    /// Returns the swap to its initiator once the timelock has passed.
    /// Callable by anyone.
    #[handle_result]
    pub fn refund(&mut self, swap_id: Base58CryptoHash) -> Result<(), SwapError> {
        let swap_id: SwapId = swap_id.into();
        let mut swap = self.active_swap(&swap_id)?;

        timelocks::ensure_refund_window(swap.timelock, timelocks::now_secs())?;

        swap.refunded = true;
        self.custody.release(&swap.initiator, swap.amount)?;
        self.swaps.insert(swap_id, swap);

        SwapEvent::SwapRefunded {
            swap_id: swap_id.into(),
        }
        .emit();
        Ok(())
    }

    pub fn get_status(&self, swap_id: Base58CryptoHash) -> SwapStatus {
        let swap_id: SwapId = swap_id.into();
        self.swaps
            .get(&swap_id)
            .map(SwapStatus::from)
            .unwrap_or_else(SwapStatus::not_found)
    }

    pub fn get_swap(&self, swap_id: Base58CryptoHash) -> Option<SwapView> {
        let swap_id: SwapId = swap_id.into();
        self.swaps
            .get(&swap_id)
            .map(|swap| SwapView::new(swap_id, swap))
    }

    /// Pages through swaps in insertion order.
    pub fn get_swaps(&self, from_index: Option<u32>, limit: Option<u32>) -> Vec<SwapView> {
        let limit = limit.unwrap_or(MAX_SWAPS_PAGE).min(MAX_SWAPS_PAGE);
        self.swaps
            .iter()
            .skip(from_index.unwrap_or(0) as usize)
            .take(limit as usize)
            .map(|(swap_id, swap)| SwapView::new(*swap_id, swap))
            .collect()
    }

    pub fn swap_count(&self) -> u32 {
        self.swaps.len()
    }

    /// The id `initiate` would assign to these terms.
    pub fn compute_swap_id(
        &self,
        initiator: AccountId,
        participant: AccountId,
        amount: U128,
        hashlock: Base58CryptoHash,
        timelock: u64,
    ) -> Base58CryptoHash {
        derive_swap_id(
            &initiator,
            &participant,
            NearToken::from_yoctonear(amount.0),
            &hashlock.into(),
            timelock,
        )
        .into()
    }

    /// Storage fee `initiate` would charge `initiator` for a swap to
    /// `participant` right now.
    pub fn swap_storage_cost(&self, initiator: AccountId, participant: AccountId) -> U128 {
        U128(self.storage_cost_for(&initiator, &participant).as_yoctonear())
    }

    /// Storage fee taken from a first deposit to open a balance entry.
    pub fn account_storage_cost(&self) -> U128 {
        U128(self.account_storage_fee().as_yoctonear())
    }

    // --- CUSTODY ---

    /// Credits the attached NEAR to the caller's custody balance, less the
    /// storage fee when this opens the caller's entry.
    #[payable]
    #[handle_result]
    pub fn deposit(&mut self) -> Result<U128, SwapError> {
        let account_id = env::predecessor_account_id();
        let amount = env::attached_deposit();
        if amount.is_zero() {
            return Err(SwapError::InvalidInput("attach a deposit"));
        }

        let storage_cost = if self.custody.has_account(&account_id) {
            NearToken::from_yoctonear(0)
        } else {
            self.account_storage_fee()
        };
        if amount < storage_cost {
            return Err(SwapError::TransferFailed);
        }

        self.custody.credit(&account_id, amount)?;
        self.custody.charge_storage(&account_id, storage_cost)?;
        log_custody_event("DEPOSIT", &account_id, amount);
        Ok(U128(self.custody.balance_of(&account_id).as_yoctonear()))
    }

    /// Pays out `amount` of the caller's available balance as native NEAR.
    /// Escrowed funds are never touched.
    #[handle_result]
    pub fn withdraw(&mut self, amount: U128) -> Result<Promise, SwapError> {
        let account_id = env::predecessor_account_id();
        let amount = NearToken::from_yoctonear(amount.0);
        if amount.is_zero() {
            return Err(SwapError::InvalidInput("withdrawal amount must be positive"));
        }

        self.custody.debit(&account_id, amount)?;
        log_custody_event("WITHDRAW", &account_id, amount);

        Ok(Promise::new(account_id.clone()).transfer(amount).then(
            ext_self::ext(env::current_account_id())
                .with_static_gas(GAS_FOR_WITHDRAW_CALLBACK)
                .on_withdraw_settled(account_id, U128(amount.as_yoctonear())),
        ))
    }

    pub fn balance_of(&self, account_id: AccountId) -> U128 {
        U128(self.custody.balance_of(&account_id).as_yoctonear())
    }

    pub fn total_escrowed(&self) -> U128 {
        U128(self.custody.total_escrowed().as_yoctonear())
    }

    pub fn total_storage_staked(&self) -> U128 {
        U128(self.custody.storage_staked.as_yoctonear())
    }

    // --- PRIVATE CALLBACKS ---
    #[private]
    #[handle_result]
    pub fn on_withdraw_settled(
        &mut self,
        #[callback_result] result: Result<(), PromiseError>,
        account_id: AccountId,
        amount: U128,
    ) -> Result<bool, SwapError> {
        if result.is_ok() {
            return Ok(true);
        }

        // The transfer bounced; the tokens are back with the contract.
        let amount = NearToken::from_yoctonear(amount.0);
        self.custody.credit(&account_id, amount)?;
        log_custody_event("WITHDRAW_REVERTED", &account_id, amount);
        Ok(false)
    }
}

impl EscrowRegistry {
    /// Validation and commit for `initiate`, with the caller and attached
    /// deposit passed in explicitly.
    fn initiate_swap(
        &mut self,
        initiator: AccountId,
        participant: AccountId,
        hashlock: SwapId,
        timelock: u64,
        amount: NearToken,
        attached: NearToken,
    ) -> Result<SwapId, SwapError> {
        if amount.is_zero() {
            return Err(SwapError::InvalidInput("amount must be positive"));
        }
        if participant == env::current_account_id() {
            return Err(SwapError::InvalidInput(
                "participant cannot be the escrow contract",
            ));
        }
        timelocks::ensure_in_future(timelock, timelocks::now_secs())?;

        let swap_id = derive_swap_id(&initiator, &participant, amount, &hashlock, timelock);
        if self.swaps.contains_key(&swap_id) {
            return Err(SwapError::DuplicateSwap);
        }

        // Credit, storage fee and lock are checked together so a shortfall
        // rejects the call before the ledger is written.
        let storage_cost = self.storage_cost_for(&initiator, &participant);
        let required = amount
            .checked_add(storage_cost)
            .ok_or(SwapError::TransferFailed)?;
        let available = self
            .custody
            .balance_of(&initiator)
            .checked_add(attached)
            .ok_or(SwapError::TransferFailed)?;
        let pool_fits = self.custody.total_escrowed().checked_add(amount).is_some();
        let stake_fits = self
            .custody
            .storage_staked
            .checked_add(storage_cost)
            .is_some();
        if available < required || !pool_fits || !stake_fits {
            return Err(SwapError::TransferFailed);
        }

        // Both parties get an entry now so that paying out later never grows
        // storage.
        self.custody.open_account(&initiator);
        self.custody.open_account(&participant);
        self.custody.credit(&initiator, attached)?;
        self.custody.charge_storage(&initiator, storage_cost)?;
        self.custody.lock(&initiator, amount)?;

        let swap = Swap {
            initiator: initiator.clone(),
            participant: participant.clone(),
            amount,
            hashlock,
            timelock,
            completed: false,
            refunded: false,
        };
        self.swaps.insert(swap_id, swap);

        SwapEvent::SwapInitiated {
            swap_id: swap_id.into(),
            initiator,
            participant,
            amount: U128(amount.as_yoctonear()),
            hashlock: hashlock.into(),
            timelock,
        }
        .emit();
        Ok(swap_id)
    }

    /// Storage fee for a swap record plus whichever balance entries it opens.
    fn storage_cost_for(&self, initiator: &AccountId, participant: &AccountId) -> NearToken {
        let mut bytes = self.swap_storage_bytes;
        if !self.custody.has_account(initiator) {
            bytes += self.account_storage_bytes;
        }
        if participant != initiator && !self.custody.has_account(participant) {
            bytes += self.account_storage_bytes;
        }
        env::storage_byte_cost().saturating_mul(bytes as u128)
    }

    fn account_storage_fee(&self) -> NearToken {
        env::storage_byte_cost().saturating_mul(self.account_storage_bytes as u128)
    }

    /// Writes and removes a worst-case swap record and balance entry,
    /// recording how many bytes each took.
    fn measure_storage_usage(&mut self) {
        let account_id: AccountId = "a"
            .repeat(64)
            .parse()
            .unwrap_or_else(|_| env::panic_str("Invalid measurement account id"));
        let sample_id: SwapId = [u8::MAX; 32];

        self.swaps.flush();
        self.custody.balances.flush();
        let initial = env::storage_usage();

        self.custody.open_account(&account_id);
        self.custody.balances.flush();
        self.account_storage_bytes = env::storage_usage().saturating_sub(initial);
        self.custody.balances.remove(&account_id);
        self.custody.balances.flush();

        let sample = Swap {
            initiator: account_id.clone(),
            participant: account_id,
            amount: NearToken::from_yoctonear(u128::MAX),
            hashlock: [u8::MAX; 32],
            timelock: u64::MAX,
            completed: false,
            refunded: false,
        };
        self.swaps.insert(sample_id, sample);
        self.swaps.flush();
        self.swap_storage_bytes = env::storage_usage().saturating_sub(initial);
        self.swaps.remove(&sample_id);
        self.swaps.flush();
    }

    /// Loads a swap that exists and has not reached a terminal state.
    fn active_swap(&self, swap_id: &SwapId) -> Result<Swap, SwapError> {
        let swap = self
            .swaps
            .get(swap_id)
            .cloned()
            .ok_or(SwapError::SwapNotFound)?;
        if swap.is_finalized() {
            return Err(SwapError::SwapAlreadyFinalized);
        }
        Ok(swap)
    }
}
