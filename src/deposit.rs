use near_sdk::{near, store::LookupMap, AccountId, NearToken};

use crate::error::SwapError;

/// Custody of the funds behind every swap: spendable per-account balances plus
/// one pool holding the amounts of all active swaps.
///
/// Balance entries are paid for once and never removed, so only opening an
/// account grows storage.
#[near(serializers = [borsh])]
pub struct DepositLedger {
    // AccountId -> available balance
    pub balances: LookupMap<AccountId, NearToken>,
    pub escrowed: NearToken,
    // Paid out of balances to back the contract's storage stake
    pub storage_staked: NearToken,
}

impl DepositLedger {
    pub fn new() -> Self {
        Self {
            balances: LookupMap::new(b"b"),
            escrowed: NearToken::from_yoctonear(0),
            storage_staked: NearToken::from_yoctonear(0),
        }
    }

    pub fn has_account(&self, account_id: &AccountId) -> bool {
        self.balances.contains_key(account_id)
    }

    /// Creates a zero balance entry if `account_id` has none yet.
    pub fn open_account(&mut self, account_id: &AccountId) {
        if !self.has_account(account_id) {
            self.balances
                .insert(account_id.clone(), NearToken::from_yoctonear(0));
        }
    }

    /// Moves `cost` out of `account_id`'s balance into the storage stake.
    pub fn charge_storage(
        &mut self,
        account_id: &AccountId,
        cost: NearToken,
    ) -> Result<(), SwapError> {
        let staked = self
            .storage_staked
            .checked_add(cost)
            .ok_or(SwapError::TransferFailed)?;
        self.debit(account_id, cost)?;
        self.storage_staked = staked;
        Ok(())
    }

    fn write_balance(&mut self, account_id: &AccountId, balance: NearToken) {
        self.balances.insert(account_id.clone(), balance);
    }
}

/// Value-transfer primitives the escrow registry relies on.
///
/// Each method either applies in full or returns an error having written
/// nothing.
pub trait Custody {
    fn balance_of(&self, account_id: &AccountId) -> NearToken;
    fn total_escrowed(&self) -> NearToken;
    fn credit(&mut self, account_id: &AccountId, amount: NearToken) -> Result<(), SwapError>;
    fn debit(&mut self, account_id: &AccountId, amount: NearToken) -> Result<(), SwapError>;
    /// Moves `amount` from `from`'s available balance into the escrow pool.
    fn lock(&mut self, from: &AccountId, amount: NearToken) -> Result<(), SwapError>;
    /// Pays `amount` out of the escrow pool to `to`.
    fn release(&mut self, to: &AccountId, amount: NearToken) -> Result<(), SwapError>;
}

impl Custody for DepositLedger {
    fn balance_of(&self, account_id: &AccountId) -> NearToken {
        self.balances
            .get(account_id)
            .copied()
            .unwrap_or(NearToken::from_yoctonear(0))
    }

    fn total_escrowed(&self) -> NearToken {
        self.escrowed
    }

    fn credit(&mut self, account_id: &AccountId, amount: NearToken) -> Result<(), SwapError> {
        let balance = self
            .balance_of(account_id)
            .checked_add(amount)
            .ok_or(SwapError::TransferFailed)?;
        self.write_balance(account_id, balance);
        Ok(())
    }

    fn debit(&mut self, account_id: &AccountId, amount: NearToken) -> Result<(), SwapError> {
        let balance = self
            .balance_of(account_id)
            .checked_sub(amount)
            .ok_or(SwapError::TransferFailed)?;
        self.write_balance(account_id, balance);
        Ok(())
    }

    fn lock(&mut self, from: &AccountId, amount: NearToken) -> Result<(), SwapError> {
        let balance = self
            .balance_of(from)
            .checked_sub(amount)
            .ok_or(SwapError::TransferFailed)?;
        let escrowed = self
            .escrowed
            .checked_add(amount)
            .ok_or(SwapError::TransferFailed)?;

        self.write_balance(from, balance);
        self.escrowed = escrowed;
        Ok(())
    }

    fn release(&mut self, to: &AccountId, amount: NearToken) -> Result<(), SwapError> {
        let escrowed = self
            .escrowed
            .checked_sub(amount)
            .ok_or(SwapError::TransferFailed)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(SwapError::TransferFailed)?;

        self.escrowed = escrowed;
        self.write_balance(to, balance);
        Ok(())
    }
}

impl Default for DepositLedger {
    fn default() -> Self {
        Self::new()
    }
}
