//! In-memory token ledger.
//!
//! Holds ERC20-style balances and allowances for every token, the current
//! block timestamp, and a trace of collaborator calls encoded as ABI
//! calldata. All arithmetic is checked: an underflow is an error, never a
//! wraparound.
//!
//! The ledger is `Clone`; [`Ledger::checkpoint`] and [`crate::Host`] use
//! that to stage mutations and discard them on failure.

use std::collections::HashMap;
use std::fmt;

use alloy::primitives::{Address, Bytes, U256};
use thiserror::Error;

use crate::contracts::common::{encode_approve, encode_transfer, encode_transfer_from};

/// Token ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient {token} balance for {holder}: available {available}, required {required}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        available: U256,
        required: U256,
    },

    #[error("insufficient {token} allowance from {owner} to {spender}: available {available}, required {required}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        available: U256,
        required: U256,
    },

    #[error("{token} balance overflow for {holder}")]
    Overflow { token: Address, holder: Address },
}

/// A single collaborator call, recorded as `(from, to, calldata)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub from: Address,
    pub to: Address,
    pub calldata: Bytes,
}

impl CallRecord {
    /// The 4-byte function selector, if the calldata has one.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.calldata.get(..4).and_then(|s| s.try_into().ok())
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selector() {
            Some(sel) => write!(
                f,
                "{} -> {} 0x{} ({} bytes)",
                self.from,
                self.to,
                hex::encode(sel),
                self.calldata.len()
            ),
            None => write!(f, "{} -> {} (no selector)", self.from, self.to),
        }
    }
}

/// Token balances, allowances, clock and call trace.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// (token, holder) → balance
    balances: HashMap<(Address, Address), U256>,
    /// (token, owner, spender) → allowance
    allowances: HashMap<(Address, Address, Address), U256>,
    /// Current block timestamp (seconds)
    timestamp: u64,
    /// Collaborator calls in execution order
    trace: Vec<CallRecord>,
}

impl Ledger {
    /// Create an empty ledger at the given block timestamp.
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Set `spender`'s allowance over `owner`'s `token` to exactly `amount`.
    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((token, owner, spender), amount);
        self.record(owner, token, encode_approve(spender, amount));
    }

    /// Move `amount` of `token` from `from` to `to`.
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.move_balance(token, from, to, amount)?;
        self.record(from, token, encode_transfer(to, amount));
        Ok(())
    }

    /// Move `amount` of `token` from `from` to `to`, spending `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let available = self.allowance(token, from, spender);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance {
                token,
                owner: from,
                spender,
                available,
                required: amount,
            })?;

        self.move_balance(token, from, to, amount)?;
        self.allowances.insert((token, from, spender), remaining);
        self.record(spender, token, encode_transfer_from(from, to, amount));
        Ok(())
    }

    /// Credit `amount` of `token` to `to` out of thin air.
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        let balance = self.balance_of(token, to);
        let updated = balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { token, holder: to })?;
        self.balances.insert((token, to), updated);
        Ok(())
    }

    /// Destroy `amount` of `token` held by `from`.
    pub fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), LedgerError> {
        let available = self.balance_of(token, from);
        let updated = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                token,
                holder: from,
                available,
                required: amount,
            })?;
        self.balances.insert((token, from), updated);
        Ok(())
    }

    /// Append a collaborator call to the trace.
    pub fn record(&mut self, from: Address, to: Address, calldata: Bytes) {
        self.trace.push(CallRecord { from, to, calldata });
    }

    /// Calls recorded so far, in execution order.
    pub fn trace(&self) -> &[CallRecord] {
        &self.trace
    }

    /// Run `f` as a nested all-or-nothing sub-call.
    ///
    /// On `Err` every mutation `f` made (balances, allowances, trace) is
    /// discarded and the ledger is left exactly as it was before the call.
    pub fn checkpoint<T, E>(
        &mut self,
        f: impl FnOnce(&mut Ledger) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }

    fn move_balance(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.burn(token, from, amount)?;
        self.mint(token, to, amount)
    }
}
