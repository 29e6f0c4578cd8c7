//! Collaborator abstraction layer.
//!
//! This module provides traits for the three parties a flash liquidation
//! talks to: the lending pool that lends and liquidates, the swap router
//! that converts seized collateral, and the flash loan receiver the pool
//! calls back into.
//!
//! # Architecture
//!
//! - [`LendingPool`]: flash loans and the liquidation primitive
//! - [`SwapRouter`]: multi-hop exact-in swaps with a min-out floor
//! - [`FlashLoanReceiver`]: the callback entry point the pool invokes
//!
//! Every method operates on a [`Ledger`] passed in by the caller, so the
//! whole call chain mutates one staged ledger and commits or rolls back as
//! a unit.
//!
//! # Example
//!
//! ```rust,ignore
//! use flash_liquidator_chain::{Host, LendingPool, SimLendingPool};
//!
//! let pool = SimLendingPool::new(pool_address).with_reserve(reserve);
//! host.execute(|ledger| pool.flash_loan(ledger, caller, &receiver, request))?;
//! ```

mod aave_v3;
mod router;

pub use aave_v3::{ReserveConfig, SimLendingPool};
pub use router::{SimPair, SimSwapRouter};

use alloy::primitives::{Address, Bytes, U256};
use std::fmt::Debug;
use thiserror::Error;

use crate::ledger::{Ledger, LedgerError};

/// Errors raised by collaborators.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("unknown reserve {0}")]
    UnknownReserve(Address),

    #[error("invalid flash loan request: {0}")]
    InvalidRequest(String),

    #[error("unsupported interest rate mode {0}")]
    UnsupportedMode(u8),

    #[error("flash loan receiver {0} returned false")]
    CallbackRejected(Address),

    #[error("flash loan receiver aborted: {0}")]
    Receiver(anyhow::Error),

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("unknown pair {0}")]
    UnknownPair(Address),

    #[error("invalid extras for hop {hop}: {reason}")]
    InvalidExtras { hop: usize, reason: String },

    #[error("deadline {deadline} expired at {now}")]
    Expired { deadline: u64, now: u64 },

    #[error("insufficient output: {amount_out} < {min_out}")]
    InsufficientOutput { amount_out: U256, min_out: U256 },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// Parameters for a pool flash loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashLoanRequest {
    /// Contract that receives the funds and the callback
    pub receiver: Address,
    /// Borrowed assets
    pub assets: Vec<Address>,
    /// Borrowed amounts, aligned with `assets`
    pub amounts: Vec<U256>,
    /// Interest rate modes, aligned with `assets` (0 = repay in the same unit)
    pub modes: Vec<u8>,
    /// Account any opened debt would be charged to
    pub on_behalf_of: Address,
    /// Opaque payload handed back to the receiver
    pub params: Bytes,
    /// Integrator referral code
    pub referral_code: u16,
}

/// Arguments the pool passes to [`FlashLoanReceiver::on_loan_received`].
#[derive(Debug, Clone)]
pub struct LoanCallback {
    /// Address of the pool making the call
    pub caller: Address,
    pub assets: Vec<Address>,
    pub amounts: Vec<U256>,
    /// Fee owed on top of each amount
    pub premiums: Vec<U256>,
    /// Account that requested the flash loan
    pub initiator: Address,
    pub params: Bytes,
}

/// Parameters for a liquidation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationCallParams {
    /// Collateral asset to seize
    pub collateral_asset: Address,
    /// Debt asset to repay
    pub debt_asset: Address,
    /// Borrower to liquidate
    pub borrower: Address,
    /// Amount of debt to cover
    pub debt_to_cover: U256,
    /// Whether to receive the wrapped (aToken) collateral instead of the underlying
    pub receive_wrapped: bool,
}

/// Parameters for a multi-hop exact-in swap.
#[derive(Debug, Clone, Copy)]
pub struct SwapRequest<'a> {
    pub path: &'a [Address],
    /// One pair per hop
    pub pairs: &'a [Address],
    /// One routing blob per hop
    pub extras: &'a [Bytes],
    pub amount_in: U256,
    pub min_out: U256,
    pub recipient: Address,
    /// Unix timestamp after which the swap must fail
    pub deadline: u64,
}

impl SwapRequest<'_> {
    /// Number of hops implied by the path.
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Contract that can receive a flash loan callback.
pub trait FlashLoanReceiver: Send + Sync {
    /// Address the pool sends funds to and calls back.
    fn address(&self) -> Address;

    /// Called by the pool after the borrowed funds are transferred and
    /// before repayment is pulled. Returning `Ok(false)` or `Err` fails
    /// the flash loan.
    fn on_loan_received(&self, ledger: &mut Ledger, callback: &LoanCallback) -> anyhow::Result<bool>;
}

/// Lending pool with flash loans and liquidation.
pub trait LendingPool: Send + Sync + Debug {
    /// Pool contract address.
    fn address(&self) -> Address;

    /// Wrapped (interest-bearing) representation of `asset`, if listed.
    fn wrapped_asset(&self, asset: Address) -> Option<Address>;

    /// Lend `request.amounts` to `request.receiver`, invoke its callback,
    /// then pull principal plus premium back through the allowance the
    /// receiver granted.
    fn flash_loan(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        receiver: &dyn FlashLoanReceiver,
        request: FlashLoanRequest,
    ) -> Result<(), ProtocolError>;

    /// Repay part of `borrower`'s debt on behalf of `caller` in exchange
    /// for collateral. The pool pulls the debt asset from `caller`.
    ///
    /// `Ok(false)` means the pool declined (e.g. a healthy position).
    fn liquidation_call(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        params: LiquidationCallParams,
    ) -> Result<bool, ProtocolError>;
}

/// Multi-hop swap router.
pub trait SwapRouter: Send + Sync + Debug {
    /// Router contract address.
    fn address(&self) -> Address;

    /// Pull `amount_in` of `path[0]` from `caller`, route it through
    /// `pairs`, and deliver at least `min_out` of the last path token to
    /// `recipient`. Returns the amount delivered.
    fn swap_exact_in_for_min_out(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        request: SwapRequest<'_>,
    ) -> Result<U256, ProtocolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_request_hops() {
        let path = [Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3)];
        let request = SwapRequest {
            path: &path,
            pairs: &[],
            extras: &[],
            amount_in: U256::ZERO,
            min_out: U256::ZERO,
            recipient: Address::ZERO,
            deadline: 0,
        };
        assert_eq!(request.hops(), 2);

        let empty = SwapRequest { path: &[], ..request };
        assert_eq!(empty.hops(), 0);
    }
}
