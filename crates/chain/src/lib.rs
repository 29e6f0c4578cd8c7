//! Flash liquidator chain interaction layer.
//!
//! This crate provides:
//! - Contract bindings for the Pool, flash loan receiver, swap router and ERC20
//! - Collaborator traits: [`LendingPool`], [`SwapRouter`], [`FlashLoanReceiver`]
//! - An in-memory token [`Ledger`] with nested checkpoints and a call trace
//! - A staged-commit [`Host`] that runs each unit all-or-nothing
//! - Reference collaborators: an AAVE V3 style pool and a constant-product router
//!
//! The reference collaborators exist so the executor can run and be tested
//! without a live chain; they are not protocol implementations.

pub mod contracts;
mod host;
mod ledger;
pub mod protocol;
pub mod u256_math;

pub use host::Host;
pub use ledger::{CallRecord, Ledger, LedgerError};
pub use protocol::{
    FlashLoanReceiver, FlashLoanRequest, LendingPool, LiquidationCallParams, LoanCallback,
    ProtocolError, ReserveConfig, SimLendingPool, SimPair, SimSwapRouter, SwapRequest,
    SwapRouter,
};
