//! Flash liquidation core logic.
//!
//! This crate provides the flash liquidation unit:
//! - Liquidation payload codec (ABI encoded, Solidity compatible)
//! - Swap route validation against the repayment asset
//! - Liquidation, swap and settlement steps run inside the flash loan callback
//! - Executor configuration profiles
//!
//! Collaborators (lending pool, swap router, token ledger, execution host)
//! come from `flash-liquidator-chain`.

pub mod config;
mod error;
mod instruction;
mod liquidator;
mod path;
mod settlement;
mod swap;

pub use config::{expand_env, ExecutorConfig};
pub use error::LiquidationError;
pub use instruction::{DebtMode, FlashRequest, LiquidationInstruction};
pub use liquidator::{FlashLiquidator, UnitState};
pub use path::{validate_route, validate_swap_input};
pub use settlement::{settle, ProfitPolicy, RepaymentObligation, SettlementReport, SettlementResult};
pub use swap::{execute_swap, SwapFailurePolicy, SwapOutcome, SwapSettings};
