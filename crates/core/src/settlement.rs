//! Repayment obligation and settlement math.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::LiquidationError;

/// Whether a settlement that exactly covers the obligation is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitPolicy {
    /// Zero profit settles
    #[default]
    AllowZero,
    /// Zero profit aborts the unit
    RequirePositive,
}

/// What the pool pulls back after the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaymentObligation {
    pub principal: U256,
    pub fee: U256,
    pub total_due: U256,
}

impl RepaymentObligation {
    pub fn new(principal: U256, fee: U256) -> Result<Self, LiquidationError> {
        let total_due = principal
            .checked_add(fee)
            .ok_or(LiquidationError::Overflow("repayment obligation"))?;
        Ok(Self {
            principal,
            fee,
            total_due,
        })
    }
}

/// Balance check outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementResult {
    pub final_balance: U256,
    pub profit: U256,
}

/// Check that `final_balance` covers the obligation and split out the profit.
pub fn settle(
    final_balance: U256,
    obligation: &RepaymentObligation,
    policy: ProfitPolicy,
) -> Result<SettlementResult, LiquidationError> {
    let profit = final_balance.checked_sub(obligation.total_due).ok_or(
        LiquidationError::InsufficientRepayment {
            balance: final_balance,
            total_due: obligation.total_due,
        },
    )?;

    if profit.is_zero() && policy == ProfitPolicy::RequirePositive {
        return Err(LiquidationError::NoProfit {
            balance: final_balance,
            total_due: obligation.total_due,
        });
    }

    Ok(SettlementResult {
        final_balance,
        profit,
    })
}

/// Outcome of a committed flash liquidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    pub borrower: Address,
    pub collateral_asset: Address,
    pub debt_asset: Address,
    pub principal: U256,
    pub fee: U256,
    pub total_due: U256,
    pub final_balance: U256,
    pub profit: U256,
    /// Seized collateral sent through the router (zero without a swap)
    pub amount_swapped: U256,
    /// Repayment asset received from the router (zero without a swap)
    pub amount_received: U256,
    pub beneficiary: Address,
}
