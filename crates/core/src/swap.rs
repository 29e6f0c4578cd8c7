//! Swap step: route seized collateral back into the repayment asset.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use flash_liquidator_chain::{Ledger, SwapRequest, SwapRouter};

use crate::error::LiquidationError;
use crate::instruction::LiquidationInstruction;
use crate::settlement::RepaymentObligation;

/// What happens when the router call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapFailurePolicy {
    /// Abort the unit with `SwapFailed`
    #[default]
    Strict,
    /// Undo the router call, log it, and let settlement decide
    Soft,
}

/// Amounts moved by a completed swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub amount_in: U256,
    pub amount_out: U256,
}

/// Swap parameters that do not come from the payload.
#[derive(Debug, Clone, Copy)]
pub struct SwapSettings {
    pub policy: SwapFailurePolicy,
    pub deadline_secs: u64,
}

/// Run the swap for `instruction` on behalf of `executor`.
///
/// Sells the executor's entire balance of `path[0]` with a floor of the
/// obligation's `total_due`. Returns `Ok(None)` when the path is empty or
/// when a soft-policy failure was absorbed.
pub fn execute_swap<R: SwapRouter + ?Sized>(
    ledger: &mut Ledger,
    router: &R,
    executor: Address,
    instruction: &LiquidationInstruction,
    obligation: &RepaymentObligation,
    settings: SwapSettings,
) -> Result<Option<SwapOutcome>, LiquidationError> {
    if !instruction.needs_swap() {
        return Ok(None);
    }

    let result = ledger.checkpoint(|ledger| {
        swap_exact_balance(ledger, router, executor, instruction, obligation, settings.deadline_secs)
    });

    match (result, settings.policy) {
        (Ok(outcome), _) => Ok(Some(outcome)),
        (Err(err), SwapFailurePolicy::Strict) => Err(err),
        (Err(err), SwapFailurePolicy::Soft) => {
            warn!(
                borrower = %instruction.borrower,
                error = %err,
                "[SWAP] Swap failed, continuing to settlement"
            );
            Ok(None)
        }
    }
}

fn swap_exact_balance<R: SwapRouter + ?Sized>(
    ledger: &mut Ledger,
    router: &R,
    executor: Address,
    instruction: &LiquidationInstruction,
    obligation: &RepaymentObligation,
    deadline_secs: u64,
) -> Result<SwapOutcome, LiquidationError> {
    let path = &instruction.swap_path;
    let (Some(token_in), Some(token_out)) = (path.first().copied(), path.last().copied()) else {
        return Err(LiquidationError::SwapFailed("empty swap path".to_string()));
    };

    let amount_in = ledger.balance_of(token_in, executor);
    if amount_in.is_zero() {
        return Err(LiquidationError::SwapFailed(format!(
            "no {} balance to swap",
            token_in
        )));
    }

    ledger.approve(token_in, executor, router.address(), amount_in);

    let deadline = ledger
        .timestamp()
        .checked_add(deadline_secs)
        .ok_or(LiquidationError::Overflow("swap deadline"))?;
    // On a round trip the input leaves the same balance the output lands in.
    let before = if token_in == token_out {
        ledger
            .balance_of(token_out, executor)
            .checked_sub(amount_in)
            .ok_or(LiquidationError::Overflow("swap baseline"))?
    } else {
        ledger.balance_of(token_out, executor)
    };

    debug!(
        token_in = %token_in,
        token_out = %token_out,
        amount_in = %amount_in,
        min_out = %obligation.total_due,
        hops = instruction.hops(),
        deadline,
        "[SWAP] Routing collateral"
    );

    let reported = router
        .swap_exact_in_for_min_out(
            ledger,
            executor,
            SwapRequest {
                path,
                pairs: &instruction.swap_pairs,
                extras: &instruction.swap_extras,
                amount_in,
                min_out: obligation.total_due,
                recipient: executor,
                deadline,
            },
        )
        .map_err(|e| LiquidationError::SwapFailed(e.to_string()))?;

    // Trust the balance, not the router's return value.
    let received = ledger
        .balance_of(token_out, executor)
        .checked_sub(before)
        .ok_or_else(|| LiquidationError::SwapFailed(format!("{} balance decreased", token_out)))?;

    if reported < obligation.total_due || received < obligation.total_due {
        return Err(LiquidationError::SwapFailed(format!(
            "output below floor: reported {}, received {}, min {}",
            reported, received, obligation.total_due
        )));
    }

    Ok(SwapOutcome {
        amount_in,
        amount_out: received,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;
    use flash_liquidator_chain::{SimPair, SimSwapRouter};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    const EXECUTOR: u8 = 0xC0;

    // Y -(0x51)-> X, deep and fee-free
    fn setup() -> (SimSwapRouter, Ledger) {
        let router = SimSwapRouter::new(addr(0xEE))
            .with_default_fee_ppm(0)
            .with_pair(SimPair {
                address: addr(0x51),
                token0: addr(0x02),
                token1: addr(0x01),
            });
        let mut ledger = Ledger::new(1_000);
        let deep = U256::from(1_000_000_000u64);
        router.add_liquidity(&mut ledger, addr(0x51), deep, deep).unwrap();
        ledger.mint(addr(0x02), addr(EXECUTOR), U256::from(1050u64)).unwrap();
        (router, ledger)
    }

    fn instruction() -> LiquidationInstruction {
        LiquidationInstruction::new(addr(0x02), addr(0xB0)).with_route(
            vec![addr(0x02), addr(0x01)],
            vec![addr(0x51)],
            vec![Bytes::new()],
        )
    }

    fn settings(policy: SwapFailurePolicy) -> SwapSettings {
        SwapSettings {
            policy,
            deadline_secs: 60,
        }
    }

    fn obligation(total: u64) -> RepaymentObligation {
        RepaymentObligation::new(U256::from(total), U256::ZERO).unwrap()
    }

    #[test]
    fn test_swaps_entire_balance() {
        let (router, mut ledger) = setup();
        let outcome = execute_swap(
            &mut ledger,
            &router,
            addr(EXECUTOR),
            &instruction(),
            &obligation(1000),
            settings(SwapFailurePolicy::Strict),
        )
        .unwrap()
        .unwrap();

        assert_eq!(outcome.amount_in, U256::from(1050u64));
        assert_eq!(ledger.balance_of(addr(0x02), addr(EXECUTOR)), U256::ZERO);
        assert_eq!(ledger.balance_of(addr(0x01), addr(EXECUTOR)), outcome.amount_out);
        assert!(outcome.amount_out >= U256::from(1000u64));
    }

    #[test]
    fn test_empty_path_skips() {
        let (router, mut ledger) = setup();
        let no_route = LiquidationInstruction::new(addr(0x01), addr(0xB0));
        let outcome = execute_swap(
            &mut ledger,
            &router,
            addr(EXECUTOR),
            &no_route,
            &obligation(1000),
            settings(SwapFailurePolicy::Strict),
        )
        .unwrap();
        assert!(outcome.is_none());
        assert!(ledger.trace().is_empty());
    }

    #[test]
    fn test_zero_balance_fails() {
        let (router, mut ledger) = setup();
        let err = execute_swap(
            &mut ledger,
            &router,
            addr(0xC1),
            &instruction(),
            &obligation(1000),
            settings(SwapFailurePolicy::Strict),
        )
        .unwrap_err();
        assert!(matches!(err, LiquidationError::SwapFailed(_)));
    }

    #[test]
    fn test_strict_floor_violation_aborts() {
        let (router, mut ledger) = setup();
        let err = execute_swap(
            &mut ledger,
            &router,
            addr(EXECUTOR),
            &instruction(),
            &obligation(2000),
            settings(SwapFailurePolicy::Strict),
        )
        .unwrap_err();
        assert!(matches!(err, LiquidationError::SwapFailed(_)));
    }

    #[test]
    fn test_soft_failure_rolls_back_router_call() {
        let (router, mut ledger) = setup();
        let trace_before = ledger.trace().len();

        let outcome = execute_swap(
            &mut ledger,
            &router,
            addr(EXECUTOR),
            &instruction(),
            &obligation(2000),
            settings(SwapFailurePolicy::Soft),
        )
        .unwrap();

        assert!(outcome.is_none());
        assert_eq!(ledger.balance_of(addr(0x02), addr(EXECUTOR)), U256::from(1050u64));
        assert_eq!(ledger.allowance(addr(0x02), addr(EXECUTOR), addr(0xEE)), U256::ZERO);
        assert_eq!(ledger.trace().len(), trace_before);
    }

    #[test]
    fn test_round_trip_route_counts_output_only() {
        // X -(0x51)-> Y -(0x52)-> X
        let router = SimSwapRouter::new(addr(0xEE))
            .with_default_fee_ppm(0)
            .with_pair(SimPair {
                address: addr(0x51),
                token0: addr(0x01),
                token1: addr(0x02),
            })
            .with_pair(SimPair {
                address: addr(0x52),
                token0: addr(0x02),
                token1: addr(0x01),
            });
        let mut ledger = Ledger::new(1_000);
        let deep = U256::from(1_000_000_000u64);
        router.add_liquidity(&mut ledger, addr(0x51), deep, deep).unwrap();
        router.add_liquidity(&mut ledger, addr(0x52), deep, deep).unwrap();
        ledger.mint(addr(0x01), addr(EXECUTOR), U256::from(1050u64)).unwrap();

        let round_trip = LiquidationInstruction::new(addr(0x01), addr(0xB0)).with_route(
            vec![addr(0x01), addr(0x02), addr(0x01)],
            vec![addr(0x51), addr(0x52)],
            vec![Bytes::new(), Bytes::new()],
        );
        let outcome = execute_swap(
            &mut ledger,
            &router,
            addr(EXECUTOR),
            &round_trip,
            &obligation(1005),
            settings(SwapFailurePolicy::Strict),
        )
        .unwrap()
        .unwrap();

        assert_eq!(outcome.amount_in, U256::from(1050u64));
        assert_eq!(ledger.balance_of(addr(0x01), addr(EXECUTOR)), outcome.amount_out);
        assert!(outcome.amount_out >= U256::from(1005u64));
    }

    #[test]
    fn test_deadline_overflow_fails() {
        let (router, mut ledger) = setup();
        let err = execute_swap(
            &mut ledger,
            &router,
            addr(EXECUTOR),
            &instruction(),
            &obligation(1000),
            SwapSettings {
                policy: SwapFailurePolicy::Strict,
                deadline_secs: u64::MAX,
            },
        )
        .unwrap_err();
        assert!(matches!(err, LiquidationError::Overflow(_)));
    }
}
