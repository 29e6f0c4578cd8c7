//! In-memory constant-product swap router.
//!
//! Each pair is an address whose ledger balances of its two tokens are the
//! pool reserves. A swap pulls the input from the caller into the first
//! pair, walks the path hop by hop (each pair forwards its output straight
//! into the next pair), and the last pair pays the recipient.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use tracing::debug;

use super::{ProtocolError, SwapRequest, SwapRouter};
use crate::contracts::router::{decode_hop_fee, encode_swap};
use crate::ledger::Ledger;
use crate::u256_math;

/// Default per-hop fee: 0.30% in hundredths of a bip.
const DEFAULT_FEE_PPM: u32 = 3000;

/// A listed constant-product pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPair {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl SimPair {
    fn connects(&self, token_in: Address, token_out: Address) -> bool {
        (self.token0 == token_in && self.token1 == token_out)
            || (self.token1 == token_in && self.token0 == token_out)
    }
}

/// Path router over constant-product pairs.
#[derive(Debug, Clone)]
pub struct SimSwapRouter {
    address: Address,
    default_fee_ppm: u32,
    pairs: HashMap<Address, SimPair>,
}

impl SimSwapRouter {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            default_fee_ppm: DEFAULT_FEE_PPM,
            pairs: HashMap::new(),
        }
    }

    /// Set the fee used for hops with empty extras.
    pub fn with_default_fee_ppm(mut self, fee_ppm: u32) -> Self {
        self.default_fee_ppm = fee_ppm;
        self
    }

    /// List a pair.
    pub fn with_pair(mut self, pair: SimPair) -> Self {
        self.pairs.insert(pair.address, pair);
        self
    }

    /// Seed a pair's reserves.
    pub fn add_liquidity(
        &self,
        ledger: &mut Ledger,
        pair: Address,
        amount0: U256,
        amount1: U256,
    ) -> Result<(), ProtocolError> {
        let listed = self.pairs.get(&pair).ok_or(ProtocolError::UnknownPair(pair))?;
        ledger.mint(listed.token0, pair, amount0)?;
        ledger.mint(listed.token1, pair, amount1)?;
        Ok(())
    }

    /// Quote a route without executing it.
    pub fn quote(&self, ledger: &Ledger, request: &SwapRequest<'_>) -> Result<U256, ProtocolError> {
        self.validate_route(request)?;

        let mut amount = request.amount_in;
        for hop in 0..request.hops() {
            amount = self.hop_out(ledger, request, hop, amount)?;
        }
        Ok(amount)
    }

    fn validate_route(&self, request: &SwapRequest<'_>) -> Result<(), ProtocolError> {
        let hops = request.hops();
        if hops == 0 {
            return Err(ProtocolError::InvalidRoute(format!(
                "path of {} token(s) has no hop",
                request.path.len()
            )));
        }
        if request.pairs.len() != hops || request.extras.len() != hops {
            return Err(ProtocolError::InvalidRoute(format!(
                "{} hops but {} pairs and {} extras",
                hops,
                request.pairs.len(),
                request.extras.len()
            )));
        }

        for (hop, pair_address) in request.pairs.iter().enumerate() {
            let pair = self
                .pairs
                .get(pair_address)
                .ok_or(ProtocolError::UnknownPair(*pair_address))?;
            if !pair.connects(request.path[hop], request.path[hop + 1]) {
                return Err(ProtocolError::InvalidRoute(format!(
                    "pair {} does not connect {} -> {}",
                    pair_address,
                    request.path[hop],
                    request.path[hop + 1]
                )));
            }
        }
        Ok(())
    }

    fn hop_fee(&self, request: &SwapRequest<'_>, hop: usize) -> Result<u32, ProtocolError> {
        let fee = decode_hop_fee(&request.extras[hop]).map_err(|e| ProtocolError::InvalidExtras {
            hop,
            reason: e.to_string(),
        })?;
        let fee = fee.unwrap_or(self.default_fee_ppm);
        if U256::from(fee) > u256_math::FEE_DENOMINATOR {
            return Err(ProtocolError::InvalidExtras {
                hop,
                reason: format!("fee {} exceeds {} ppm", fee, u256_math::FEE_DENOMINATOR),
            });
        }
        Ok(fee)
    }

    fn hop_out(
        &self,
        ledger: &Ledger,
        request: &SwapRequest<'_>,
        hop: usize,
        amount_in: U256,
    ) -> Result<U256, ProtocolError> {
        let pair = request.pairs[hop];
        let reserve_in = ledger.balance_of(request.path[hop], pair);
        let reserve_out = ledger.balance_of(request.path[hop + 1], pair);
        let fee = self.hop_fee(request, hop)?;

        u256_math::constant_product_out(amount_in, reserve_in, reserve_out, fee)
            .ok_or(ProtocolError::Overflow("hop output"))
    }
}

impl SwapRouter for SimSwapRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn swap_exact_in_for_min_out(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        request: SwapRequest<'_>,
    ) -> Result<U256, ProtocolError> {
        ledger.record(
            caller,
            self.address,
            encode_swap(
                request.path,
                request.pairs,
                request.extras,
                request.amount_in,
                request.min_out,
                request.recipient,
                request.deadline,
            ),
        );

        let now = ledger.timestamp();
        if now > request.deadline {
            return Err(ProtocolError::Expired {
                deadline: request.deadline,
                now,
            });
        }

        let quoted = self.quote(ledger, &request)?;
        if quoted < request.min_out {
            return Err(ProtocolError::InsufficientOutput {
                amount_out: quoted,
                min_out: request.min_out,
            });
        }

        let hops = request.hops();
        ledger.transfer_from(
            request.path[0],
            self.address,
            caller,
            request.pairs[0],
            request.amount_in,
        )?;

        // Reserves for hop i are read after hop i-1 settled, so the
        // executed amounts match the quote.
        let mut amount = request.amount_in;
        for hop in 0..hops {
            let reserve_in_before = ledger
                .balance_of(request.path[hop], request.pairs[hop])
                .checked_sub(amount)
                .ok_or(ProtocolError::Overflow("hop reserve"))?;
            let reserve_out = ledger.balance_of(request.path[hop + 1], request.pairs[hop]);
            let fee = self.hop_fee(&request, hop)?;
            let out = u256_math::constant_product_out(amount, reserve_in_before, reserve_out, fee)
                .ok_or(ProtocolError::Overflow("hop output"))?;

            let to = if hop + 1 < hops {
                request.pairs[hop + 1]
            } else {
                request.recipient
            };
            ledger.transfer(request.path[hop + 1], request.pairs[hop], to, out)?;
            amount = out;
        }

        // Executed output can fall below the quote when a route revisits a pair.
        if amount < request.min_out {
            return Err(ProtocolError::InsufficientOutput {
                amount_out: amount,
                min_out: request.min_out,
            });
        }

        debug!(
            amount_in = %request.amount_in,
            amount_out = %amount,
            hops,
            "[ROUTER] Swap executed"
        );

        Ok(amount)
    }
}
