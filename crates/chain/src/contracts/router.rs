//! Multi-hop swap router interface.
//!
//! The router takes an explicit token path plus one pair address and one
//! opaque routing blob per hop. `hops = path.len() - 1`; `pairs` and
//! `extras` must both have exactly that many entries.
//!
//! # Per-hop extras
//!
//! An empty blob selects the router's default fee for the hop. A non-empty
//! blob is `abi.encode(uint24 fee)` in hundredths of a bip (3000 = 0.30%),
//! the same fee tier encoding Uniswap V3 uses.

use alloy::primitives::{Address, Bytes, Uint, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolType};

sol! {
    /// Path-based router with explicit pairs and per-hop routing data.
    interface ISwapRouter {
        function swapExactInForMinOut(
            address[] calldata path,
            address[] calldata pairs,
            bytes[] calldata extras,
            uint256 amountIn,
            uint256 minOut,
            address to,
            uint256 deadline
        ) external returns (uint256 amountOut);
    }
}

type FeeData = alloy::sol_types::sol_data::Uint<24>;

/// Largest fee a `uint24` extras blob can carry.
pub const MAX_HOP_FEE: u32 = 0xFF_FFFF;

/// Encode a per-hop fee override (hundredths of a bip).
///
/// Returns `None` when `fee` does not fit in a `uint24`.
pub fn encode_hop_fee(fee: u32) -> Option<Bytes> {
    if fee > MAX_HOP_FEE {
        return None;
    }
    let fee_u24 = Uint::<24, 1>::from(fee);
    Some(FeeData::abi_encode(&fee_u24).into())
}

/// Decode a per-hop extras blob.
///
/// Returns `Ok(None)` for an empty blob (use the default fee).
pub fn decode_hop_fee(extra: &[u8]) -> Result<Option<u32>, alloy::sol_types::Error> {
    if extra.is_empty() {
        return Ok(None);
    }
    let fee = FeeData::abi_decode(extra, true)?;
    Ok(Some(fee.to::<u32>()))
}

/// Encode `swapExactInForMinOut` calldata.
#[allow(clippy::too_many_arguments)]
pub fn encode_swap(
    path: &[Address],
    pairs: &[Address],
    extras: &[Bytes],
    amount_in: U256,
    min_out: U256,
    to: Address,
    deadline: u64,
) -> Bytes {
    let call = ISwapRouter::swapExactInForMinOutCall {
        path: path.to_vec(),
        pairs: pairs.to_vec(),
        extras: extras.to_vec(),
        amountIn: amount_in,
        minOut: min_out,
        to,
        deadline: U256::from(deadline),
    };
    Bytes::from(call.abi_encode())
}
