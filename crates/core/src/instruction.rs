//! Flash liquidation payload codec.
//!
//! The payload carried through the flash loan callback is the ABI parameter
//! encoding of:
//!
//! ```text
//! (address collateralAsset, address borrower, address[] swapPath, address[] swapPairs, bytes[] swapExtras)
//! ```
//!
//! which is byte-for-byte what `abi.encode(collateral, borrower, path, pairs, extras)`
//! produces in Solidity, so payloads built here can be consumed on chain
//! and vice versa.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{sol_data, SolType};

use flash_liquidator_chain::FlashLoanRequest;

use crate::error::LiquidationError;

type LiquidationPayload = (
    sol_data::Address,
    sol_data::Address,
    sol_data::Array<sol_data::Address>,
    sol_data::Array<sol_data::Address>,
    sol_data::Array<sol_data::Bytes>,
);

/// What to liquidate and how to route the seized collateral.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiquidationInstruction {
    /// Collateral asset to seize (underlying, never the wrapped form)
    pub collateral_asset: Address,
    /// Borrower whose position is liquidated
    pub borrower: Address,
    /// Token path from the seized collateral to the repayment asset (empty = no swap)
    pub swap_path: Vec<Address>,
    /// One pair per hop
    pub swap_pairs: Vec<Address>,
    /// One opaque routing blob per hop
    pub swap_extras: Vec<Bytes>,
}

impl LiquidationInstruction {
    /// Instruction with no swap: collateral must already be the repayment asset.
    pub fn new(collateral_asset: Address, borrower: Address) -> Self {
        Self {
            collateral_asset,
            borrower,
            ..Default::default()
        }
    }

    /// Attach a swap route.
    pub fn with_route(mut self, path: Vec<Address>, pairs: Vec<Address>, extras: Vec<Bytes>) -> Self {
        self.swap_path = path;
        self.swap_pairs = pairs;
        self.swap_extras = extras;
        self
    }

    /// Encode as the callback payload.
    pub fn encode(&self) -> Bytes {
        let value = (
            self.collateral_asset,
            self.borrower,
            self.swap_path.clone(),
            self.swap_pairs.clone(),
            self.swap_extras.clone(),
        );
        Bytes::from(LiquidationPayload::abi_encode_params(&value))
    }

    /// Decode a callback payload. Truncated, dirty or mistyped payloads fail.
    pub fn decode(data: &[u8]) -> Result<Self, LiquidationError> {
        let (collateral_asset, borrower, swap_path, swap_pairs, swap_extras) =
            LiquidationPayload::abi_decode_params(data, true)?;

        Ok(Self {
            collateral_asset,
            borrower,
            swap_path,
            swap_pairs,
            swap_extras,
        })
    }

    /// Whether a swap step runs after liquidation.
    pub fn needs_swap(&self) -> bool {
        !self.swap_path.is_empty()
    }

    /// Number of hops implied by the path.
    pub fn hops(&self) -> usize {
        self.swap_path.len().saturating_sub(1)
    }

    /// Whether the pool should deliver the wrapped collateral.
    ///
    /// Wrapped collateral is only useful when a swap will convert it, which
    /// is signalled by a path that starts somewhere other than the raw
    /// collateral.
    pub fn receive_wrapped(&self) -> bool {
        self.swap_path
            .first()
            .is_some_and(|first| *first != self.collateral_asset)
    }
}

/// Interest rate mode for a flash loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DebtMode {
    /// Repay within the same unit; no debt position is opened
    #[default]
    NoDebt = 0,
}

impl DebtMode {
    pub fn id(&self) -> u8 {
        *self as u8
    }
}

/// Single-asset flash loan request built at initiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRequest {
    pub asset: Address,
    pub amount: U256,
    pub mode: DebtMode,
}

impl FlashRequest {
    pub fn new(asset: Address, amount: U256) -> Self {
        Self {
            asset,
            amount,
            mode: DebtMode::NoDebt,
        }
    }

    /// Build the pool request carrying `payload` back to `receiver`.
    pub fn into_pool_request(self, receiver: Address, payload: Bytes, referral_code: u16) -> FlashLoanRequest {
        FlashLoanRequest {
            receiver,
            assets: vec![self.asset],
            amounts: vec![self.amount],
            modes: vec![self.mode.id()],
            on_behalf_of: receiver,
            params: payload,
            referral_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flash_liquidator_chain::contracts::router::encode_hop_fee;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn routed() -> LiquidationInstruction {
        LiquidationInstruction::new(addr(0x02), addr(0xB0)).with_route(
            vec![addr(0x12), addr(0x03), addr(0x01)],
            vec![addr(0x51), addr(0x52)],
            vec![encode_hop_fee(500).unwrap(), Bytes::new()],
        )
    }

    #[test]
    fn test_roundtrip_routed() {
        let instruction = routed();
        let decoded = LiquidationInstruction::decode(&instruction.encode()).unwrap();
        assert_eq!(decoded, instruction);
    }

    #[test]
    fn test_roundtrip_empty_sequences() {
        let instruction = LiquidationInstruction::new(addr(0x01), addr(0xB0));
        let encoded = instruction.encode();

        // 5 head words + 3 empty array lengths
        assert_eq!(encoded.len(), 8 * 32);
        assert_eq!(LiquidationInstruction::decode(&encoded).unwrap(), instruction);
    }

    #[test]
    fn test_matches_solidity_layout() {
        let instruction = LiquidationInstruction::new(addr(0x02), addr(0xB0));
        let encoded = instruction.encode();

        // First word is the left-padded collateral address
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], addr(0x02).as_slice());
        // Third word is the offset of the path array (5 words)
        assert_eq!(U256::from_be_slice(&encoded[64..96]), U256::from(160u64));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let encoded = routed().encode();
        let err = LiquidationInstruction::decode(&encoded[..encoded.len() - 1]).unwrap_err();
        assert!(matches!(err, LiquidationError::Decode(_)));

        assert!(LiquidationInstruction::decode(&[]).is_err());
    }

    #[test]
    fn test_dirty_address_rejected() {
        let mut encoded = LiquidationInstruction::new(addr(0x02), addr(0xB0)).encode().to_vec();
        // Address words must be zero-padded
        encoded[0] = 0xFF;
        let err = LiquidationInstruction::decode(&encoded).unwrap_err();
        assert!(matches!(err, LiquidationError::Decode(_)));
    }

    #[test]
    fn test_receive_wrapped_rule() {
        // No path: raw collateral
        assert!(!LiquidationInstruction::new(addr(0x01), addr(0xB0)).receive_wrapped());

        // Path starts at the raw collateral: raw collateral
        let raw = LiquidationInstruction::new(addr(0x02), addr(0xB0)).with_route(
            vec![addr(0x02), addr(0x01)],
            vec![addr(0x51)],
            vec![Bytes::new()],
        );
        assert!(!raw.receive_wrapped());

        // Path starts elsewhere: wrapped collateral
        assert!(routed().receive_wrapped());
    }

    #[test]
    fn test_flash_request_into_pool_request() {
        let request = FlashRequest::new(addr(0x01), U256::from(1000u64))
            .into_pool_request(addr(0xC0), Bytes::from(vec![1, 2]), 0);

        assert_eq!(request.assets, vec![addr(0x01)]);
        assert_eq!(request.amounts, vec![U256::from(1000u64)]);
        assert_eq!(request.modes, vec![0]);
        assert_eq!(request.on_behalf_of, addr(0xC0));
    }
}
