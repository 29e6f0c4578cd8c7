//! AAVE V3 contract interfaces.
//!
//! This module provides type definitions and ABI bindings for the AAVE V3
//! Pool entry points the flash liquidator touches, plus the flash loan
//! receiver callback the Pool invokes.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

// AAVE V3 Pool interface
sol! {
    /// Aave V3 Pool interface (subset for flash liquidation)
    interface IPool {
        /// Borrow `amounts` of `assets` for the duration of one callback.
        /// `interestRateModes[i] == 0` means no debt is opened for asset i.
        function flashLoan(
            address receiverAddress,
            address[] calldata assets,
            uint256[] calldata amounts,
            uint256[] calldata interestRateModes,
            address onBehalfOf,
            bytes calldata params,
            uint16 referralCode
        ) external;

        /// Liquidate a position - direct pool call
        function liquidationCall(
            address collateralAsset,
            address debtAsset,
            address user,
            uint256 debtToCover,
            bool receiveAToken
        ) external;
    }

    /// Flash loan callback interface (AAVE V3 style).
    interface IFlashLoanReceiver {
        function executeOperation(
            address[] calldata assets,
            uint256[] calldata amounts,
            uint256[] calldata premiums,
            address initiator,
            bytes calldata params
        ) external returns (bool);
    }
}

/// Encode `flashLoan` calldata.
pub fn encode_flash_loan(
    receiver: Address,
    assets: Vec<Address>,
    amounts: Vec<U256>,
    modes: &[u8],
    on_behalf_of: Address,
    params: Bytes,
    referral_code: u16,
) -> Bytes {
    let call = IPool::flashLoanCall {
        receiverAddress: receiver,
        assets,
        amounts,
        interestRateModes: modes.iter().map(|m| U256::from(*m)).collect(),
        onBehalfOf: on_behalf_of,
        params,
        referralCode: referral_code,
    };
    Bytes::from(call.abi_encode())
}

/// Encode direct pool liquidation calldata.
pub fn encode_pool_liquidation(
    collateral: Address,
    debt: Address,
    user: Address,
    debt_to_cover: U256,
    receive_atoken: bool,
) -> Bytes {
    let call = IPool::liquidationCallCall {
        collateralAsset: collateral,
        debtAsset: debt,
        user,
        debtToCover: debt_to_cover,
        receiveAToken: receive_atoken,
    };

    Bytes::from(call.abi_encode())
}

/// Encode the `executeOperation` callback calldata.
pub fn encode_execute_operation(
    assets: Vec<Address>,
    amounts: Vec<U256>,
    premiums: Vec<U256>,
    initiator: Address,
    params: Bytes,
) -> Bytes {
    let call = IFlashLoanReceiver::executeOperationCall {
        assets,
        amounts,
        premiums,
        initiator,
        params,
    };
    Bytes::from(call.abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liquidation_call_selector() {
        // liquidationCall(address,address,address,uint256,bool)
        assert_eq!(hex::encode(IPool::liquidationCallCall::SELECTOR), "00a718a9");
    }

    #[test]
    fn test_encode_pool_liquidation() {
        let calldata = encode_pool_liquidation(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
            U256::from(1000),
            true,
        );
        let decoded = IPool::liquidationCallCall::abi_decode(&calldata, true).unwrap();
        assert_eq!(decoded.user, Address::repeat_byte(3));
        assert_eq!(decoded.debtToCover, U256::from(1000));
        assert!(decoded.receiveAToken);
    }

    #[test]
    fn test_encode_flash_loan_modes() {
        let calldata = encode_flash_loan(
            Address::repeat_byte(9),
            vec![Address::repeat_byte(1)],
            vec![U256::from(1000)],
            &[0],
            Address::repeat_byte(9),
            Bytes::from(vec![0xde, 0xad]),
            7,
        );
        let decoded = IPool::flashLoanCall::abi_decode(&calldata, true).unwrap();
        assert_eq!(decoded.interestRateModes, vec![U256::ZERO]);
        assert_eq!(decoded.referralCode, 7);
        assert_eq!(decoded.params, Bytes::from(vec![0xde, 0xad]));
    }
}
