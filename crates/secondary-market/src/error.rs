use {
    crate::{
        abi::{IERC20, ISecondaryMarket, ISecondaryMarketEngine, ISecondaryMarketNonce},
        token::TransferError,
    },
    alloy::{
        primitives::{B256, Bytes, U256},
        sol_types::SolError,
    },
    model::{order::ReplayScheme, signature::SignatureError},
};

/// Reasons a market operation reverts. Every error leaves the ledger as it
/// was before the operation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MarketError {
    #[error("maker is the zero address")]
    InvalidMaker,
    #[error("maker token is the zero address")]
    InvalidMakerToken,
    #[error("taker token is the zero address")]
    InvalidTakerToken,
    #[error("maker amount is zero")]
    InvalidMakerAmount,
    #[error("taker amount is zero")]
    InvalidTakerAmount,
    #[error("order nonce {provided} does not match the maker's nonce {expected}")]
    InvalidNonce { expected: U256, provided: U256 },
    #[error("order {0} was cancelled")]
    OrderAlreadyCancelled(B256),
    #[error("order {0} was already filled")]
    OrderAlreadyFilled(B256),
    #[error("order is not signed by its maker")]
    InvalidSignature,
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("order replay guard does not belong to the {0} scheme")]
    ReplayGuardMismatch(ReplayScheme),
    #[error("orders can't be cancelled with nonce replay protection")]
    CancellationUnsupported,
    #[error("reentrant call")]
    ReentrantCall,
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Coarse classification of [`MarketError`]s for callers deciding how to
/// react to a revert.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCategory {
    /// The order itself is malformed.
    Input,
    /// The signature is malformed or not the maker's.
    Authorization,
    /// The order can no longer be used in the current state.
    State,
    /// A token transfer failed. Topping up balances or allowances can make a
    /// retry succeed.
    Transfer,
}

impl ErrorCategory {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transfer)
    }
}

impl MarketError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidMaker
            | Self::InvalidMakerToken
            | Self::InvalidTakerToken
            | Self::InvalidMakerAmount
            | Self::InvalidTakerAmount
            | Self::ReplayGuardMismatch(_) => ErrorCategory::Input,
            Self::InvalidSignature | Self::Signature(_) => ErrorCategory::Authorization,
            Self::InvalidNonce { .. }
            | Self::OrderAlreadyCancelled(_)
            | Self::OrderAlreadyFilled(_)
            | Self::CancellationUnsupported
            | Self::ReentrantCall => ErrorCategory::State,
            Self::Transfer(_) => ErrorCategory::Transfer,
        }
    }

    /// Short name used as metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidMaker => "invalid_maker",
            Self::InvalidMakerToken => "invalid_maker_token",
            Self::InvalidTakerToken => "invalid_taker_token",
            Self::InvalidMakerAmount => "invalid_maker_amount",
            Self::InvalidTakerAmount => "invalid_taker_amount",
            Self::InvalidNonce { .. } => "invalid_nonce",
            Self::OrderAlreadyCancelled(_) => "order_already_cancelled",
            Self::OrderAlreadyFilled(_) => "order_already_filled",
            Self::InvalidSignature => "invalid_signature",
            Self::Signature(SignatureError::InvalidSignatureLength(_)) => {
                "invalid_signature_length"
            }
            Self::Signature(SignatureError::InvalidSignatureS(_)) => "invalid_signature_s",
            Self::Signature(SignatureError::InvalidSignature) => "invalid_signature",
            Self::ReplayGuardMismatch(_) => "replay_guard_mismatch",
            Self::CancellationUnsupported => "cancellation_unsupported",
            Self::ReentrantCall => "reentrant_call",
            Self::Transfer(TransferError::InsufficientBalance { .. }) => "insufficient_balance",
            Self::Transfer(TransferError::InsufficientAllowance { .. }) => {
                "insufficient_allowance"
            }
            Self::Transfer(_) => "transfer_failed",
        }
    }

    /// ABI encoded custom error the contract reverts with.
    pub fn revert_data(&self) -> Bytes {
        use {ISecondaryMarket as Market, ISecondaryMarketNonce as NonceMarket};

        let data = match self {
            Self::InvalidMaker => Market::SecondaryMarket__InvalidMaker {}.abi_encode(),
            Self::InvalidMakerToken => Market::SecondaryMarket__InvalidMakerToken {}.abi_encode(),
            Self::InvalidTakerToken => Market::SecondaryMarket__InvalidTakerToken {}.abi_encode(),
            Self::InvalidMakerAmount => {
                Market::SecondaryMarket__InvalidMakerAmount {}.abi_encode()
            }
            Self::InvalidTakerAmount => {
                Market::SecondaryMarket__InvalidTakerAmount {}.abi_encode()
            }
            Self::InvalidNonce { .. } => NonceMarket::SecondaryMarket__InvalidNonce {}.abi_encode(),
            Self::OrderAlreadyCancelled(hash) => {
                Market::SecondaryMarket__OrderAlreadyCancelled { orderHash: *hash }.abi_encode()
            }
            Self::OrderAlreadyFilled(hash) => {
                Market::SecondaryMarket__OrderAlreadyFilled { orderHash: *hash }.abi_encode()
            }
            Self::InvalidSignature => Market::SecondaryMarket__InvalidSignature {}.abi_encode(),
            Self::Signature(SignatureError::InvalidSignatureLength(length)) => {
                Market::ECDSAInvalidSignatureLength {
                    length: U256::from(*length),
                }
                .abi_encode()
            }
            Self::Signature(SignatureError::InvalidSignatureS(s)) => {
                Market::ECDSAInvalidSignatureS { s: *s }.abi_encode()
            }
            Self::Signature(SignatureError::InvalidSignature) => {
                Market::ECDSAInvalidSignature {}.abi_encode()
            }
            Self::ReplayGuardMismatch(_) => {
                ISecondaryMarketEngine::SecondaryMarket__InvalidReplayGuard {}.abi_encode()
            }
            Self::CancellationUnsupported => {
                NonceMarket::SecondaryMarket__CancellationUnsupported {}.abi_encode()
            }
            Self::ReentrantCall => Market::ReentrancyGuardReentrantCall {}.abi_encode(),
            Self::Transfer(err) => return transfer_revert_data(err),
        };
        data.into()
    }
}

/// Token reverts bubble up unchanged through the market.
fn transfer_revert_data(err: &TransferError) -> Bytes {
    let data = match err {
        TransferError::InsufficientBalance {
            sender,
            balance,
            needed,
        } => IERC20::ERC20InsufficientBalance {
            sender: *sender,
            balance: *balance,
            needed: *needed,
        }
        .abi_encode(),
        TransferError::InsufficientAllowance {
            spender,
            allowance,
            needed,
        } => IERC20::ERC20InsufficientAllowance {
            spender: *spender,
            allowance: *allowance,
            needed: *needed,
        }
        .abi_encode(),
        TransferError::InvalidSender(sender) => {
            IERC20::ERC20InvalidSender { sender: *sender }.abi_encode()
        }
        TransferError::InvalidReceiver(receiver) => {
            IERC20::ERC20InvalidReceiver {
                receiver: *receiver,
            }
            .abi_encode()
        }
        TransferError::TransferFailed(token) => {
            ISecondaryMarket::SafeERC20FailedOperation { token: *token }.abi_encode()
        }
    };
    data.into()
}
