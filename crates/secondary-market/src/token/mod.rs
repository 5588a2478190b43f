pub mod erc20;

pub use erc20::Erc20Token;
use {
    crate::storage::StorageProvider,
    alloy::primitives::{Address, U256},
};

/// Movement of `amount` of `token` from `from` to `to`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Transfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransferError {
    #[error("{sender} holds {balance} but {needed} are needed")]
    InsufficientBalance {
        sender: Address,
        balance: U256,
        needed: U256,
    },
    #[error("{spender} is allowed {allowance} but {needed} are needed")]
    InsufficientAllowance {
        spender: Address,
        allowance: U256,
        needed: U256,
    },
    #[error("invalid sender {0}")]
    InvalidSender(Address),
    #[error("invalid receiver {0}")]
    InvalidReceiver(Address),
    #[error("transfer of token {0} failed")]
    TransferFailed(Address),
}

/// Moves tokens on behalf of `spender`, the account holding the allowance.
///
/// Implementations get the same storage the market runs on, so a token can
/// call back into the market while a transfer is in progress.
#[cfg_attr(test, mockall::automock)]
pub trait TokenTransfer<S: StorageProvider + 'static> {
    fn transfer_from(
        &self,
        storage: &mut S,
        spender: Address,
        transfer: Transfer,
    ) -> Result<(), TransferError>;
}

/// Transfers through [`Erc20Token`] contracts living in the same storage.
#[derive(Clone, Copy, Debug, Default)]
pub struct Erc20Transfers;

impl<S: StorageProvider + 'static> TokenTransfer<S> for Erc20Transfers {
    fn transfer_from(
        &self,
        storage: &mut S,
        spender: Address,
        transfer: Transfer,
    ) -> Result<(), TransferError> {
        // Calls to accounts without code succeed on chain without doing anything.
        if !storage.has_code(transfer.token) {
            return Err(TransferError::TransferFailed(transfer.token));
        }
        let transferred = Erc20Token::new(transfer.token, storage).transfer_from(
            &spender,
            &transfer.from,
            &transfer.to,
            transfer.amount,
        )?;
        if !transferred {
            return Err(TransferError::TransferFailed(transfer.token));
        }
        Ok(())
    }
}
