use {
    crate::{
        abi::IERC20,
        storage::{
            StorageProvider,
            slots::{address_slot, double_mapping_slot},
        },
        token::TransferError,
    },
    alloy::{
        primitives::{Address, U256},
        sol_types::SolEvent,
    },
};

mod slots {
    use {crate::storage::slots::to_u256, alloy::primitives::U256};

    pub const BALANCES: U256 = to_u256(0);
    pub const ALLOWANCES: U256 = to_u256(1);
    pub const TOTAL_SUPPLY: U256 = to_u256(2);
    pub const NAME: U256 = to_u256(3);
    pub const SYMBOL: U256 = to_u256(4);
}

/// Marker stored as the code of deployed tokens.
const TOKEN_CODE: &[u8] = b"ERC20";

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Erc20Error {
    #[error("string {0:?} does not fit into a single slot")]
    StringTooLong(String),
    #[error("invalid approver {0}")]
    InvalidApprover(Address),
    #[error("invalid spender {0}")]
    InvalidSpender(Address),
    #[error("total supply overflows")]
    SupplyOverflow,
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// ERC-20 token whose state lives in the slots of `token_address`.
#[derive(Debug)]
pub struct Erc20Token<'a, S: StorageProvider> {
    token_address: Address,
    storage: &'a mut S,
}

impl<'a, S: StorageProvider> Erc20Token<'a, S> {
    pub fn new(token_address: Address, storage: &'a mut S) -> Self {
        Self {
            token_address,
            storage,
        }
    }

    /// Deploys the token at its address.
    pub fn initialize(&mut self, name: &str, symbol: &str) -> Result<(), Erc20Error> {
        self.write_string(slots::NAME, name)?;
        self.write_string(slots::SYMBOL, symbol)?;
        self.storage.set_code(self.token_address, TOKEN_CODE.to_vec());
        Ok(())
    }

    pub fn name(&mut self) -> String {
        self.read_string(slots::NAME)
    }

    pub fn symbol(&mut self) -> String {
        self.read_string(slots::SYMBOL)
    }

    pub fn total_supply(&mut self) -> U256 {
        self.storage.sload(self.token_address, slots::TOTAL_SUPPLY)
    }

    pub fn balance_of(&mut self, account: &Address) -> U256 {
        self.storage
            .sload(self.token_address, address_slot(*account, slots::BALANCES))
    }

    pub fn allowance(&mut self, owner: &Address, spender: &Address) -> U256 {
        self.storage.sload(
            self.token_address,
            double_mapping_slot(owner, spender, slots::ALLOWANCES),
        )
    }

    pub fn mint(&mut self, to: &Address, amount: U256) -> Result<(), Erc20Error> {
        if to.is_zero() {
            return Err(TransferError::InvalidReceiver(*to).into());
        }
        let supply = self
            .total_supply()
            .checked_add(amount)
            .ok_or(Erc20Error::SupplyOverflow)?;
        self.storage
            .sstore(self.token_address, slots::TOTAL_SUPPLY, supply);
        // Balances can't overflow because they are bounded by the supply.
        let balance = self.balance_of(to) + amount;
        self.set_balance(to, balance);
        self.emit_transfer(Address::ZERO, *to, amount);
        Ok(())
    }

    pub fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: U256,
    ) -> Result<bool, Erc20Error> {
        if owner.is_zero() {
            return Err(Erc20Error::InvalidApprover(*owner));
        }
        if spender.is_zero() {
            return Err(Erc20Error::InvalidSpender(*spender));
        }
        self.set_allowance(owner, spender, amount);
        self.storage.emit_event(
            self.token_address,
            IERC20::Approval {
                owner: *owner,
                spender: *spender,
                value: amount,
            }
            .encode_log_data(),
        );
        Ok(true)
    }

    pub fn transfer(
        &mut self,
        msg_sender: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<bool, TransferError> {
        self.move_balance(msg_sender, to, amount)?;
        Ok(true)
    }

    /// Checks the allowance of `msg_sender` before moving the balance. The
    /// allowance is only spent once the balance has moved.
    pub fn transfer_from(
        &mut self,
        msg_sender: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<bool, TransferError> {
        let allowed = self.allowance(from, msg_sender);
        if amount > allowed {
            return Err(TransferError::InsufficientAllowance {
                spender: *msg_sender,
                allowance: allowed,
                needed: amount,
            });
        }

        self.move_balance(from, to, amount)?;
        if allowed != U256::MAX {
            self.set_allowance(from, msg_sender, allowed - amount);
        }
        Ok(true)
    }

    fn move_balance(
        &mut self,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), TransferError> {
        if from.is_zero() {
            return Err(TransferError::InvalidSender(*from));
        }
        if to.is_zero() {
            return Err(TransferError::InvalidReceiver(*to));
        }

        let from_balance = self.balance_of(from);
        if amount > from_balance {
            return Err(TransferError::InsufficientBalance {
                sender: *from,
                balance: from_balance,
                needed: amount,
            });
        }
        self.set_balance(from, from_balance - amount);
        let to_balance = self.balance_of(to) + amount;
        self.set_balance(to, to_balance);

        self.emit_transfer(*from, *to, amount);
        Ok(())
    }

    fn emit_transfer(&mut self, from: Address, to: Address, value: U256) {
        self.storage.emit_event(
            self.token_address,
            IERC20::Transfer { from, to, value }.encode_log_data(),
        );
    }

    fn set_balance(&mut self, account: &Address, balance: U256) {
        self.storage.sstore(
            self.token_address,
            address_slot(*account, slots::BALANCES),
            balance,
        );
    }

    fn set_allowance(&mut self, owner: &Address, spender: &Address, amount: U256) {
        self.storage.sstore(
            self.token_address,
            double_mapping_slot(owner, spender, slots::ALLOWANCES),
            amount,
        );
    }

    /// Reads a short string (at most 31 bytes) stored Solidity style: the
    /// bytes left aligned and twice the length in the last byte.
    fn read_string(&mut self, slot: U256) -> String {
        let bytes = self
            .storage
            .sload(self.token_address, slot)
            .to_be_bytes::<32>();
        let len = (usize::from(bytes[31]) / 2).min(31);
        String::from_utf8_lossy(&bytes[..len]).into_owned()
    }

    fn write_string(&mut self, slot: U256, value: &str) -> Result<(), Erc20Error> {
        let bytes = value.as_bytes();
        if bytes.len() > 31 {
            return Err(Erc20Error::StringTooLong(value.to_string()));
        }
        let mut word = [0u8; 32];
        word[..bytes.len()].copy_from_slice(bytes);
        word[31] = u8::try_from(bytes.len() * 2).unwrap_or(u8::MAX);
        self.storage
            .sstore(self.token_address, slot, U256::from_be_bytes(word));
        Ok(())
    }
}
