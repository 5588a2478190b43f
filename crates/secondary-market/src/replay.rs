//! Strategies that stop a signed order from being settled more than once.

use {
    crate::{
        error::MarketError,
        storage::{
            StorageProvider,
            slots::{address_slot, hash_slot},
        },
    },
    alloy::primitives::{Address, B256, U256},
    model::order::{OrderStatus, ReplayGuard, ReplayScheme, SwapOrder},
};

/// Storage layout of the market. Slot 0 holds the reentrancy status.
mod slots {
    use {crate::storage::slots::to_u256, alloy::primitives::U256};

    pub const NONCES: U256 = to_u256(1);
    pub const ORDER_STATUS: U256 = to_u256(2);
}

/// Replay state of a market deployment, kept in the market's storage.
pub trait ReplayProtection: std::fmt::Debug + Send + Sync {
    fn scheme(&self) -> ReplayScheme;

    /// Fails if the order can't be settled anymore.
    fn check(
        &self,
        storage: &mut dyn StorageProvider,
        market: Address,
        order: &SwapOrder,
        order_hash: B256,
    ) -> Result<(), MarketError>;

    /// Marks the order as used. Only called after [`Self::check`] passed.
    fn consume(
        &self,
        storage: &mut dyn StorageProvider,
        market: Address,
        order: &SwapOrder,
        order_hash: B256,
    );

    /// Makes the order permanently unusable.
    fn cancel(
        &self,
        storage: &mut dyn StorageProvider,
        market: Address,
        order: &SwapOrder,
        order_hash: B256,
    ) -> Result<(), MarketError>;
}

/// Returns the strategy implementing `scheme`.
pub fn protection(scheme: ReplayScheme) -> &'static dyn ReplayProtection {
    match scheme {
        ReplayScheme::Nonce => &NonceProtection,
        ReplayScheme::Salt => &SaltProtection,
    }
}

pub fn nonce(storage: &mut dyn StorageProvider, market: Address, maker: Address) -> U256 {
    storage.sload(market, address_slot(maker, slots::NONCES))
}

pub fn order_status(
    storage: &mut dyn StorageProvider,
    market: Address,
    order_hash: B256,
) -> OrderStatus {
    OrderStatus::from(storage.sload(market, hash_slot(order_hash, slots::ORDER_STATUS)))
}

fn set_order_status(
    storage: &mut dyn StorageProvider,
    market: Address,
    order_hash: B256,
    status: OrderStatus,
) {
    storage.sstore(
        market,
        hash_slot(order_hash, slots::ORDER_STATUS),
        status.into(),
    );
}

/// Orders carry the maker's current nonce; settling increments it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonceProtection;

impl ReplayProtection for NonceProtection {
    fn scheme(&self) -> ReplayScheme {
        ReplayScheme::Nonce
    }

    fn check(
        &self,
        storage: &mut dyn StorageProvider,
        market: Address,
        order: &SwapOrder,
        _: B256,
    ) -> Result<(), MarketError> {
        let ReplayGuard::Nonce(provided) = order.replay_guard else {
            return Err(MarketError::ReplayGuardMismatch(ReplayScheme::Nonce));
        };
        let expected = nonce(storage, market, order.maker);
        if provided != expected {
            return Err(MarketError::InvalidNonce { expected, provided });
        }
        Ok(())
    }

    fn consume(
        &self,
        storage: &mut dyn StorageProvider,
        market: Address,
        order: &SwapOrder,
        _: B256,
    ) {
        let next = nonce(storage, market, order.maker) + U256::from(1);
        storage.sstore(market, address_slot(order.maker, slots::NONCES), next);
    }

    fn cancel(
        &self,
        _: &mut dyn StorageProvider,
        _: Address,
        _: &SwapOrder,
        _: B256,
    ) -> Result<(), MarketError> {
        Err(MarketError::CancellationUnsupported)
    }
}

/// Orders carry a salt; the status of every order hash is tracked.
#[derive(Clone, Copy, Debug, Default)]
pub struct SaltProtection;

impl ReplayProtection for SaltProtection {
    fn scheme(&self) -> ReplayScheme {
        ReplayScheme::Salt
    }

    fn check(
        &self,
        storage: &mut dyn StorageProvider,
        market: Address,
        order: &SwapOrder,
        order_hash: B256,
    ) -> Result<(), MarketError> {
        if order.replay_guard.scheme() != ReplayScheme::Salt {
            return Err(MarketError::ReplayGuardMismatch(ReplayScheme::Salt));
        }
        match order_status(storage, market, order_hash) {
            OrderStatus::None => Ok(()),
            OrderStatus::Filled => Err(MarketError::OrderAlreadyFilled(order_hash)),
            OrderStatus::Cancelled => Err(MarketError::OrderAlreadyCancelled(order_hash)),
        }
    }

    fn consume(
        &self,
        storage: &mut dyn StorageProvider,
        market: Address,
        _: &SwapOrder,
        order_hash: B256,
    ) {
        set_order_status(storage, market, order_hash, OrderStatus::Filled);
    }

    fn cancel(
        &self,
        storage: &mut dyn StorageProvider,
        market: Address,
        order: &SwapOrder,
        order_hash: B256,
    ) -> Result<(), MarketError> {
        self.check(storage, market, order, order_hash)?;
        set_order_status(storage, market, order_hash, OrderStatus::Cancelled);
        Ok(())
    }
}
