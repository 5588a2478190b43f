//! Settlement of signed swap orders.
//!
//! A taker submits an order signed by its maker. The market checks the order,
//! its replay state and the signature, then swaps the two token amounts
//! between maker and taker using the allowances both granted to the market.
//! Either both transfers happen or none.

use {
    crate::{
        abi::{ISecondaryMarket, ISecondaryMarketNonce},
        config::Deployment,
        error::MarketError,
        metrics::Metrics,
        replay::{self, ReplayProtection},
        storage::{self, StorageProvider, slots::to_u256},
        token::{Erc20Transfers, TokenTransfer, Transfer},
    },
    alloy::{
        primitives::{Address, B256, U256},
        sol_types::SolEvent,
    },
    model::{
        Domain,
        DomainSeparator,
        order::{OrderStatus, ReplayGuard, ReplayScheme, SwapOrder},
    },
};

/// Slot of the reentrancy status. Zero and [`NOT_ENTERED`] both mean no
/// settlement is in progress.
const REENTRANCY_STATUS: U256 = to_u256(0);
const NOT_ENTERED: U256 = to_u256(1);
const ENTERED: U256 = to_u256(2);

/// A market deployment bound to the ledger it runs on.
pub struct SecondaryMarket<'a, S: StorageProvider + 'static, T = Erc20Transfers> {
    deployment: Deployment,
    storage: &'a mut S,
    tokens: T,
}

impl<'a, S, T> SecondaryMarket<'a, S, T>
where
    S: StorageProvider + 'static,
    T: TokenTransfer<S>,
{
    pub fn new(deployment: Deployment, storage: &'a mut S, tokens: T) -> Self {
        Self {
            deployment,
            storage,
            tokens,
        }
    }

    pub fn address(&self) -> Address {
        self.deployment.address
    }

    pub fn scheme(&self) -> ReplayScheme {
        self.deployment.replay_protection
    }

    /// The EIP-712 domain orders for this market are signed under.
    pub fn eip712_domain(&self) -> Domain {
        Domain::new(self.storage.chain_id(), self.address())
    }

    pub fn domain_separator(&self) -> DomainSeparator {
        self.eip712_domain().separator()
    }

    /// EIP-712 digest of the order. Salted orders are tracked under it.
    pub fn order_hash(&self, order: &SwapOrder) -> B256 {
        order.signing_hash(&self.domain_separator())
    }

    /// Nonce the next order of `maker` has to carry.
    pub fn get_nonce(&mut self, maker: Address) -> U256 {
        replay::nonce(&mut *self.storage, self.deployment.address, maker)
    }

    pub fn get_order_status(&mut self, order_hash: B256) -> OrderStatus {
        replay::order_status(&mut *self.storage, self.deployment.address, order_hash)
    }

    /// Settles `order` with `taker` as counterparty.
    ///
    /// On success the maker's tokens moved to the taker, the taker's tokens
    /// moved to the maker and the order can't be settled again. On failure
    /// nothing changed.
    pub fn execute_swap(
        &mut self,
        taker: Address,
        order: &SwapOrder,
        signature: &[u8],
    ) -> Result<(), MarketError> {
        let result = self.non_reentrant(|market| market.settle(taker, order, signature));
        match &result {
            Ok(order_hash) => {
                tracing::debug!(?order_hash, maker = %order.maker, %taker, "settled swap order");
                Metrics::swap(self.scheme());
            }
            Err(err) => {
                tracing::debug!(?err, maker = %order.maker, %taker, "rejected swap order");
                Metrics::rejection("execute_swap", err);
            }
        }
        result.map(|_| ())
    }

    /// Makes a salted order permanently unfillable. Only its maker can do so.
    pub fn cancel_order(&mut self, caller: Address, order: &SwapOrder) -> Result<(), MarketError> {
        let order_hash = self.order_hash(order);
        let market = self.deployment.address;
        let protection = replay::protection(self.scheme());
        let result = storage::atomically(&mut *self.storage, |storage| {
            if caller != order.maker {
                return Err(MarketError::InvalidMaker);
            }
            protection.cancel(&mut *storage, market, order, order_hash)?;
            if let ReplayGuard::Salt(salt) = &order.replay_guard {
                let event = ISecondaryMarket::OrderCancelled {
                    maker: order.maker,
                    makerToken: order.maker_token,
                    salt: salt.clone(),
                    makerAmount: order.maker_amount,
                    takerToken: order.taker_token,
                    takerAmount: order.taker_amount,
                };
                storage.emit_event(market, event.encode_log_data());
            }
            Ok(())
        });
        match &result {
            Ok(()) => {
                tracing::debug!(?order_hash, maker = %order.maker, "cancelled order");
                Metrics::cancellation(self.scheme());
            }
            Err(err) => {
                tracing::debug!(?err, ?order_hash, %caller, "rejected order cancellation");
                Metrics::rejection("cancel_order", err);
            }
        }
        result
    }

    /// Runs `f` with the reentrancy guard held. Everything `f` wrote is undone
    /// if it fails.
    fn non_reentrant<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, MarketError>,
    ) -> Result<R, MarketError> {
        let market = self.deployment.address;
        if self.storage.sload(market, REENTRANCY_STATUS) == ENTERED {
            return Err(MarketError::ReentrantCall);
        }

        let label = market.to_string();
        let checkpoint = self.storage.checkpoint();
        self.storage.sstore(market, REENTRANCY_STATUS, ENTERED);
        Metrics::settling(&label, true);
        let result = f(self);
        Metrics::settling(&label, false);
        match result {
            Ok(value) => {
                self.storage.sstore(market, REENTRANCY_STATUS, NOT_ENTERED);
                self.storage.commit(checkpoint);
                Ok(value)
            }
            Err(err) => {
                self.storage.revert(checkpoint);
                Err(err)
            }
        }
    }

    /// Checks, effects, then interactions. Returns the settled order's hash.
    fn settle(
        &mut self,
        taker: Address,
        order: &SwapOrder,
        signature: &[u8],
    ) -> Result<B256, MarketError> {
        validate(order)?;

        let market = self.deployment.address;
        let order_hash = self.order_hash(order);
        let protection: &dyn ReplayProtection = replay::protection(self.scheme());
        protection.check(&mut *self.storage, market, order, order_hash)?;

        let signer = order.recover_signer(&self.domain_separator(), signature)?;
        if signer != order.maker {
            return Err(MarketError::InvalidSignature);
        }

        protection.consume(&mut *self.storage, market, order, order_hash);

        self.tokens.transfer_from(
            self.storage,
            market,
            Transfer {
                token: order.maker_token,
                from: order.maker,
                to: taker,
                amount: order.maker_amount,
            },
        )?;
        self.tokens.transfer_from(
            self.storage,
            market,
            Transfer {
                token: order.taker_token,
                from: taker,
                to: order.maker,
                amount: order.taker_amount,
            },
        )?;

        let event = match &order.replay_guard {
            ReplayGuard::Salt(salt) => ISecondaryMarket::SwapExecuted {
                maker: order.maker,
                taker,
                salt: salt.clone(),
                makerToken: order.maker_token,
                makerAmount: order.maker_amount,
                takerToken: order.taker_token,
                takerAmount: order.taker_amount,
            }
            .encode_log_data(),
            ReplayGuard::Nonce(nonce) => ISecondaryMarketNonce::SwapExecuted {
                maker: order.maker,
                taker,
                nonce: *nonce,
                makerToken: order.maker_token,
                makerAmount: order.maker_amount,
                takerToken: order.taker_token,
                takerAmount: order.taker_amount,
            }
            .encode_log_data(),
        };
        self.storage.emit_event(market, event);

        Ok(order_hash)
    }
}

/// Field checks, in the order their errors take precedence.
fn validate(order: &SwapOrder) -> Result<(), MarketError> {
    if order.maker.is_zero() {
        return Err(MarketError::InvalidMaker);
    }
    if order.maker_token.is_zero() {
        return Err(MarketError::InvalidMakerToken);
    }
    if order.taker_token.is_zero() {
        return Err(MarketError::InvalidTakerToken);
    }
    if order.maker_amount.is_zero() {
        return Err(MarketError::InvalidMakerAmount);
    }
    if order.taker_amount.is_zero() {
        return Err(MarketError::InvalidTakerAmount);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            storage::hashmap::HashMapStorageProvider,
            token::{Erc20Token, MockTokenTransfer, TransferError},
        },
        alloy::{
            primitives::address,
            signers::local::PrivateKeySigner,
        },
        model::{
            order::{OrderBuilder, SignedSwapOrder},
            signature::SignatureError,
        },
        rstest::rstest,
        std::{cell::RefCell, rc::Rc},
    };

    const CHAIN_ID: u64 = 31337;
    const MARKET: Address = address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
    const TOKEN_A: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    const TOKEN_B: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
    const TAKER: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

    fn maker() -> PrivateKeySigner {
        // default anvil account #1
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
            .parse()
            .unwrap()
    }

    fn deployment(scheme: ReplayScheme) -> Deployment {
        Deployment {
            address: MARKET,
            replay_protection: scheme,
        }
    }

    /// Maker holds 1000 A and approved 100, taker holds 1000 B and approved
    /// 200.
    fn ledger() -> HashMapStorageProvider {
        let mut storage = HashMapStorageProvider::new(CHAIN_ID);
        let maker = maker().address();
        for (token, symbol, owner, approved) in [
            (TOKEN_A, "A", maker, 100),
            (TOKEN_B, "B", TAKER, 200),
        ] {
            let mut erc20 = Erc20Token::new(token, &mut storage);
            erc20.initialize(symbol, symbol).unwrap();
            erc20.mint(&owner, U256::from(1000)).unwrap();
            erc20.approve(&owner, &MARKET, U256::from(approved)).unwrap();
        }
        storage
    }

    fn approve(storage: &mut HashMapStorageProvider, token: Address, owner: Address, amount: u64) {
        Erc20Token::new(token, storage)
            .approve(&owner, &MARKET, U256::from(amount))
            .unwrap();
    }

    fn balance(storage: &mut HashMapStorageProvider, token: Address, account: Address) -> U256 {
        Erc20Token::new(token, storage).balance_of(&account)
    }

    fn order(replay_guard: ReplayGuard) -> OrderBuilder {
        let builder = OrderBuilder::default()
            .with_maker(maker().address())
            .with_maker_token(TOKEN_A)
            .with_maker_amount(U256::from(100))
            .with_taker_token(TOKEN_B)
            .with_taker_amount(U256::from(200));
        match replay_guard {
            ReplayGuard::Nonce(nonce) => builder.with_nonce(nonce),
            ReplayGuard::Salt(salt) => builder.with_salt(salt),
        }
    }

    fn guard(scheme: ReplayScheme) -> ReplayGuard {
        match scheme {
            ReplayScheme::Nonce => ReplayGuard::Nonce(U256::ZERO),
            ReplayScheme::Salt => ReplayGuard::Salt("order-1".to_string()),
        }
    }

    fn signed(builder: OrderBuilder) -> (SwapOrder, Vec<u8>) {
        let SignedSwapOrder { order, signature } = builder
            .sign_with(&DomainSeparator::new(CHAIN_ID, MARKET), &maker())
            .unwrap();
        (order, signature.to_bytes().to_vec())
    }

    #[rstest]
    fn settles_signed_order(#[values(ReplayScheme::Salt, ReplayScheme::Nonce)] scheme: ReplayScheme) {
        observe::tracing::initialize_reentrant("secondary_market=debug");
        let mut storage = ledger();
        let (order, signature) = signed(order(guard(scheme)));
        let maker = order.maker;

        let mut market = SecondaryMarket::new(deployment(scheme), &mut storage, Erc20Transfers);
        market.execute_swap(TAKER, &order, &signature).unwrap();
        let order_hash = market.order_hash(&order);
        match scheme {
            ReplayScheme::Salt => {
                assert_eq!(market.get_order_status(order_hash), OrderStatus::Filled);
                assert_eq!(market.get_nonce(maker), U256::ZERO);
            }
            ReplayScheme::Nonce => {
                assert_eq!(market.get_order_status(order_hash), OrderStatus::None);
                assert_eq!(market.get_nonce(maker), U256::from(1));
            }
        }

        assert_eq!(balance(&mut storage, TOKEN_A, maker), U256::from(900));
        assert_eq!(balance(&mut storage, TOKEN_A, TAKER), U256::from(100));
        assert_eq!(balance(&mut storage, TOKEN_B, maker), U256::from(200));
        assert_eq!(balance(&mut storage, TOKEN_B, TAKER), U256::from(800));

        let expected = match scheme {
            ReplayScheme::Salt => ISecondaryMarket::SwapExecuted {
                maker,
                taker: TAKER,
                salt: "order-1".to_string(),
                makerToken: TOKEN_A,
                makerAmount: U256::from(100),
                takerToken: TOKEN_B,
                takerAmount: U256::from(200),
            }
            .encode_log_data(),
            ReplayScheme::Nonce => ISecondaryMarketNonce::SwapExecuted {
                maker,
                taker: TAKER,
                nonce: U256::ZERO,
                makerToken: TOKEN_A,
                makerAmount: U256::from(100),
                takerToken: TOKEN_B,
                takerAmount: U256::from(200),
            }
            .encode_log_data(),
        };
        assert_eq!(storage.events[&MARKET], vec![expected]);
        // guard released
        assert_eq!(storage.sload(MARKET, REENTRANCY_STATUS), NOT_ENTERED);
    }

    #[rstest]
    #[case::salt(ReplayScheme::Salt)]
    #[case::nonce(ReplayScheme::Nonce)]
    fn settled_orders_cannot_be_replayed(#[case] scheme: ReplayScheme) {
        let mut storage = ledger();
        let (order, signature) = signed(order(guard(scheme)));
        let maker = order.maker;

        SecondaryMarket::new(deployment(scheme), &mut storage, Erc20Transfers)
            .execute_swap(TAKER, &order, &signature)
            .unwrap();
        approve(&mut storage, TOKEN_A, maker, 100);
        approve(&mut storage, TOKEN_B, TAKER, 200);

        let mut market = SecondaryMarket::new(deployment(scheme), &mut storage, Erc20Transfers);
        let expected = match scheme {
            ReplayScheme::Salt => MarketError::OrderAlreadyFilled(market.order_hash(&order)),
            ReplayScheme::Nonce => MarketError::InvalidNonce {
                expected: U256::from(1),
                provided: U256::ZERO,
            },
        };
        assert_eq!(market.execute_swap(TAKER, &order, &signature), Err(expected));

        assert_eq!(balance(&mut storage, TOKEN_A, maker), U256::from(900));
        assert_eq!(balance(&mut storage, TOKEN_B, maker), U256::from(200));
        assert_eq!(storage.events[&MARKET].len(), 1);
    }

    #[test]
    fn nonce_orders_settle_in_sequence() {
        let mut storage = ledger();
        approve(&mut storage, TOKEN_A, maker().address(), 1000);
        approve(&mut storage, TOKEN_B, TAKER, 1000);
        let (first, first_signature) = signed(order(ReplayGuard::Nonce(U256::ZERO)));
        let (second, second_signature) = signed(order(ReplayGuard::Nonce(U256::from(1))));

        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Nonce), &mut storage, Erc20Transfers);
        assert_eq!(
            market.execute_swap(TAKER, &second, &second_signature),
            Err(MarketError::InvalidNonce {
                expected: U256::ZERO,
                provided: U256::from(1),
            })
        );
        market.execute_swap(TAKER, &first, &first_signature).unwrap();
        market.execute_swap(TAKER, &second, &second_signature).unwrap();
        assert_eq!(market.get_nonce(first.maker), U256::from(2));
    }

    #[rstest]
    #[case::maker(|o: &mut SwapOrder| o.maker = Address::ZERO, MarketError::InvalidMaker)]
    #[case::maker_token(|o: &mut SwapOrder| o.maker_token = Address::ZERO, MarketError::InvalidMakerToken)]
    #[case::taker_token(|o: &mut SwapOrder| o.taker_token = Address::ZERO, MarketError::InvalidTakerToken)]
    #[case::maker_amount(|o: &mut SwapOrder| o.maker_amount = U256::ZERO, MarketError::InvalidMakerAmount)]
    #[case::taker_amount(|o: &mut SwapOrder| o.taker_amount = U256::ZERO, MarketError::InvalidTakerAmount)]
    #[case::first_failing_check_wins(
        |o: &mut SwapOrder| {
            o.taker_token = Address::ZERO;
            o.maker_amount = U256::ZERO;
        },
        MarketError::InvalidTakerToken
    )]
    fn rejects_malformed_orders(#[case] mutate: fn(&mut SwapOrder), #[case] expected: MarketError) {
        let mut storage = HashMapStorageProvider::new(CHAIN_ID);
        let (mut order, signature) = signed(order(guard(ReplayScheme::Salt)));
        mutate(&mut order);

        let mut tokens = MockTokenTransfer::new();
        tokens.expect_transfer_from().never();
        let mut market = SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, tokens);
        assert_eq!(market.execute_swap(TAKER, &order, &signature), Err(expected));
    }

    #[test]
    fn rejects_orders_signed_by_someone_else() {
        let mut storage = ledger();
        let other: PrivateKeySigner =
            "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a"
                .parse()
                .unwrap();
        let (order, _) = signed(order(guard(ReplayScheme::Salt)));
        let signature = order
            .sign(&DomainSeparator::new(CHAIN_ID, MARKET), &other)
            .unwrap()
            .to_bytes();

        let mut tokens = MockTokenTransfer::new();
        tokens.expect_transfer_from().never();
        let mut market = SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, tokens);
        assert_eq!(
            market.execute_swap(TAKER, &order, &signature),
            Err(MarketError::InvalidSignature)
        );
        assert_eq!(
            market.get_order_status(market.order_hash(&order)),
            OrderStatus::None
        );
    }

    #[test]
    fn rejects_orders_signed_for_another_market() {
        let mut storage = ledger();
        let (order, _) = signed(order(guard(ReplayScheme::Salt)));
        let signature = order
            .sign(&DomainSeparator::new(CHAIN_ID, TOKEN_A), &maker())
            .unwrap()
            .to_bytes();

        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers);
        assert_eq!(
            market.execute_swap(TAKER, &order, &signature),
            Err(MarketError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_malformed_signatures() {
        let mut storage = ledger();
        let (order, signature) = signed(order(guard(ReplayScheme::Salt)));
        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers);

        assert_eq!(
            market.execute_swap(TAKER, &order, &signature[..64]),
            Err(MarketError::Signature(
                SignatureError::InvalidSignatureLength(64)
            ))
        );
        let mut bad_v = signature.clone();
        bad_v[64] = 1;
        assert_eq!(
            market.execute_swap(TAKER, &order, &bad_v),
            Err(MarketError::Signature(SignatureError::InvalidSignature))
        );
        let mut high_s = signature;
        high_s[32] = 0xff;
        assert!(matches!(
            market.execute_swap(TAKER, &order, &high_s),
            Err(MarketError::Signature(SignatureError::InvalidSignatureS(_)))
        ));
    }

    #[test]
    fn replay_state_is_checked_before_signature() {
        let mut storage = ledger();
        let (order, signature) = signed(order(guard(ReplayScheme::Salt)));
        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers);
        market.cancel_order(order.maker, &order).unwrap();

        let order_hash = market.order_hash(&order);
        assert_eq!(
            market.execute_swap(TAKER, &order, &[0; 3]),
            Err(MarketError::OrderAlreadyCancelled(order_hash))
        );
        assert_eq!(
            market.execute_swap(TAKER, &order, &signature),
            Err(MarketError::OrderAlreadyCancelled(order_hash))
        );
    }

    #[rstest]
    #[case::salt_market(ReplayScheme::Salt, ReplayGuard::Nonce(U256::ZERO))]
    #[case::nonce_market(ReplayScheme::Nonce, ReplayGuard::Salt("order-1".to_string()))]
    fn rejects_foreign_replay_guards(#[case] scheme: ReplayScheme, #[case] guard: ReplayGuard) {
        let mut storage = ledger();
        let (order, signature) = signed(order(guard));
        let mut market = SecondaryMarket::new(deployment(scheme), &mut storage, Erc20Transfers);
        assert_eq!(
            market.execute_swap(TAKER, &order, &signature),
            Err(MarketError::ReplayGuardMismatch(scheme))
        );
    }

    #[test]
    fn failing_second_transfer_reverts_everything() {
        let mut storage = ledger();
        approve(&mut storage, TOKEN_B, TAKER, 199);
        let (order, signature) = signed(order(guard(ReplayScheme::Salt)));
        let maker = order.maker;
        let token_events = storage.events[&TOKEN_A].len();

        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers);
        assert_eq!(
            market.execute_swap(TAKER, &order, &signature),
            Err(MarketError::Transfer(TransferError::InsufficientAllowance {
                spender: MARKET,
                allowance: U256::from(199),
                needed: U256::from(200),
            }))
        );
        assert_eq!(
            market.get_order_status(market.order_hash(&order)),
            OrderStatus::None
        );

        assert_eq!(balance(&mut storage, TOKEN_A, maker), U256::from(1000));
        assert_eq!(balance(&mut storage, TOKEN_A, TAKER), U256::ZERO);
        assert_eq!(
            Erc20Token::new(TOKEN_A, &mut storage).allowance(&maker, &MARKET),
            U256::from(100)
        );
        assert_eq!(storage.events[&TOKEN_A].len(), token_events);
        assert!(!storage.events.contains_key(&MARKET));
        assert_eq!(storage.sload(MARKET, REENTRANCY_STATUS), U256::ZERO);

        // the order stays fillable once the taker approves enough
        approve(&mut storage, TOKEN_B, TAKER, 200);
        SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers)
            .execute_swap(TAKER, &order, &signature)
            .unwrap();
    }

    #[test]
    fn insufficient_maker_balance_is_a_transfer_error() {
        let mut storage = ledger();
        let (order, signature) = signed(order(guard(ReplayScheme::Nonce)).with_maker_amount(U256::from(2000)));
        approve(&mut storage, TOKEN_A, order.maker, 2000);

        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Nonce), &mut storage, Erc20Transfers);
        let err = market.execute_swap(TAKER, &order, &signature).unwrap_err();
        assert_eq!(
            err,
            MarketError::Transfer(TransferError::InsufficientBalance {
                sender: order.maker,
                balance: U256::from(1000),
                needed: U256::from(2000),
            })
        );
        assert!(err.category().is_retryable());
        assert_eq!(market.get_nonce(order.maker), U256::ZERO);
    }

    #[test]
    fn tokens_without_code_fail_the_swap() {
        let mut storage = ledger();
        let (order, signature) =
            signed(order(guard(ReplayScheme::Salt)).with_taker_token(Address::repeat_byte(0xee)));

        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers);
        assert_eq!(
            market.execute_swap(TAKER, &order, &signature),
            Err(MarketError::Transfer(TransferError::TransferFailed(
                Address::repeat_byte(0xee)
            )))
        );
        assert_eq!(balance(&mut storage, TOKEN_A, TAKER), U256::ZERO);
    }

    #[test]
    fn transfers_are_pulled_by_the_market() {
        let mut storage = HashMapStorageProvider::new(CHAIN_ID);
        let (order, signature) = signed(order(guard(ReplayScheme::Salt)));
        let maker = order.maker;

        let mut tokens = MockTokenTransfer::new();
        let mut sequence = mockall::Sequence::new();
        tokens
            .expect_transfer_from()
            .withf(move |_, spender, transfer| {
                *spender == MARKET
                    && *transfer
                        == Transfer {
                            token: TOKEN_A,
                            from: maker,
                            to: TAKER,
                            amount: U256::from(100),
                        }
            })
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| Ok(()));
        tokens
            .expect_transfer_from()
            .withf(move |_, spender, transfer| {
                *spender == MARKET
                    && *transfer
                        == Transfer {
                            token: TOKEN_B,
                            from: TAKER,
                            to: maker,
                            amount: U256::from(200),
                        }
            })
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| Ok(()));

        SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, tokens)
            .execute_swap(TAKER, &order, &signature)
            .unwrap();
    }

    /// Token that calls back into the market while its transfer runs.
    struct ReentrantTransfers {
        order: SwapOrder,
        signature: Vec<u8>,
        nested: Rc<RefCell<Vec<Result<(), MarketError>>>>,
    }

    impl TokenTransfer<HashMapStorageProvider> for ReentrantTransfers {
        fn transfer_from(
            &self,
            storage: &mut HashMapStorageProvider,
            spender: Address,
            transfer: Transfer,
        ) -> Result<(), TransferError> {
            if self.nested.borrow().is_empty() {
                let result = SecondaryMarket::new(
                    deployment(ReplayScheme::Salt),
                    storage,
                    Erc20Transfers,
                )
                .execute_swap(TAKER, &self.order, &self.signature);
                self.nested.borrow_mut().push(result);
            }
            Erc20Transfers.transfer_from(storage, spender, transfer)
        }
    }

    #[test]
    fn reentrant_settlement_is_rejected() {
        let mut storage = ledger();
        approve(&mut storage, TOKEN_A, maker().address(), 200);
        approve(&mut storage, TOKEN_B, TAKER, 400);
        let (outer, outer_signature) = signed(order(guard(ReplayScheme::Salt)));
        let (inner, inner_signature) = signed(order(ReplayGuard::Salt("order-2".to_string())));
        let nested = Rc::new(RefCell::new(Vec::new()));
        let tokens = ReentrantTransfers {
            order: inner.clone(),
            signature: inner_signature,
            nested: nested.clone(),
        };

        let mut market = SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, tokens);
        market.execute_swap(TAKER, &outer, &outer_signature).unwrap();
        assert_eq!(*nested.borrow(), vec![Err(MarketError::ReentrantCall)]);
        assert_eq!(
            market.get_order_status(market.order_hash(&inner)),
            OrderStatus::None
        );
        assert_eq!(balance(&mut storage, TOKEN_A, TAKER), U256::from(100));
    }

    #[test]
    fn makers_cancel_salted_orders() {
        let mut storage = ledger();
        let (order, signature) = signed(order(guard(ReplayScheme::Salt)));
        let maker = order.maker;

        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers);
        assert_eq!(
            market.cancel_order(TAKER, &order),
            Err(MarketError::InvalidMaker)
        );
        market.cancel_order(maker, &order).unwrap();
        let order_hash = market.order_hash(&order);
        assert_eq!(market.get_order_status(order_hash), OrderStatus::Cancelled);
        assert_eq!(
            market.cancel_order(maker, &order),
            Err(MarketError::OrderAlreadyCancelled(order_hash))
        );
        assert_eq!(
            market.execute_swap(TAKER, &order, &signature),
            Err(MarketError::OrderAlreadyCancelled(order_hash))
        );

        assert_eq!(
            storage.events[&MARKET],
            vec![
                ISecondaryMarket::OrderCancelled {
                    maker,
                    makerToken: TOKEN_A,
                    salt: "order-1".to_string(),
                    makerAmount: U256::from(100),
                    takerToken: TOKEN_B,
                    takerAmount: U256::from(200),
                }
                .encode_log_data()
            ]
        );
        assert_eq!(balance(&mut storage, TOKEN_A, maker), U256::from(1000));
    }

    #[test]
    fn filled_orders_cannot_be_cancelled() {
        let mut storage = ledger();
        let (order, signature) = signed(order(guard(ReplayScheme::Salt)));
        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers);
        market.execute_swap(TAKER, &order, &signature).unwrap();

        let order_hash = market.order_hash(&order);
        assert_eq!(
            market.cancel_order(order.maker, &order),
            Err(MarketError::OrderAlreadyFilled(order_hash))
        );
        assert_eq!(market.get_order_status(order_hash), OrderStatus::Filled);
    }

    #[test]
    fn nonce_markets_do_not_cancel() {
        let mut storage = ledger();
        let (order, _) = signed(order(guard(ReplayScheme::Nonce)));
        let mut market =
            SecondaryMarket::new(deployment(ReplayScheme::Nonce), &mut storage, Erc20Transfers);
        assert_eq!(
            market.cancel_order(order.maker, &order),
            Err(MarketError::CancellationUnsupported)
        );
        assert_eq!(market.get_nonce(order.maker), U256::ZERO);
    }

    #[test]
    fn exposes_signing_domain() {
        let mut storage = HashMapStorageProvider::new(CHAIN_ID);
        let market = SecondaryMarket::new(deployment(ReplayScheme::Salt), &mut storage, Erc20Transfers);
        let domain = market.eip712_domain();

        assert_eq!(domain, Domain::new(CHAIN_ID, MARKET));
        assert_eq!(domain.name, "SecondaryMarket");
        assert_eq!(domain.version, "1");
        assert_eq!(market.domain_separator(), DomainSeparator::new(CHAIN_ID, MARKET));

        let order = order(guard(ReplayScheme::Salt)).build();
        assert_eq!(
            market.order_hash(&order),
            order.signing_hash(&DomainSeparator::new(CHAIN_ID, MARKET))
        );
    }
}
