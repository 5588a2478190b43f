//! ABI entry point of the market: decodes calldata, runs the call and encodes
//! its return value or revert reason.

use {
    crate::{
        abi::{ISecondaryMarket, ISecondaryMarketNonce},
        error::MarketError,
        market::SecondaryMarket,
        storage::StorageProvider,
        token::TokenTransfer,
    },
    alloy::{
        primitives::{Address, B256, Bytes, FixedBytes, U256},
        sol_types::{SolCall, SolValue},
    },
    model::{Domain, order::ReplayScheme},
};

/// Revert data of a failed call. Empty if the calldata could not be decoded.
#[derive(Clone, Debug, Default, Eq, PartialEq, thiserror::Error)]
#[error("execution reverted: {0}")]
pub struct Revert(pub Bytes);

impl From<MarketError> for Revert {
    fn from(err: MarketError) -> Self {
        Self(err.revert_data())
    }
}

fn decode<C: SolCall>(calldata: &[u8]) -> Result<C, Revert> {
    C::abi_decode(calldata).map_err(|err| {
        tracing::debug!(?err, function = C::SIGNATURE, "undecodable calldata");
        Revert::default()
    })
}

impl<S, T> SecondaryMarket<'_, S, T>
where
    S: StorageProvider + 'static,
    T: TokenTransfer<S>,
{
    /// Executes `calldata` sent by `msg_sender` against the interface of this
    /// deployment's replay protection scheme.
    pub fn call(&mut self, calldata: &[u8], msg_sender: Address) -> Result<Bytes, Revert> {
        let Some(selector) = calldata.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok()) else {
            return Err(Revert::default());
        };
        match self.scheme() {
            ReplayScheme::Salt => self.call_salted(selector, calldata, msg_sender),
            ReplayScheme::Nonce => self.call_sequenced(selector, calldata, msg_sender),
        }
    }

    fn call_salted(
        &mut self,
        selector: [u8; 4],
        calldata: &[u8],
        msg_sender: Address,
    ) -> Result<Bytes, Revert> {
        use ISecondaryMarket::*;

        match selector {
            executeSwapCall::SELECTOR => {
                let call: executeSwapCall = decode(calldata)?;
                self.execute_swap(msg_sender, &call.order.into(), &call.signature)?;
                Ok(Bytes::new())
            }
            cancelOrderCall::SELECTOR => {
                let call: cancelOrderCall = decode(calldata)?;
                self.cancel_order(msg_sender, &call.order.into())?;
                Ok(Bytes::new())
            }
            getOrderStatusCall::SELECTOR => {
                let call: getOrderStatusCall = decode(calldata)?;
                let status: U256 = self.get_order_status(call.orderHash).into();
                Ok(status.abi_encode().into())
            }
            eip712DomainCall::SELECTOR => Ok(encode_domain(&self.eip712_domain())),
            _ => Err(Revert::default()),
        }
    }

    fn call_sequenced(
        &mut self,
        selector: [u8; 4],
        calldata: &[u8],
        msg_sender: Address,
    ) -> Result<Bytes, Revert> {
        use ISecondaryMarketNonce::*;

        match selector {
            executeSwapCall::SELECTOR => {
                let call: executeSwapCall = decode(calldata)?;
                self.execute_swap(msg_sender, &call.order.into(), &call.signature)?;
                Ok(Bytes::new())
            }
            getNonceCall::SELECTOR => {
                let call: getNonceCall = decode(calldata)?;
                Ok(self.get_nonce(call.maker).abi_encode().into())
            }
            eip712DomainCall::SELECTOR => Ok(encode_domain(&self.eip712_domain())),
            _ => Err(Revert::default()),
        }
    }
}

/// ERC-5267 `eip712Domain()` return data.
fn encode_domain(domain: &Domain) -> Bytes {
    (
        FixedBytes::<1>::from([Domain::FIELDS]),
        domain.name.clone(),
        domain.version.clone(),
        U256::from(domain.chain_id),
        domain.verifying_contract,
        B256::ZERO,
        Vec::<U256>::new(),
    )
        .abi_encode_params()
        .into()
}
