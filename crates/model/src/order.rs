//! Contains the swap order type together with its EIP-712 hashing.

use {
    crate::{
        DomainSeparator,
        signature::{self, EcdsaSignature, SignatureError},
    },
    alloy::{
        primitives::{Address, B256, U256, keccak256},
        signers::local::PrivateKeySigner,
    },
    hex_literal::hex,
    serde::{Deserialize, Serialize},
};

/// Value that prevents a signed order from being settled more than once.
#[derive(Eq, PartialEq, Clone, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayGuard {
    /// Sequence number that has to match the maker's current nonce.
    Nonce(U256),
    /// Arbitrary value that makes the order hash unique.
    Salt(String),
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::Salt(String::new())
    }
}

impl ReplayGuard {
    pub fn scheme(&self) -> ReplayScheme {
        match self {
            Self::Nonce(_) => ReplayScheme::Nonce,
            Self::Salt(_) => ReplayScheme::Salt,
        }
    }

    /// The EIP-712 encoding of the value. Dynamic `string` values are encoded
    /// as the hash of their contents.
    fn encode_data(&self) -> [u8; 32] {
        match self {
            Self::Nonce(nonce) => nonce.to_be_bytes::<32>(),
            Self::Salt(salt) => keccak256(salt.as_bytes()).0,
        }
    }
}

/// How a deployment of the market protects orders against replays.
#[derive(
    Eq, PartialEq, Clone, Copy, Debug, Default, Hash, Deserialize, Serialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReplayScheme {
    /// Every maker has a counter that each order has to match and every
    /// settlement increments. Orders can't be cancelled individually.
    Nonce,
    /// Every order carries a salt and its hash is tracked as filled or
    /// cancelled.
    #[default]
    Salt,
}

impl ReplayScheme {
    /// `keccak256("SwapOrder(address maker,address makerToken,uint256 makerAmount,address takerToken,uint256 takerAmount,uint256 nonce)")`
    pub const NONCE_TYPE_HASH: [u8; 32] =
        hex!("a3baa9fb93568671a889c5bd7edddda3590d2cc38a3b5bdd00c92c32eaf3a01d");
    /// `keccak256("SwapOrder(address maker,address makerToken,uint256 makerAmount,address takerToken,uint256 takerAmount,string salt)")`
    pub const SALT_TYPE_HASH: [u8; 32] =
        hex!("4bbb0490d5824a53ec5287ec9409fe846166a21a9a0f08c154948d7f5197eda0");

    pub fn type_hash(self) -> [u8; 32] {
        match self {
            Self::Nonce => Self::NONCE_TYPE_HASH,
            Self::Salt => Self::SALT_TYPE_HASH,
        }
    }
}

/// Lifecycle of an order identified by its hash. `Filled` and `Cancelled` are
/// terminal.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    None,
    Filled,
    Cancelled,
}

impl From<OrderStatus> for U256 {
    fn from(status: OrderStatus) -> Self {
        U256::from(match status {
            OrderStatus::None => 0u8,
            OrderStatus::Filled => 1,
            OrderStatus::Cancelled => 2,
        })
    }
}

impl From<U256> for OrderStatus {
    /// Unknown non-zero values count as consumed.
    fn from(value: U256) -> Self {
        if value.is_zero() {
            Self::None
        } else if value == U256::from(2) {
            Self::Cancelled
        } else {
            Self::Filled
        }
    }
}

/// An offer of `maker_amount` of `maker_token` in exchange for `taker_amount`
/// of `taker_token`, signed by the maker.
#[derive(Eq, PartialEq, Clone, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOrder {
    pub maker: Address,
    pub maker_token: Address,
    pub maker_amount: U256,
    pub taker_token: Address,
    pub taker_amount: U256,
    #[serde(flatten)]
    pub replay_guard: ReplayGuard,
}

impl SwapOrder {
    /// Returns the value of hashStruct() over the order as defined by EIP-712.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712#definition-of-hashstruct
    pub fn hash_struct(&self) -> [u8; 32] {
        let mut hash_data = [0u8; 224];
        hash_data[0..32].copy_from_slice(&self.replay_guard.scheme().type_hash());
        // Some slots are not assigned (stay 0) because all values are extended to 256 bits.
        hash_data[44..64].copy_from_slice(self.maker.as_slice());
        hash_data[76..96].copy_from_slice(self.maker_token.as_slice());
        hash_data[96..128].copy_from_slice(&self.maker_amount.to_be_bytes::<32>());
        hash_data[140..160].copy_from_slice(self.taker_token.as_slice());
        hash_data[160..192].copy_from_slice(&self.taker_amount.to_be_bytes::<32>());
        hash_data[192..224].copy_from_slice(&self.replay_guard.encode_data());
        keccak256(hash_data).0
    }

    /// The EIP-712 digest the maker signs. It also identifies the order.
    pub fn signing_hash(&self, domain: &DomainSeparator) -> B256 {
        signature::hashed_eip712_message(domain, &self.hash_struct())
    }

    pub fn sign(
        &self,
        domain: &DomainSeparator,
        signer: &PrivateKeySigner,
    ) -> anyhow::Result<EcdsaSignature> {
        EcdsaSignature::sign(&self.signing_hash(domain), signer)
    }

    /// Recovers the account that signed the order.
    pub fn recover_signer(
        &self,
        domain: &DomainSeparator,
        signature: &[u8],
    ) -> Result<Address, SignatureError> {
        signature::recover(&self.signing_hash(domain), signature)
    }
}

/// An order together with the maker's signature, as handed from the maker to
/// a taker.
#[derive(Eq, PartialEq, Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedSwapOrder {
    #[serde(flatten)]
    pub order: SwapOrder,
    pub signature: EcdsaSignature,
}

impl SignedSwapOrder {
    /// Whether the signature was produced by the order's maker.
    pub fn verify(&self, domain: &DomainSeparator) -> Result<bool, SignatureError> {
        let signer = self.signature.recover(&self.order.signing_hash(domain))?;
        Ok(signer == self.order.maker)
    }
}

#[derive(Clone, Default, Debug)]
pub struct OrderBuilder(SwapOrder);

impl OrderBuilder {
    pub fn with_maker(mut self, maker: Address) -> Self {
        self.0.maker = maker;
        self
    }

    pub fn with_maker_token(mut self, maker_token: Address) -> Self {
        self.0.maker_token = maker_token;
        self
    }

    pub fn with_maker_amount(mut self, maker_amount: U256) -> Self {
        self.0.maker_amount = maker_amount;
        self
    }

    pub fn with_taker_token(mut self, taker_token: Address) -> Self {
        self.0.taker_token = taker_token;
        self
    }

    pub fn with_taker_amount(mut self, taker_amount: U256) -> Self {
        self.0.taker_amount = taker_amount;
        self
    }

    pub fn with_nonce(mut self, nonce: U256) -> Self {
        self.0.replay_guard = ReplayGuard::Nonce(nonce);
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.0.replay_guard = ReplayGuard::Salt(salt.into());
        self
    }

    /// Sets the maker to the signer's address and signs the order.
    pub fn sign_with(
        mut self,
        domain: &DomainSeparator,
        signer: &PrivateKeySigner,
    ) -> anyhow::Result<SignedSwapOrder> {
        self.0.maker = signer.address();
        let signature = self.0.sign(domain, signer)?;
        Ok(SignedSwapOrder {
            order: self.0,
            signature,
        })
    }

    pub fn build(self) -> SwapOrder {
        self.0
    }
}
