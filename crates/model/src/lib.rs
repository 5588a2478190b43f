//! Contains the models that are shared between the settlement contract and
//! off-chain order signers.

pub mod order;
pub mod signature;

use {
    alloy::primitives::{Address, U256, keccak256},
    hex::{FromHex, FromHexError},
    hex_literal::hex,
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct DomainSeparator(pub [u8; 32]);

impl std::str::FromStr for DomainSeparator {
    type Err = FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(FromHex::from_hex(s.strip_prefix("0x").unwrap_or(s))?))
    }
}

impl fmt::Debug for DomainSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl DomainSeparator {
    /// Domain separator of the `SecondaryMarket` contract deployed at
    /// `contract_address`.
    pub fn new(chain_id: u64, contract_address: Address) -> Self {
        Domain::new(chain_id, contract_address).separator()
    }
}

/// The EIP-712 domain swap orders are signed under.
///
/// https://eips.ethereum.org/EIPS/eip-712
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    pub const NAME: &'static str = "SecondaryMarket";
    pub const VERSION: &'static str = "1";

    /// `keccak256("EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")`
    pub const TYPE_HASH: [u8; 32] =
        hex!("8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f");

    /// ERC-5267 bitmap of the domain fields in use: name, version, chainId and
    /// verifyingContract.
    ///
    /// https://eips.ethereum.org/EIPS/eip-5267
    pub const FIELDS: u8 = 0x0f;

    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: Self::NAME.to_string(),
            version: Self::VERSION.to_string(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> DomainSeparator {
        let mut encoded = [0u8; 160];
        encoded[0..32].copy_from_slice(&Self::TYPE_HASH);
        encoded[32..64].copy_from_slice(keccak256(self.name.as_bytes()).as_slice());
        encoded[64..96].copy_from_slice(keccak256(self.version.as_bytes()).as_slice());
        encoded[96..128].copy_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        // Addresses are left padded to a full word.
        encoded[140..160].copy_from_slice(self.verifying_contract.as_slice());
        DomainSeparator(keccak256(encoded).0)
    }
}
