use {
    crate::DomainSeparator,
    alloy::{
        primitives::{self, Address, B256, U256, keccak256, uint},
        signers::{SignerSync, local::PrivateKeySigner},
    },
    serde::{Deserialize, Serialize, de},
    std::fmt,
};

/// Largest `s` value accepted for a signature. Signatures in the upper half
/// of the curve order are malleable copies of a lower half signature.
pub const SECP256K1_HALF_ORDER: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must be 65 bytes long but has {0}")]
    InvalidSignatureLength(usize),
    #[error("signature s value {0} is not in the lower half of the curve order")]
    InvalidSignatureS(B256),
    #[error("signature does not recover to a valid signer")]
    InvalidSignature,
}

/// Returns the EIP-712 message that gets signed for a struct hash.
pub fn hashed_eip712_message(domain_separator: &DomainSeparator, struct_hash: &[u8; 32]) -> B256 {
    let mut message = [0u8; 66];
    message[0..2].copy_from_slice(&[0x19, 0x01]);
    message[2..34].copy_from_slice(&domain_separator.0);
    message[34..66].copy_from_slice(struct_hash);
    keccak256(message)
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Hash)]
pub struct EcdsaSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl EcdsaSignature {
    /// Parses an `r ‖ s ‖ v` signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes: &[u8; 65] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        })
    }

    /// r + s + v
    pub fn to_bytes(self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }

    /// Recovers the account that signed `hash`.
    ///
    /// Only canonical signatures are accepted: `s` must be in the lower half of
    /// the curve order and `v` must be 27 or 28.
    pub fn recover(&self, hash: &B256) -> Result<Address, SignatureError> {
        let s = U256::from_be_bytes(self.s.0);
        if s > SECP256K1_HALF_ORDER {
            return Err(SignatureError::InvalidSignatureS(self.s));
        }
        let y_parity = match self.v {
            27 => false,
            28 => true,
            _ => return Err(SignatureError::InvalidSignature),
        };

        let signature = primitives::Signature::new(U256::from_be_bytes(self.r.0), s, y_parity);
        let signer = signature
            .recover_address_from_prehash(hash)
            .map_err(|_| SignatureError::InvalidSignature)?;
        if signer.is_zero() {
            return Err(SignatureError::InvalidSignature);
        }
        Ok(signer)
    }

    pub fn sign(hash: &B256, signer: &PrivateKeySigner) -> anyhow::Result<Self> {
        let signature = signer.sign_hash_sync(hash)?;
        Ok(Self {
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
            v: 27 + u8::from(signature.v()),
        })
    }
}

/// Recovers the signer of `hash` from raw signature bytes.
pub fn recover(hash: &B256, signature: &[u8]) -> Result<Address, SignatureError> {
    EcdsaSignature::from_bytes(signature)?.recover(hash)
}

impl Serialize for EcdsaSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.to_bytes())))
    }
}

impl<'de> Deserialize<'de> for EcdsaSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor {}
        impl de::Visitor<'_> for Visitor {
            type Value = EcdsaSignature;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "the 65 ecdsa signature bytes as a hex encoded string, ordered as r, s, v, \
                     where v is either 27 or 28"
                )
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let s = s.strip_prefix("0x").ok_or_else(|| {
                    de::Error::custom(format!(
                        "{s:?} can't be decoded as hex ecdsa signature because it does not start \
                         with '0x'"
                    ))
                })?;
                let bytes = hex::decode(s).map_err(|err| {
                    de::Error::custom(format!(
                        "failed to decode {s:?} as hex ecdsa signature: {err}"
                    ))
                })?;
                EcdsaSignature::from_bytes(&bytes).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(Visitor {})
    }
}
