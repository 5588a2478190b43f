use alloy::primitives::{Address, B256, U256, keccak256};

pub const fn to_u256(slot: u64) -> U256 {
    U256::from_limbs([slot, 0, 0, 0])
}

/// Solidity storage slot of `mapping[key]` for a mapping declared at `slot`.
pub fn mapping_slot<T: AsRef<[u8]>>(key: T, slot: U256) -> U256 {
    let mut data = [0u8; 64];
    let key = key.as_ref();
    // Value types are left padded to a full word.
    data[32 - key.len()..32].copy_from_slice(key);
    data[32..].copy_from_slice(&slot.to_be_bytes::<32>());
    U256::from_be_bytes(keccak256(data).0)
}

/// Slot of `mapping[key1][key2]`.
pub fn double_mapping_slot<T: AsRef<[u8]>, U: AsRef<[u8]>>(key1: T, key2: U, slot: U256) -> U256 {
    mapping_slot(key2, mapping_slot(key1, slot))
}

pub fn address_slot(address: Address, slot: U256) -> U256 {
    mapping_slot(address, slot)
}

pub fn hash_slot(hash: B256, slot: U256) -> U256 {
    mapping_slot(hash, slot)
}
