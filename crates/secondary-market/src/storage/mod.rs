pub mod hashmap;
pub mod slots;

use alloy::primitives::{Address, LogData, U256};

/// Position in the journal of a [`StorageProvider`]. Everything written after
/// the checkpoint is undone by [`StorageProvider::revert`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Checkpoint(pub usize);

/// Ledger the contracts execute against: persistent slots per account, the
/// event log and the code marker of deployed accounts.
pub trait StorageProvider {
    fn chain_id(&self) -> u64;
    fn set_code(&mut self, address: Address, code: Vec<u8>);
    fn has_code(&mut self, address: Address) -> bool;
    fn sstore(&mut self, address: Address, key: U256, value: U256);
    fn sload(&mut self, address: Address, key: U256) -> U256;
    fn emit_event(&mut self, address: Address, event: LogData);

    /// Opens a checkpoint. Checkpoints nest and have to be closed in reverse
    /// order with either [`Self::commit`] or [`Self::revert`].
    fn checkpoint(&mut self) -> Checkpoint;
    fn commit(&mut self, checkpoint: Checkpoint);
    fn revert(&mut self, checkpoint: Checkpoint);
}

/// Runs `f` inside a checkpoint that is reverted if `f` fails.
pub fn atomically<S, T, E>(storage: &mut S, f: impl FnOnce(&mut S) -> Result<T, E>) -> Result<T, E>
where
    S: StorageProvider + ?Sized,
{
    let checkpoint = storage.checkpoint();
    match f(storage) {
        Ok(value) => {
            storage.commit(checkpoint);
            Ok(value)
        }
        Err(err) => {
            storage.revert(checkpoint);
            Err(err)
        }
    }
}
