use {
    crate::storage::{Checkpoint, StorageProvider},
    alloy::primitives::{Address, LogData, U256},
    std::collections::HashMap,
};

/// Undo record for a single write.
#[derive(Debug)]
enum JournalEntry {
    Storage {
        address: Address,
        key: U256,
        previous: Option<U256>,
    },
    Code {
        address: Address,
        previous: Option<Vec<u8>>,
    },
    Event {
        address: Address,
    },
}

/// In-memory ledger. Writes are journaled while a checkpoint is open.
#[derive(Debug, Default)]
pub struct HashMapStorageProvider {
    internals: HashMap<(Address, U256), U256>,
    code: HashMap<Address, Vec<u8>>,
    pub events: HashMap<Address, Vec<LogData>>,
    chain_id: u64,
    journal: Vec<JournalEntry>,
    open_checkpoints: usize,
}

impl HashMapStorageProvider {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    fn record(&mut self, entry: JournalEntry) {
        if self.open_checkpoints > 0 {
            self.journal.push(entry);
        }
    }
}

impl StorageProvider for HashMapStorageProvider {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn set_code(&mut self, address: Address, code: Vec<u8>) {
        let previous = self.code.insert(address, code);
        self.record(JournalEntry::Code { address, previous });
    }

    fn has_code(&mut self, address: Address) -> bool {
        self.code.get(&address).is_some_and(|code| !code.is_empty())
    }

    fn sstore(&mut self, address: Address, key: U256, value: U256) {
        let previous = self.internals.insert((address, key), value);
        self.record(JournalEntry::Storage {
            address,
            key,
            previous,
        });
    }

    fn sload(&mut self, address: Address, key: U256) -> U256 {
        self.internals
            .get(&(address, key))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn emit_event(&mut self, address: Address, event: LogData) {
        self.events.entry(address).or_default().push(event);
        self.record(JournalEntry::Event { address });
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint(self.journal.len())
    }

    fn commit(&mut self, _checkpoint: Checkpoint) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.journal.clear();
        }
    }

    fn revert(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::Storage {
                    address,
                    key,
                    previous: Some(value),
                } => {
                    self.internals.insert((address, key), value);
                }
                JournalEntry::Storage {
                    address,
                    key,
                    previous: None,
                } => {
                    self.internals.remove(&(address, key));
                }
                JournalEntry::Code {
                    address,
                    previous: Some(code),
                } => {
                    self.code.insert(address, code);
                }
                JournalEntry::Code {
                    address,
                    previous: None,
                } => {
                    self.code.remove(&address);
                }
                JournalEntry::Event { address } => {
                    if let Some(events) = self.events.get_mut(&address) {
                        events.pop();
                        if events.is_empty() {
                            self.events.remove(&address);
                        }
                    }
                }
            }
        }
        self.commit(checkpoint);
    }
}
