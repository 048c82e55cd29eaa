//! Key-addressed ledger store and all-or-nothing transactions
//!
//! The engine never holds records across operations. Each operation opens a
//! `Transaction`, stages every read-modify-write against it, and commits the
//! resulting `WriteBatch` in one `apply` call only after every check passed.
//! Dropping a transaction discards its writes.

use crate::state::{Record, RecordKind, TokenAccount};
use ptsol_common::{EngineError, EngineResult};
use solana_program::pubkey::Pubkey;
use std::collections::BTreeMap;

/// Address → record mapping supplied by the runtime (or a test)
pub trait LedgerStore {
    fn get(&self, address: &Pubkey) -> Option<&Record>;

    /// Apply every write of the batch. Must be atomic with respect to readers.
    fn apply(&mut self, batch: WriteBatch);

    fn records(&self) -> Box<dyn Iterator<Item = (&Pubkey, &Record)> + '_>;
}

/// Writes produced by one operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<(Pubkey, Record)>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn into_writes(self) -> Vec<(Pubkey, Record)> {
        self.writes
    }
}

/// In-memory store
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    records: BTreeMap<Pubkey, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, as an external collaborator would (mint
    /// issuance, token account creation).
    pub fn insert(&mut self, address: Pubkey, record: Record) {
        self.records.insert(address, record);
    }

    pub fn get_as<T: RecordKind>(&self, address: &Pubkey) -> Option<&T> {
        self.records.get(address).and_then(T::from_record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Owned copy of every record, in address order
    pub fn snapshot(&self) -> Vec<(Pubkey, Record)> {
        self.records.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn from_records(records: impl IntoIterator<Item = (Pubkey, Record)>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

impl LedgerStore for MemoryStore {
    fn get(&self, address: &Pubkey) -> Option<&Record> {
        self.records.get(address)
    }

    fn apply(&mut self, batch: WriteBatch) {
        for (address, record) in batch.writes {
            self.records.insert(address, record);
        }
    }

    fn records(&self) -> Box<dyn Iterator<Item = (&Pubkey, &Record)> + '_> {
        Box::new(self.records.iter())
    }
}

/// Staged view over a store. Reads see staged writes first.
pub struct Transaction<'s, S: LedgerStore + ?Sized> {
    store: &'s S,
    staged: BTreeMap<Pubkey, Record>,
}

impl<'s, S: LedgerStore + ?Sized> Transaction<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
        }
    }

    pub fn get(&self, address: &Pubkey) -> Option<&Record> {
        self.staged.get(address).or_else(|| self.store.get(address))
    }

    pub fn exists(&self, address: &Pubkey) -> bool {
        self.get(address).is_some()
    }

    /// Load a typed record. A record of another kind at the address is
    /// `AccountKindMismatch`; an empty address is `Ok(None)`.
    pub fn load<T: RecordKind>(&self, address: &Pubkey) -> EngineResult<Option<T>> {
        match self.get(address) {
            None => Ok(None),
            Some(record) => T::from_record(record)
                .cloned()
                .map(Some)
                .ok_or(EngineError::AccountKindMismatch),
        }
    }

    pub fn load_required<T: RecordKind>(&self, address: &Pubkey, missing: EngineError) -> EngineResult<T> {
        self.load(address)?.ok_or(missing)
    }

    pub fn put<T: RecordKind>(&mut self, address: Pubkey, record: T) {
        self.staged.insert(address, record.into_record());
    }

    /// Debit a token account the authority owns
    pub fn debit_token(
        &mut self,
        address: &Pubkey,
        authority: &Pubkey,
        mint: &Pubkey,
        amount: u64,
    ) -> EngineResult<TokenAccount> {
        let mut account: TokenAccount = self.load_required(
            address,
            EngineError::InsufficientBalance {
                needed: amount,
                available: 0,
            },
        )?;
        if account.owner != *authority {
            return Err(EngineError::Unauthorized);
        }
        if account.mint != *mint {
            return Err(EngineError::AssetNotRecognized(account.mint));
        }
        account.debit(amount)?;
        self.put(*address, account);
        Ok(account)
    }

    /// Credit a token account held by `owner`, creating it if it does not exist
    /// yet. An existing account must already belong to `owner`.
    pub fn credit_token(
        &mut self,
        address: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
        amount: u64,
    ) -> EngineResult<TokenAccount> {
        let mut account = self
            .load::<TokenAccount>(address)?
            .unwrap_or_else(|| TokenAccount::new(*mint, *owner));
        if account.owner != *owner {
            return Err(EngineError::Unauthorized);
        }
        if account.mint != *mint {
            return Err(EngineError::AssetNotRecognized(*mint));
        }
        account.credit(amount)?;
        self.put(*address, account);
        Ok(account)
    }

    pub fn into_batch(self) -> WriteBatch {
        WriteBatch {
            writes: self.staged.into_iter().collect(),
        }
    }
}
