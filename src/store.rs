//! The repository holding one [`AccountRecord`] per identity.
//!
//! The crate only needs find-by-identity and create-once semantics; how a
//! host encodes the records (file, database) is its own business. Writes
//! go through `&mut self`, so a deployment either hands the store to a
//! single owner or wraps it in its own lock; implementations backed by a
//! concurrent map may instead make [`insert`](SecretStore::insert) an
//! atomic compare-and-swap and relax that requirement.

use std::collections::HashMap;

use crate::{AccountRecord, Identity};

use core::fmt;

/// A second record was offered for an identity that already has one.
///
/// Records are immutable once created; rotation is not an update.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AlreadyExists(pub Identity);

impl std::error::Error for AlreadyExists {}

impl fmt::Display for AlreadyExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" is already enrolled", self.0)
    }
}

/// Capability set the enrollment layer requires from secret storage.
pub trait SecretStore {
    /// Looks up the record for an identity. Side-effect-free and safe to
    /// call concurrently with other reads.
    fn find(&self, identity: &Identity) -> Option<AccountRecord>;

    /// Stores a record for a previously unseen identity.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyExists`] when the identity already has a record;
    /// the stored record is left untouched.
    fn insert(&mut self, record: AccountRecord) -> Result<(), AlreadyExists>;
}

/// In-memory reference store, indexed by identity.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<Identity, AccountRecord>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Number of enrolled identities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SecretStore for MemoryStore {
    fn find(&self, identity: &Identity) -> Option<AccountRecord> {
        self.records.get(identity).cloned()
    }

    fn insert(&mut self, record: AccountRecord) -> Result<(), AlreadyExists> {
        if self.records.contains_key(record.identity()) {
            return Err(AlreadyExists(record.identity().clone()));
        }
        self.records.insert(record.identity().clone(), record);
        Ok(())
    }
}

impl<S: SecretStore + ?Sized> SecretStore for &mut S {
    fn find(&self, identity: &Identity) -> Option<AccountRecord> {
        (**self).find(identity)
    }

    fn insert(&mut self, record: AccountRecord) -> Result<(), AlreadyExists> {
        (**self).insert(record)
    }
}
