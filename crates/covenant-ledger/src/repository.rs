use std::marker::PhantomData;

use covenant_core::CompositeKey;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::LedgerError;
use crate::invocation::Invocation;

/// Typed access to records stored as JSON under one composite-key tag.
#[derive(Debug)]
pub struct Repository<T> {
    tag: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Repository<T> {
    pub const fn new(tag: &'static str) -> Self {
        Self {
            tag,
            _record: PhantomData,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn key(&self, components: &[&str]) -> Result<CompositeKey, LedgerError> {
        Ok(CompositeKey::new(self.tag, components)?)
    }
}

impl<T: Serialize + DeserializeOwned> Repository<T> {
    pub fn get(&self, inv: &Invocation<'_>, components: &[&str]) -> Result<Option<T>, LedgerError> {
        let key = self.key(components)?;
        match inv.get(&key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, inv: &Invocation<'_>, components: &[&str]) -> Result<bool, LedgerError> {
        let key = self.key(components)?;
        Ok(inv.get(&key)?.is_some())
    }

    pub fn put(
        &self,
        inv: &mut Invocation<'_>,
        components: &[&str],
        record: &T,
    ) -> Result<(), LedgerError> {
        let key = self.key(components)?;
        inv.put(&key, serde_json::to_vec(record)?);
        Ok(())
    }

    pub fn delete(&self, inv: &mut Invocation<'_>, components: &[&str]) -> Result<(), LedgerError> {
        let key = self.key(components)?;
        inv.delete(&key);
        Ok(())
    }

    /// Decode every record under the given leading components, in key order.
    pub fn scan(&self, inv: &Invocation<'_>, prefix: &[&str]) -> Result<Vec<T>, LedgerError> {
        inv.range_by_prefix(self.tag, prefix)?
            .into_iter()
            .map(|(_, bytes)| Ok(serde_json::from_slice(&bytes)?))
            .collect()
    }
}
