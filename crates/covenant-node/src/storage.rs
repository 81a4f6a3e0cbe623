//! RocksDB storage backend for the Covenant ledger.

use covenant_ledger::{KvPair, KvStore, LedgerError, WriteBatch, WriteOp};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};
use std::path::Path;

/// Column family holding the ledger's world state.
const CF_STATE: &str = "state";

/// RocksDB-backed [`KvStore`].
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(CF_STATE, Options::default())];
        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn state_cf(&self) -> Result<&ColumnFamily, LedgerError> {
        self.db
            .cf_handle(CF_STATE)
            .ok_or_else(|| LedgerError::Backend(format!("column family '{}' not found", CF_STATE)))
    }
}

fn backend(e: rocksdb::Error) -> LedgerError {
    LedgerError::Backend(e.to_string())
}

impl KvStore for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        let cf = self.state_cf()?;
        self.db.get_cf(cf, key).map_err(backend)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, LedgerError> {
        let cf = self.state_cf()?;
        let mut pairs = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(backend)?;
            if !key.starts_with(prefix) {
                break;
            }
            pairs.push((key.into_vec(), value.into_vec()));
        }
        Ok(pairs)
    }

    fn write(&self, batch: WriteBatch) -> Result<(), LedgerError> {
        let cf = self.state_cf()?;
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                WriteOp::Put(key, value) => rocks_batch.put_cf(cf, key, value),
                WriteOp::Delete(key) => rocks_batch.delete_cf(cf, key),
            }
        }
        self.db.write(rocks_batch).map_err(backend)
    }
}
