//! `KeyValueStore`: the on-disk engine, keyed by bytes, with point
//! get/put/delete and atomic batch write (§4.1.1).

use std::path::Path;
use std::sync::Arc;

use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use strum::IntoEnumIterator;

use crate::error::{Error, Result};
use crate::storage::columns::Column;

/// One mutation queued into a [`WriteBatch`]; `persist` applies every
/// batch's mutations atomically.
pub enum BatchOp {
    Put { column: Column, key: Vec<u8>, value: Vec<u8> },
    Delete { column: Column, key: Vec<u8> },
}

/// An ordered, atomically-applied set of mutations. Order is preserved
/// (§4.1 Cache: "Insertion order is preserved for deterministic batch
/// writes") even though RocksDB batches don't require it, so the effective
/// on-disk state is reproducible independent of the underlying engine.
#[derive(Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, column: Column, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { column, key, value });
    }

    pub fn delete(&mut self, column: Column, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { column, key });
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// The embedded LSM engine wrapped by typed column families. Every operation
/// fails with [`Error::Io`] on disk failure (§4.1 Contracts).
pub struct KeyValueStore {
    db: Arc<DB>,
}

impl KeyValueStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let cf_descriptors: Vec<ColumnFamilyDescriptor> = Column::iter()
            .map(|c| ColumnFamilyDescriptor::new(c.as_ref(), Options::default()))
            .collect();
        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        Ok(KeyValueStore { db: Arc::new(db) })
    }

    fn cf_handle(&self, column: Column) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(column.as_ref()).ok_or_else(|| Error::Io(format!("missing column family {column}")))
    }

    pub fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(column)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    pub fn put(&self, column: Column, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf_handle(column)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    pub fn delete(&self, column: Column, key: &[u8]) -> Result<()> {
        let cf = self.cf_handle(column)?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    /// Applies every op in `batch` as one atomic RocksDB write.
    pub fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let mut native = rocksdb::WriteBatch::default();
        for op in batch.ops {
            match op {
                BatchOp::Put { column, key, value } => {
                    native.put_cf(self.cf_handle(column)?, key, value);
                }
                BatchOp::Delete { column, key } => {
                    native.delete_cf(self.cf_handle(column)?, key);
                }
            }
        }
        self.db.write(native)?;
        Ok(())
    }

    /// Ordered iteration over every key within `column` with `prefix`.
    pub fn iter_prefix(&self, column: Column, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf_handle(column)?;
        let iter = self.db.prefix_iterator_cf(cf, prefix);
        let mut out = Vec::new();
        for item in iter {
            let (k, v) = item?;
            if !k.starts_with(prefix) {
                break;
            }
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (KeyValueStore, tempdir::TempDir) {
        let dir = tempdir::TempDir::new("flowchain-kv-test").expect("tempdir");
        let store = KeyValueStore::open(dir.path()).expect("open store");
        (store, dir)
    }

    #[test]
    fn put_get_round_trip() {
        let (store, _dir) = temp_store();
        store.put(Column::Blocks, b"k1", b"v1").unwrap();
        assert_eq!(store.get(Column::Blocks, b"k1").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn delete_removes_key() {
        let (store, _dir) = temp_store();
        store.put(Column::Blocks, b"k1", b"v1").unwrap();
        store.delete(Column::Blocks, b"k1").unwrap();
        assert_eq!(store.get(Column::Blocks, b"k1").unwrap(), None);
    }

    #[test]
    fn batch_is_atomic_and_ordered() {
        let (store, _dir) = temp_store();
        let mut batch = WriteBatch::new();
        batch.put(Column::Blocks, b"a".to_vec(), b"1".to_vec());
        batch.put(Column::Blocks, b"b".to_vec(), b"2".to_vec());
        batch.delete(Column::Blocks, b"a".to_vec());
        store.write_batch(batch).unwrap();
        assert_eq!(store.get(Column::Blocks, b"a").unwrap(), None);
        assert_eq!(store.get(Column::Blocks, b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn columns_are_isolated() {
        let (store, _dir) = temp_store();
        store.put(Column::Blocks, b"k", b"block-value").unwrap();
        store.put(Column::Headers, b"k", b"header-value").unwrap();
        assert_eq!(store.get(Column::Blocks, b"k").unwrap(), Some(b"block-value".to_vec()));
        assert_eq!(store.get(Column::Headers, b"k").unwrap(), Some(b"header-value".to_vec()));
    }
}
