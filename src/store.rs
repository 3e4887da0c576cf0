//! Whole-table persistence. A save overwrites the previous snapshot.

use crate::q_table::QTable;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no table at {0}")]
    Missing(PathBuf),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode table {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::error::DecodeError,
    },
    #[error("failed to encode table: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}

pub trait TableStore {
    fn load(&self) -> Result<QTable, StoreError>;

    fn save(&self, table: &QTable) -> Result<(), StoreError>;

    /// Load the stored table, or start from an empty one.
    fn load_or_default(&self) -> QTable {
        match self.load() {
            Ok(table) => {
                info!(states = table.len(), "loaded q-table");
                table
            }
            Err(StoreError::Missing(path)) => {
                info!("no q-table at {}, starting with a new one", path.display());
                QTable::new()
            }
            Err(e) => {
                warn!("{e}; starting with a new q-table");
                QTable::new()
            }
        }
    }
}

/// Bincode snapshot on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

impl TableStore for FileStore {
    fn load(&self) -> Result<QTable, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Missing(self.path.clone()));
            }
            Err(e) => return Err(self.io_err(e)),
        };
        let (table, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(|source| StoreError::Decode { path: self.path.clone(), source })?;
        Ok(table)
    }

    fn save(&self, table: &QTable) -> Result<(), StoreError> {
        let bytes = bincode::serde::encode_to_vec(table, bincode::config::standard())?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        // write-then-rename so a crash never leaves a half-written table
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &bytes).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        debug!(
            states = table.len(),
            bytes = bytes.len(),
            "saved q-table to {}",
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::Dir;
    use crate::state::Observation;

    #[test]
    fn save_then_load_restores_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("q.bin"));

        let mut table = QTable::new();
        for (i, o) in Observation::all().take(40).enumerate() {
            *table.get_mut(o) = [i as f64, -1.5, 0.25, 1e6];
        }
        store.save(&table).unwrap();
        assert_eq!(store.load().unwrap(), table);
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("q.bin"));
        let o = Observation::all().next().unwrap();

        let mut table = QTable::new();
        table.update(o, Dir::Left, -10.0, &o, 0.1, 0.9);
        store.save(&table).unwrap();
        table.update(o, Dir::Left, -10.0, &o, 0.1, 0.9);
        store.save(&table).unwrap();

        assert_eq!(store.load().unwrap().get(&o), table.get(&o));
        assert!(!dir.path().join("q.bin.tmp").exists());
    }

    #[test]
    fn missing_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.bin"));
        assert!(matches!(store.load(), Err(StoreError::Missing(_))));
        assert!(store.load_or_default().is_empty());
    }

    #[test]
    fn corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        fs::write(&path, [0xff, 0xff, 0xff, 0xff, 0xff]).unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Decode { .. })));
        assert!(store.load_or_default().is_empty());
    }
}
