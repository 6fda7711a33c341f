//! Where container bytes come from.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};

/// A provider of seekable container bytes, keyed by path.
pub trait ContainerSource: Send + Sync + 'static {
    type Reader: Read + Seek;

    /// Open the container at `path`.
    fn open(&self, path: &Path) -> Result<Self::Reader>;
}

/// Reads containers from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl ContainerSource for FileSource {
    type Reader = BufReader<File>;

    fn open(&self, path: &Path) -> Result<Self::Reader> {
        File::open(path)
            .map(BufReader::new)
            .map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// In-memory containers. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Arc<RwLock<HashMap<PathBuf, Arc<[u8]>>>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the bytes served for `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) {
        self.files.write().insert(path.into(), bytes.into());
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }
}

impl ContainerSource for MemorySource {
    type Reader = Cursor<Arc<[u8]>>;

    fn open(&self, path: &Path) -> Result<Self::Reader> {
        self.files
            .read()
            .get(path)
            .map(|bytes| Cursor::new(Arc::clone(bytes)))
            .ok_or_else(|| Error::Io {
                path: path.to_path_buf(),
                source: ErrorKind::NotFound.into(),
            })
    }
}
