//! Opening and creating the backing file, and the per-operation file-handle
//! plumbing (advisory locking, optional fsync) shared by every DML
//! operation in [`crate::ops`].
//!
//! There is no persistent page cache and no long-lived file handle: a
//! [`Database`] is just a path and a [`Config`]. Every public operation
//! opens the file, does its work, and lets the handle drop.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{instrument, warn};

use crate::codec::GlobalHeader;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::layout::{DEAD_END, MAX_TABLES, PAGE_SIZE, TABLE_META_SIZE};

#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    config: Config,
}

impl Database {
    /// Opens `path`, creating a fresh, empty database file if it does not
    /// exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            create_fresh_file(&path)?;
            tracing::debug!("created fresh database file");
        } else {
            tracing::debug!("opened existing database file");
        }
        Ok(Self { path, config })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file for a read-only operation, taking a shared advisory
    /// lock.
    pub(crate) fn open_read(&self) -> Result<LockedFile> {
        let file = OpenOptions::new().read(true).open(&self.path)?;
        acquire_lock(file, &self.config, false)
    }

    /// Opens the file for a mutating operation, taking an exclusive
    /// advisory lock. The lock, and the file, are released when the
    /// returned handle is dropped.
    pub(crate) fn open_write(&self) -> Result<LockedFile> {
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        acquire_lock(file, &self.config, true)
    }
}

/// A file handle holding its advisory lock for the duration of one
/// operation.
pub(crate) struct LockedFile {
    pub file: File,
    sync_on_write: bool,
}

impl LockedFile {
    /// Called after a mutating operation finishes successfully, to honor
    /// `Config::sync_on_write` before the handle (and its lock) are
    /// dropped.
    pub fn sync_if_configured(&self) -> Result<()> {
        if self.sync_on_write {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn acquire_lock(file: File, config: &Config, exclusive: bool) -> Result<LockedFile> {
    let deadline = Instant::now() + config.lock_timeout();
    loop {
        let attempt = if exclusive {
            file.try_lock_exclusive()
        } else {
            file.try_lock_shared()
        };
        match attempt {
            Ok(()) => {
                return Ok(LockedFile {
                    file,
                    sync_on_write: config.sync_on_write,
                })
            }
            Err(_) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(5));
            }
            Err(err) => {
                warn!(exclusive, "failed to acquire advisory file lock");
                return Err(Error::Io(err));
            }
        }
    }
}

/// Writes a brand-new, empty database file: zeroed header, zeroed catalog,
/// and exactly one free page.
fn create_fresh_file(path: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

    let header = GlobalHeader::default();
    file.write_all(zerocopy::AsBytes::as_bytes(&header))?;
    file.write_all(&vec![0u8; MAX_TABLES * TABLE_META_SIZE as usize])?;

    let mut free_page = vec![0u8; PAGE_SIZE as usize];
    free_page[..4].copy_from_slice(&DEAD_END.to_le_bytes());
    file.write_all(&free_page)?;

    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_a_fresh_file_of_the_expected_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.db");

        let _db = Database::open(&path).unwrap();

        let expected = 3 + MAX_TABLES as u64 * TABLE_META_SIZE + PAGE_SIZE;
        assert_eq!(std::fs::metadata(&path).unwrap().len(), expected);
    }

    #[test]
    fn reopening_an_existing_file_does_not_rewrite_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.db");

        let _db = Database::open(&path).unwrap();
        let first_len = std::fs::metadata(&path).unwrap().len();

        let _db2 = Database::open(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), first_len);
    }
}
