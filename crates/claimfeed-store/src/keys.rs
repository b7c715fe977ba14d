//! Per-issuer key material, created once and reloaded thereafter.

use std::fs::{File, OpenOptions};

use claimfeed_core::{Issuer, KeyMaterial};
use fs2::FileExt;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::files::{read_to_string, write_atomic, write_file};
use crate::layout::{DataDir, FeedDir};
use crate::publish::publish;

/// Owns issuer key material under a data root.
///
/// `key.pem` is written last and atomically, so its presence means the
/// certificate and published key set are already on disk.
#[derive(Debug, Clone)]
pub struct KeyMaterialStore {
    data_dir: DataDir,
}

impl KeyMaterialStore {
    pub fn new(data_dir: DataDir) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    /// Load `issuer`'s material if it has been created.
    pub fn load(&self, issuer: &Issuer) -> Result<Option<KeyMaterial>> {
        load_from(&self.data_dir.feed(issuer))
    }

    /// Load `issuer`'s material, creating and publishing it on first use.
    ///
    /// Concurrent first-time callers serialise on the feed's lock file; the
    /// loser of the race loads what the winner wrote.
    pub fn get_or_create(&self, issuer: &Issuer) -> Result<KeyMaterial> {
        let feed = self.data_dir.feed(issuer);
        if let Some(material) = load_from(&feed)? {
            return Ok(material);
        }

        feed.ensure()?;
        let _lock = CreationLock::acquire(&feed)?;

        if let Some(material) = load_from(&feed)? {
            debug!(issuer = %issuer, "key material created by another caller");
            return Ok(material);
        }

        info!(issuer = %issuer, "no signing key found, generating");
        let material = KeyMaterial::generate(issuer)?;

        let cert_path = feed.cert_path();
        info!(path = %cert_path.display(), "writing certificate");
        write_file(&cert_path, material.cert_pem())?;
        publish(&feed, &material)?;

        let key_path = feed.key_path();
        info!(path = %key_path.display(), "writing signing key");
        write_atomic(&key_path, material.key_pem(), true)?;

        Ok(material)
    }
}

fn load_from(feed: &FeedDir) -> Result<Option<KeyMaterial>> {
    let key_path = feed.key_path();
    if !key_path.exists() {
        return Ok(None);
    }
    let key_pem = read_to_string(&key_path)?;
    let cert_pem = read_to_string(&feed.cert_path())?;
    Ok(Some(KeyMaterial::from_pem(&key_pem, &cert_pem)?))
}

/// Exclusive advisory lock on a feed's `.key.lock`, released on drop.
struct CreationLock {
    file: File,
}

impl CreationLock {
    fn acquire(feed: &FeedDir) -> Result<Self> {
        let path = feed.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(StoreError::io(&path))?;
        file.lock_exclusive()
            .map_err(|source| StoreError::Lock { path, source })?;
        Ok(Self { file })
    }
}

impl Drop for CreationLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
