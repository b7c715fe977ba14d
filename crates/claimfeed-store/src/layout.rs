//! Path layout of the data root and of individual feed directories.

use std::fs;
use std::path::{Path, PathBuf};

use claimfeed_core::Issuer;

use crate::error::{Result, StoreError};
use crate::files::ensure_dir;

pub const KEY_FILE: &str = "key.pem";
pub const CERT_FILE: &str = "cert.pem";
pub const JWKS_FILE: &str = "certs";
pub const WELL_KNOWN_DIR: &str = ".well-known";
pub const DISCOVERY_FILE: &str = "openid-configuration";
pub const LOCK_FILE: &str = ".key.lock";

pub const CLAIMS_EXT: &str = "json";
pub const TOKEN_EXT: &str = "jwt";
pub const RECEIPT_SUFFIX: &str = ".receipt.json";

/// The data root holding one directory per feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Use `root` as the data root without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use `root` as the data root, creating it if missing.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let dir = Self::new(root);
        ensure_dir(&dir.root)?;
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory of `issuer`'s feed.
    pub fn feed(&self, issuer: &Issuer) -> FeedDir {
        FeedDir::new(self.root.join(issuer.name()), issuer.clone())
    }
}

/// One feed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDir {
    path: PathBuf,
    issuer: Issuer,
}

impl FeedDir {
    pub fn new(path: impl Into<PathBuf>, issuer: Issuer) -> Self {
        Self {
            path: path.into(),
            issuer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// Create the directory if missing.
    pub fn ensure(&self) -> Result<()> {
        ensure_dir(&self.path)
    }

    pub fn key_path(&self) -> PathBuf {
        self.path.join(KEY_FILE)
    }

    pub fn cert_path(&self) -> PathBuf {
        self.path.join(CERT_FILE)
    }

    pub fn jwks_path(&self) -> PathBuf {
        self.path.join(JWKS_FILE)
    }

    pub fn well_known_dir(&self) -> PathBuf {
        self.path.join(WELL_KNOWN_DIR)
    }

    pub fn discovery_path(&self) -> PathBuf {
        self.well_known_dir().join(DISCOVERY_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.path.join(LOCK_FILE)
    }

    /// `<stem>.json`
    pub fn claims_path(&self, stem: &str) -> PathBuf {
        self.path.join(format!("{stem}.{CLAIMS_EXT}"))
    }

    /// `<stem>.jwt`
    pub fn token_path(&self, stem: &str) -> PathBuf {
        self.path.join(format!("{stem}.{TOKEN_EXT}"))
    }

    /// `<stem>.receipt.json`
    pub fn receipt_path(&self, stem: &str) -> PathBuf {
        self.path.join(format!("{stem}{RECEIPT_SUFFIX}"))
    }

    /// Signed token files in this feed, sorted by file name.
    pub fn token_files(&self) -> Result<Vec<PathBuf>> {
        self.list_sorted(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext == TOKEN_EXT)
        })
    }

    /// Combined record files in this feed, sorted by file name.
    pub fn receipt_files(&self) -> Result<Vec<PathBuf>> {
        self.list_sorted(|name| name.ends_with(RECEIPT_SUFFIX) && name.len() > RECEIPT_SUFFIX.len())
    }

    fn list_sorted(&self, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::io(&self.path))?;
            let is_file = entry
                .file_type()
                .map_err(StoreError::io(entry.path()))?
                .is_file();
            if !is_file {
                continue;
            }
            if keep(&entry.file_name().to_string_lossy()) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// File stem of a token path, e.g. `widget-1` for `acme/widget-1.jwt`.
pub fn token_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}
