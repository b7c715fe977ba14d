//! Writing signed claim artifacts.

use std::path::PathBuf;

use claimfeed_core::{sign, Claims};
use tracing::info;

use crate::error::Result;
use crate::files::{write_file, write_json_pretty};
use crate::keys::KeyMaterialStore;
use crate::layout::DataDir;

/// Paths of one written artifact pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub claims: PathBuf,
    pub token: PathBuf,
}

/// Writes claims and their signed tokens into per-issuer feed directories.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    keys: KeyMaterialStore,
}

impl ArtifactWriter {
    pub fn new(data_dir: DataDir) -> Self {
        Self {
            keys: KeyMaterialStore::new(data_dir),
        }
    }

    pub fn data_dir(&self) -> &DataDir {
        self.keys.data_dir()
    }

    /// Validate, persist, and sign `claims`.
    ///
    /// Writes `<subject>.json` and `<subject>.jwt` under the issuer's feed
    /// directory, overwriting any previous pair for the same subject. Invalid
    /// claims are rejected before anything touches the disk.
    pub fn write(&self, claims: &Claims) -> Result<ArtifactPaths> {
        let validated = claims.validate()?;
        let feed = self.data_dir().feed(&validated.issuer);
        let stem = validated.file_stem();
        feed.ensure()?;

        let claims_path = feed.claims_path(&stem);
        write_json_pretty(&claims_path, claims)?;

        let material = self.keys.get_or_create(&validated.issuer)?;
        let token = sign(claims, &material)?;

        let token_path = feed.token_path(&stem);
        info!(
            issuer = %validated.issuer,
            subject = %validated.subject,
            path = %token_path.display(),
            "writing signed token"
        );
        write_file(&token_path, token)?;

        Ok(ArtifactPaths {
            claims: claims_path,
            token: token_path,
        })
    }
}
