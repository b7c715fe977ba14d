//! Publishing an issuer's key set and discovery document.

use claimfeed_core::{DiscoveryDocument, Jwks, KeyMaterial};
use tracing::info;

use crate::error::Result;
use crate::files::{ensure_dir, read_json, write_json_pretty};
use crate::layout::FeedDir;

/// Write the JWKS to `certs` and the discovery document to
/// `.well-known/openid-configuration`.
pub fn publish(feed: &FeedDir, material: &KeyMaterial) -> Result<()> {
    let jwks = Jwks::from_key_material(feed.issuer(), material);
    let jwks_path = feed.jwks_path();
    info!(path = %jwks_path.display(), "writing key set");
    write_json_pretty(&jwks_path, &jwks)?;

    ensure_dir(&feed.well_known_dir())?;
    let discovery_path = feed.discovery_path();
    info!(path = %discovery_path.display(), "writing discovery document");
    write_json_pretty(&discovery_path, &DiscoveryDocument::for_issuer(feed.issuer()))
}

/// Read the published key set.
pub fn read_jwks(feed: &FeedDir) -> Result<Jwks> {
    read_json(&feed.jwks_path())
}

/// Read the published discovery document.
pub fn read_discovery(feed: &FeedDir) -> Result<DiscoveryDocument> {
    read_json(&feed.discovery_path())
}
