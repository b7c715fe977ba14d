//! Test fixtures and helpers.

use std::path::{Path, PathBuf};

use claimfeed_core::{Claims, CombinedRecord, Issuer, SubmissionData};
use claimfeed_store::files::write_file;
use claimfeed_store::{ArtifactPaths, ArtifactWriter, DataDir, FeedDir};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

/// Claims for `localhost/<issuer>` about `subject`, with a price attached.
pub fn sample_claims(issuer: &str, subject: &str) -> Claims {
    Claims::from_value(json!({
        "iss": format!("localhost/{issuer}"),
        "sub": subject,
        "price": 9.99,
    }))
    .expect("fixture claims are an object")
}

/// A data directory in a temp dir, removed on drop.
pub struct FeedFixture {
    dir: TempDir,
    data_dir: DataDir,
}

impl Default for FeedFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let data_dir = DataDir::create(dir.path().join("data")).expect("create data dir");
        Self { dir, data_dir }
    }

    /// The temp dir holding `data/`.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    pub fn writer(&self) -> ArtifactWriter {
        ArtifactWriter::new(self.data_dir.clone())
    }

    pub fn issuer(name: &str) -> Issuer {
        Issuer::from_name(name).expect("fixture issuer name")
    }

    pub fn feed(&self, name: &str) -> FeedDir {
        self.data_dir.feed(&Self::issuer(name))
    }

    /// Write and sign [`sample_claims`].
    pub fn write_claims(&self, issuer: &str, subject: &str) -> ArtifactPaths {
        self.writer()
            .write(&sample_claims(issuer, subject))
            .expect("write fixture claims")
    }

    /// Write a combined record `<stem>.receipt.json` into a feed, as the
    /// submission pipeline would after a commit at `seqno`.
    pub fn write_record(&self, feed: &str, stem: &str, subject: &str, seqno: u64) -> PathBuf {
        let feed = self.feed(feed);
        feed.ensure().expect("create feed dir");
        let data = SubmissionData {
            issuer: feed.issuer().to_claim(),
            subject: subject.to_string(),
            seqno,
            extra: Map::new(),
        };
        let receipt = json!({
            "node_id": "fixture",
            "proof": [],
            "signature": "c2lnbmF0dXJl",
        });
        let record = CombinedRecord::merge(receipt, data).expect("fixture receipt is an object");
        let path = feed.receipt_path(stem);
        write_file(&path, record.to_json_pretty().expect("serialize record"))
            .expect("write fixture record");
        path
    }

    /// Read a JSON file into a value.
    pub fn read_json(path: &Path) -> Value {
        let text = std::fs::read_to_string(path).expect("read fixture file");
        serde_json::from_str(&text).expect("fixture file is JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_feed() {
        let fixture = FeedFixture::new();
        let paths = fixture.write_claims("acme", "widget-1");
        assert!(paths.claims.exists());
        assert!(fixture.feed("acme").key_path().exists());
    }

    #[test]
    fn test_fixture_record() {
        let fixture = FeedFixture::new();
        let path = fixture.write_record("npm", "left-pad", "left-pad", 42);
        let value = FeedFixture::read_json(&path);
        assert_eq!(value["data"]["seqno"], 42);
        assert_eq!(value["data"]["issuer"], "localhost/npm");
        assert_eq!(fixture.feed("npm").receipt_files().unwrap(), vec![path]);
    }
}
