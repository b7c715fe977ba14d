//! # Claimfeed Testkit
//!
//! Testing utilities for claimfeed.
//!
//! - **Fixtures**: a throwaway data directory with helpers to populate feeds
//! - **Generators**: proptest strategies for issuers, subjects, and claims
//!
//! ## Test Fixtures
//!
//! ```rust
//! use claimfeed_testkit::FeedFixture;
//!
//! let fixture = FeedFixture::new();
//! let paths = fixture.write_claims("acme", "widget-1");
//! assert!(paths.token.exists());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use claimfeed_testkit::generators::claims;
//!
//! proptest! {
//!     #[test]
//!     fn generated_claims_validate(c in claims()) {
//!         prop_assert!(c.validate().is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{sample_claims, FeedFixture};
