//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::Value;

use claimfeed_core::{Claims, Issuer};

/// A valid issuer short name.
pub fn issuer_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,24}"
}

/// A valid issuer.
pub fn issuer() -> impl Strategy<Value = Issuer> {
    issuer_name().prop_map(|name| Issuer::from_name(&name).expect("generated name is valid"))
}

/// A non-empty subject, possibly containing `/` like scoped package names.
pub fn subject() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9][a-z0-9._-]{0,30}",
        "@[a-z0-9-]{1,12}/[a-z0-9._-]{1,20}",
    ]
}

/// A scalar JSON value for extra claims.
pub fn claim_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,32}".prop_map(Value::from),
    ]
}

/// Valid claims with up to four extra members.
pub fn claims() -> impl Strategy<Value = Claims> {
    (
        issuer(),
        subject(),
        prop::collection::btree_map("[a-z]{1,8}", claim_value(), 0..4),
    )
        .prop_map(|(issuer, subject, extra)| {
            let mut claims = Claims::new();
            for (key, value) in extra {
                claims.insert(key, value);
            }
            claims.set_issuer(&issuer);
            claims.set_subject(subject);
            claims
        })
}
