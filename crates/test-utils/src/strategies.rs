//! Proptest strategies for ArborDir domain types.
//!
//! Reusable generators for property-based testing across crates. Strategies
//! produce well-formed domain values while exploring edge cases through
//! random variation.

use arbordir_types::Dn;
use proptest::prelude::*;

/// Generates a single naming component such as `ou=a3f`.
pub fn arb_component() -> impl Strategy<Value = String> {
    ("[a-z]{1,2}", "[a-z0-9]{1,4}").prop_map(|(attr, value)| format!("{attr}={value}"))
}

/// Generates a DN of 1 to 5 components.
pub fn arb_dn() -> impl Strategy<Value = Dn> {
    proptest::collection::vec(arb_component(), 1..=5).prop_map(Dn::from_components)
}

/// Generates a small set of distinct DNs, biased toward shared suffixes so
/// that ancestor/descendant relations actually occur.
pub fn arb_dn_forest() -> impl Strategy<Value = Vec<Dn>> {
    let suffixes = prop_oneof![
        Just(vec!["dc=example".to_string(), "dc=com".to_string()]),
        Just(vec!["dc=corp".to_string()]),
    ];
    (suffixes, proptest::collection::vec(proptest::collection::vec(arb_component(), 0..=3), 1..12))
        .prop_map(|(suffix, prefixes)| {
            let mut dns: Vec<Dn> = prefixes
                .into_iter()
                .map(|mut components| {
                    components.extend(suffix.iter().cloned());
                    Dn::from_components(components)
                })
                .collect();
            dns.sort();
            dns.dedup();
            dns
        })
}
