//! Trait-by-trait comparison of two persona versions

use serde::Serialize;

use super::TraitVector;

/// Change of a single trait between two versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitDelta {
    pub name: String,
    pub before: Option<f64>,
    pub after: Option<f64>,
    /// `after - before`, absent values counting as 0
    pub delta: f64,
}

/// Compare two trait vectors over the union of their trait names.
///
/// Names keep the order of `before`, followed by names only `after` has.
pub fn compare_traits(before: &TraitVector, after: &TraitVector) -> Vec<TraitDelta> {
    let names = before
        .keys()
        .chain(after.keys().filter(|k| !before.contains_key(*k)));

    names
        .map(|name| {
            let a = before.get(name).copied();
            let b = after.get(name).copied();
            TraitDelta {
                name: name.clone(),
                before: a,
                after: b,
                delta: b.unwrap_or(0.0) - a.unwrap_or(0.0),
            }
        })
        .collect()
}
