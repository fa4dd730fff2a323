//! Trait merging for meta-personas
//!
//! Unlike similarity, where a missing trait counts as 0, a source that does
//! not define a trait is left out of that trait's aggregate entirely.

use clap::ValueEnum;
use eyre::Result;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::persona::{Persona, TraitVector};

/// How values from several sources combine into one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Arithmetic mean
    Average,
    /// Largest value
    Maximize,
    /// Smallest value
    Minimize,
    /// Weighted mean (unlisted sources weigh 1)
    Weighted,
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "average" => Ok(MergeStrategy::Average),
            "maximize" => Ok(MergeStrategy::Maximize),
            "minimize" => Ok(MergeStrategy::Minimize),
            "weighted" => Ok(MergeStrategy::Weighted),
            _ => Err(format!("Unknown merge strategy: {}", s)),
        }
    }
}

/// Merge the traits of `sources` into one vector.
///
/// Every output value is rounded to two decimals. `weights` is only read by
/// `Weighted`; without it, `Weighted` behaves like `Average`.
pub fn merge_traits(
    sources: &[Persona],
    strategy: MergeStrategy,
    weights: Option<&HashMap<String, f64>>,
) -> Result<TraitVector> {
    let mut merged = TraitVector::new();
    if sources.is_empty() {
        return Ok(merged);
    }

    if let Some((slug, weight)) = weights
        .into_iter()
        .flatten()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        eyre::bail!("Invalid weight for '{}': {} (weights must be non-negative)", slug, weight);
    }

    let vectors = sources
        .iter()
        .map(|p| p.trait_vector().map(|v| (p.slug.as_str(), v)))
        .collect::<Result<Vec<_>>>()?;

    let keys: IndexSet<&String> = vectors.iter().flat_map(|(_, v)| v.keys()).collect();

    for key in keys {
        let contributions: Vec<(f64, f64)> = vectors
            .iter()
            .filter_map(|(slug, v)| {
                let weight = weights.and_then(|w| w.get(*slug)).copied().unwrap_or(1.0);
                v.get(key).map(|value| (*value, weight))
            })
            .collect();

        if let Some(value) = aggregate(&contributions, strategy, weights.is_some()) {
            merged.insert(key.clone(), round2(value));
        }
    }

    log::debug!(
        "Merged {} sources with {} strategy into {} traits",
        sources.len(),
        strategy,
        merged.len()
    );
    Ok(merged)
}

fn aggregate(contributions: &[(f64, f64)], strategy: MergeStrategy, weighted: bool) -> Option<f64> {
    if contributions.is_empty() {
        return None;
    }
    let values = contributions.iter().map(|(v, _)| *v);

    match strategy {
        MergeStrategy::Average => Some(mean(contributions)),
        MergeStrategy::Maximize => values.reduce(f64::max),
        MergeStrategy::Minimize => values.reduce(f64::min),
        MergeStrategy::Weighted if !weighted => Some(mean(contributions)),
        MergeStrategy::Weighted => {
            let total: f64 = contributions.iter().map(|(_, w)| w).sum();
            if total == 0.0 {
                return None;
            }
            Some(contributions.iter().map(|(v, w)| v * w).sum::<f64>() / total)
        }
    }
}

fn mean(contributions: &[(f64, f64)]) -> f64 {
    contributions.iter().map(|(v, _)| v).sum::<f64>() / contributions.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Traits;

    fn scored(slug: &str, pairs: &[(&str, f64)]) -> Persona {
        let vector: TraitVector = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Persona::new(slug, slug, Traits::Scores(vector))
    }

    fn weights(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_sources_yield_empty() {
        assert!(merge_traits(&[], MergeStrategy::Average, None).unwrap().is_empty());
    }

    #[test]
    fn test_average_excludes_missing_from_denominator() {
        let sources = vec![scored("a", &[("x", 1.0)]), scored("b", &[("x", 0.0), ("y", 1.0)])];
        let merged = merge_traits(&sources, MergeStrategy::Average, None).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged["x"], 0.5);
        assert_eq!(merged["y"], 1.0);
    }

    #[test]
    fn test_average_single_source_is_rounded_identity() {
        let source = scored("a", &[("curiosity", 0.756), ("empathy", 0.2), ("humor", 0.333)]);
        let merged = merge_traits(std::slice::from_ref(&source), MergeStrategy::Average, None).unwrap();

        assert_eq!(merged["curiosity"], 0.76);
        assert_eq!(merged["empathy"], 0.2);
        assert_eq!(merged["humor"], 0.33);
        let names: Vec<&str> = merged.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["curiosity", "empathy", "humor"]);
    }

    #[test]
    fn test_maximize_dominates_each_source() {
        let a = scored("a", &[("x", 0.3), ("y", 0.9), ("z", 0.1)]);
        let b = scored("b", &[("x", 0.7), ("y", 0.2)]);
        let merged = merge_traits(&[a.clone(), b.clone()], MergeStrategy::Maximize, None).unwrap();

        for source in [a, b] {
            for (name, value) in source.trait_vector().unwrap() {
                assert!(merged[&name] >= value);
            }
        }
        assert_eq!(merged["z"], 0.1);
    }

    #[test]
    fn test_minimize() {
        let sources = vec![scored("a", &[("x", 0.3), ("y", 0.9)]), scored("b", &[("x", 0.7)])];
        let merged = merge_traits(&sources, MergeStrategy::Minimize, None).unwrap();

        assert_eq!(merged["x"], 0.3);
        assert_eq!(merged["y"], 0.9);
    }

    #[test]
    fn test_weighted_all_ones_equals_average() {
        let sources = vec![
            scored("a", &[("x", 0.15), ("y", 0.8)]),
            scored("b", &[("x", 0.4), ("z", 0.35)]),
            scored("c", &[("x", 0.92), ("y", 0.05)]),
        ];
        let ones = weights(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);

        assert_eq!(
            merge_traits(&sources, MergeStrategy::Weighted, Some(&ones)).unwrap(),
            merge_traits(&sources, MergeStrategy::Average, None).unwrap()
        );
    }

    #[test]
    fn test_weighted_mean() {
        let sources = vec![scored("a", &[("x", 1.0)]), scored("b", &[("x", 0.0)])];
        let w = weights(&[("a", 3.0)]);
        let merged = merge_traits(&sources, MergeStrategy::Weighted, Some(&w)).unwrap();

        // b is unlisted and weighs 1
        assert_eq!(merged["x"], 0.75);
    }

    #[test]
    fn test_weighted_without_weights_falls_back_to_average() {
        let sources = vec![scored("a", &[("x", 1.0)]), scored("b", &[("x", 0.5)])];
        let merged = merge_traits(&sources, MergeStrategy::Weighted, None).unwrap();
        assert_eq!(merged["x"], 0.75);
    }

    #[test]
    fn test_weighted_zero_total_omits_trait() {
        let sources = vec![scored("a", &[("x", 1.0), ("y", 0.4)]), scored("b", &[("y", 0.6)])];
        let w = weights(&[("a", 0.0)]);
        let merged = merge_traits(&sources, MergeStrategy::Weighted, Some(&w)).unwrap();

        assert!(!merged.contains_key("x"));
        assert_eq!(merged["y"], 0.6);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let sources = vec![scored("a", &[("x", 1.0)])];
        let w = weights(&[("a", -1.0)]);
        assert!(merge_traits(&sources, MergeStrategy::Weighted, Some(&w)).is_err());
    }

    #[test]
    fn test_tag_sources_merge() {
        let a = Persona::new("a", "A", Traits::Tags(vec!["bold".to_string()]));
        let b = scored("b", &[("bold", 0.5), ("calm", 0.2)]);
        let merged = merge_traits(&[a, b], MergeStrategy::Average, None).unwrap();

        assert_eq!(merged["bold"], 0.75);
        assert_eq!(merged["calm"], 0.2);
    }

    #[test]
    fn test_strategy_parse_and_display() {
        assert_eq!("Weighted".parse::<MergeStrategy>().unwrap(), MergeStrategy::Weighted);
        assert!("median".parse::<MergeStrategy>().is_err());
        assert_eq!(MergeStrategy::Maximize.to_string(), "maximize");
    }
}
