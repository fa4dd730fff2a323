//! Pairwise cosine similarity between persona trait vectors

use eyre::Result;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::persona::{Persona, TraitVector};

/// Similarity between two personas, `source` preceding `target` in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub source: String,
    pub target: String,
    pub similarity: f64,
}

/// A persona ranked by its similarity to another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub slug: String,
    pub similarity: f64,
}

/// Cosine similarity over the union of both vectors' trait names.
///
/// A trait missing from one vector counts as 0 there. Returns 0.0 when
/// either vector has zero magnitude.
pub fn cosine_similarity(a: &TraitVector, b: &TraitVector) -> f64 {
    let names: IndexSet<&String> = a.keys().chain(b.keys()).collect();

    let mut dot = 0.0;
    let mut mag_a = 0.0;
    let mut mag_b = 0.0;
    for name in names {
        let x = a.get(name).copied().unwrap_or(0.0);
        let y = b.get(name).copied().unwrap_or(0.0);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a.sqrt() * mag_b.sqrt())).clamp(-1.0, 1.0)
}

/// Similarity for every unordered pair of personas
pub fn compute_similarities(personas: &[Persona]) -> Result<Vec<SimilarityEdge>> {
    let vectors = personas.iter().map(|p| p.trait_vector()).collect::<Result<Vec<_>>>()?;

    let n = personas.len();
    let mut edges = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            edges.push(SimilarityEdge {
                source: personas[i].slug.clone(),
                target: personas[j].slug.clone(),
                similarity: cosine_similarity(&vectors[i], &vectors[j]),
            });
        }
    }

    log::debug!("Computed {} similarity edges for {} personas", edges.len(), n);
    Ok(edges)
}

/// Every persona connected to `slug`, most similar first
pub fn rank_neighbors(slug: &str, edges: &[SimilarityEdge]) -> Vec<Neighbor> {
    let mut neighbors: Vec<Neighbor> = edges
        .iter()
        .filter_map(|e| {
            if e.source == slug {
                Some(Neighbor {
                    slug: e.target.clone(),
                    similarity: e.similarity,
                })
            } else if e.target == slug {
                Some(Neighbor {
                    slug: e.source.clone(),
                    similarity: e.similarity,
                })
            } else {
                None
            }
        })
        .collect();

    neighbors.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.slug.cmp(&b.slug))
    });
    neighbors
}
