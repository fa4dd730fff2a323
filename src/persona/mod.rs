//! Persona documents and trait normalization
//!
//! A persona's traits are written either as a list of tags or as a map of
//! trait name to strength. Every numeric algorithm works on the map form,
//! so both shapes are normalized into a `TraitVector` first.

pub mod compare;
pub mod meta;
pub mod store;

use eyre::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Canonical trait name -> strength mapping
pub type TraitVector = IndexMap<String, f64>;

/// Traits as they appear in a persona file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Traits {
    /// Free-form tags, each implicitly present at strength 1
    Tags(Vec<String>),
    /// Named strengths, conventionally in [0, 1]
    Scores(TraitVector),
}

impl Default for Traits {
    fn default() -> Self {
        Traits::Scores(TraitVector::new())
    }
}

impl Traits {
    /// Convert into the canonical numeric form.
    ///
    /// Tags map to `1.0`; a repeated tag is set again rather than summed.
    /// Scores are passed through, but NaN and infinities are rejected so
    /// they never reach the similarity or layout math.
    pub fn normalize(&self) -> Result<TraitVector> {
        match self {
            Traits::Tags(tags) => {
                let mut vector = TraitVector::with_capacity(tags.len());
                for tag in tags {
                    vector.insert(tag.clone(), 1.0);
                }
                Ok(vector)
            }
            Traits::Scores(scores) => {
                if let Some((name, value)) = scores.iter().find(|(_, v)| !v.is_finite()) {
                    eyre::bail!("Invalid trait value for '{}': {}", name, value);
                }
                Ok(scores.clone())
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Traits::Tags(tags) => tags.len(),
            Traits::Scores(scores) => scores.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Provenance of a merged (meta) persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    /// Slugs of the personas that were merged
    pub sources: Vec<String>,
    /// Merge strategy name
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<IndexMap<String, f64>>,
    /// Date of the merge (YYYY-MM-DD)
    pub date: String,
}

/// A persona as loaded from its latest version file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Directory name; not part of the YAML document
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,

    pub name: String,

    #[serde(default)]
    pub traits: Traits,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl Persona {
    pub fn new(slug: &str, name: &str, traits: Traits) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            traits,
            description: None,
            style: None,
            tone: None,
            tags: Vec::new(),
            origin: None,
        }
    }

    /// Normalized traits of this persona
    pub fn trait_vector(&self) -> Result<TraitVector> {
        self.traits
            .normalize()
            .map_err(|e| eyre::eyre!("Persona '{}': {}", self.slug, e))
    }
}
