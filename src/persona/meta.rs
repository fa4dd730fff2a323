//! Meta-personas: personas synthesized by merging others

use chrono::Local;
use eyre::{Context, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::PathBuf;

use super::store::{PersonaStore, new_version_name, slugify};
use super::{Origin, Persona, Traits};
use crate::merge::{MergeStrategy, merge_traits};

/// Descriptive fields for a new meta-persona
#[derive(Debug, Clone, Default)]
pub struct MetaPersonaSpec {
    pub name: String,
    /// Defaults to the slugified name; always stored with a `meta-` prefix
    pub slug: Option<String>,
    pub description: Option<String>,
    pub style: Option<String>,
    pub tone: Option<String>,
    pub tags: Vec<String>,
}

/// Build a meta-persona from merged sources, recording where it came from
pub fn build_meta_persona(
    spec: &MetaPersonaSpec,
    sources: &[Persona],
    strategy: MergeStrategy,
    weights: Option<&HashMap<String, f64>>,
) -> Result<Persona> {
    if sources.is_empty() {
        eyre::bail!("A meta-persona needs at least one source persona");
    }

    let base = spec.slug.clone().unwrap_or_else(|| slugify(&spec.name));
    if base.is_empty() {
        eyre::bail!("Cannot derive a slug from name '{}'", spec.name);
    }
    let slug = meta_slug(&base);

    let traits = merge_traits(sources, strategy, weights)?;

    // Weights are recorded per source, in source order, only when they were used
    let recorded_weights = match (strategy, weights) {
        (MergeStrategy::Weighted, Some(w)) => Some(
            sources
                .iter()
                .map(|p| (p.slug.clone(), w.get(&p.slug).copied().unwrap_or(1.0)))
                .collect::<IndexMap<_, _>>(),
        ),
        _ => None,
    };

    let mut persona = Persona::new(&slug, &spec.name, Traits::Scores(traits));
    persona.description = spec.description.clone();
    persona.style = spec.style.clone();
    persona.tone = spec.tone.clone();
    persona.tags = spec.tags.clone();
    persona.origin = Some(Origin {
        sources: sources.iter().map(|p| p.slug.clone()).collect(),
        method: strategy.to_string(),
        weights: recorded_weights,
        date: Local::now().format("%Y-%m-%d").to_string(),
    });

    Ok(persona)
}

/// Persist a meta-persona as a new version under its `meta-` slug
pub fn save_meta_persona(store: &PersonaStore, persona: &Persona) -> Result<PathBuf> {
    let dir_slug = meta_slug(&persona.slug);

    let mut document = persona.clone();
    document.slug = String::new();
    let content = serde_yaml::to_string(&document).context("Failed to serialize meta-persona")?;

    store.save_version(&dir_slug, &new_version_name(), &content)
}

fn meta_slug(slug: &str) -> String {
    if slug.starts_with("meta-") {
        slug.to_string()
    } else {
        format!("meta-{}", slug)
    }
}
