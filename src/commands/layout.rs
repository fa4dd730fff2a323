use colored::*;
use eyre::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::{LayoutOverrides, OutputFormat};
use crate::config::Config;
use crate::layout::{LayoutConfig, compute_layout, compute_positions};
use crate::persona::store::PersonaStore;
use crate::similarity::SimilarityEdge;

pub fn run(overrides: LayoutOverrides, edges: Option<&Path>, format: OutputFormat, config: &Config) -> Result<()> {
    let layout_config = apply_overrides(&config.layout, &overrides);
    layout_config.validate()?;
    log::info!("Layout settings: {:?}", layout_config);

    if let Some(path) = edges {
        return run_edges(path, &layout_config, format);
    }

    let store = PersonaStore::new(config.personas_dir());
    let personas = store.load_all()?;
    let nodes = compute_layout(&personas, &layout_config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&nodes)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&nodes)?),
        OutputFormat::Text => {
            println!("{}", "Persona Similarity Map:".bold());
            println!(
                "  {}",
                format!(
                    "{} iterations, repulsion {}, attraction {}",
                    layout_config.iterations, layout_config.repulsion, layout_config.attraction
                )
                .dimmed()
            );
            println!();

            if nodes.is_empty() {
                println!("  {} No personas found in {}", "(none)".dimmed(), store.root().display());
            }
            for node in &nodes {
                println!(
                    "  {} {:<24} x={:>7.2} y={:>7.2}  {}",
                    "●".green(),
                    node.id.bold(),
                    node.x,
                    node.y,
                    node.label.dimmed()
                );
            }
        }
    }

    Ok(())
}

fn run_edges(path: &Path, layout_config: &LayoutConfig, format: OutputFormat) -> Result<()> {
    let edges = read_edges(path)?;
    let positions = compute_positions(&edges, layout_config);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&positions)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&positions)?),
        OutputFormat::Text => {
            println!("{} {}", "Layout of".bold(), path.display());
            println!();
            for p in &positions {
                println!("  {} {:<24} x={:>7.2} y={:>7.2}", "●".green(), p.id.bold(), p.x, p.y);
            }
        }
    }

    Ok(())
}

/// Read similarity edges from a JSON or YAML file
fn read_edges(path: &Path) -> Result<Vec<SimilarityEdge>> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read edges file: {}", path.display()))?;

    // YAML is a superset of JSON, so one parser covers both
    let edges: Vec<SimilarityEdge> =
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse edges file: {}", path.display()))?;

    if let Some(bad) = edges.iter().find(|e| !e.similarity.is_finite()) {
        eyre::bail!("Non-finite similarity for {} ↔ {}", bad.source, bad.target);
    }

    Ok(edges)
}

fn apply_overrides(base: &LayoutConfig, overrides: &LayoutOverrides) -> LayoutConfig {
    let mut config = base.clone();
    if let Some(iterations) = overrides.iterations {
        config.iterations = iterations;
    }
    if let Some(repulsion) = overrides.repulsion {
        config.repulsion = repulsion;
    }
    if let Some(attraction) = overrides.attraction {
        config.attraction = attraction;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let base = LayoutConfig::default();
        let overrides = LayoutOverrides {
            iterations: Some(5),
            repulsion: None,
            attraction: Some(0.5),
        };

        let merged = apply_overrides(&base, &overrides);
        assert_eq!(merged.iterations, 5);
        assert_eq!(merged.repulsion, base.repulsion);
        assert_eq!(merged.attraction, 0.5);
    }

    #[test]
    fn test_read_edges_json() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("edges.json");
        fs::write(&path, r#"[{"source": "a", "target": "b", "similarity": 0.4706}]"#).unwrap();

        let edges = read_edges(&path).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "a");
        assert_eq!(edges[0].similarity, 0.4706);
    }

    #[test]
    fn test_read_edges_yaml() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("edges.yaml");
        fs::write(&path, "- source: a\n  target: b\n  similarity: 1.0\n- source: b\n  target: c\n  similarity: 0.2\n").unwrap();

        assert_eq!(read_edges(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_read_edges_rejects_garbage() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("edges.json");
        fs::write(&path, r#"{"not": "a list"}"#).unwrap();

        assert!(read_edges(&path).is_err());
    }

    #[test]
    fn test_no_overrides_is_identity() {
        let base = LayoutConfig::default();
        assert_eq!(apply_overrides(&base, &LayoutOverrides::default()), base);
    }
}
