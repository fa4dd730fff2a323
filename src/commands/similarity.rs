use colored::*;
use eyre::Result;
use std::cmp::Ordering;

use crate::cli::OutputFormat;
use crate::commands::persona::require_persona;
use crate::config::Config;
use crate::persona::store::PersonaStore;
use crate::similarity::{SimilarityEdge, compute_similarities, rank_neighbors};

pub fn run_all(min: Option<f64>, format: OutputFormat, config: &Config) -> Result<()> {
    let store = PersonaStore::new(config.personas_dir());
    let personas = store.load_all()?;
    let mut edges = compute_similarities(&personas)?;

    if let Some(min) = min {
        edges.retain(|e| e.similarity >= min);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&edges)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&edges)?),
        OutputFormat::Text => {
            println!("{}", "Persona Similarity:".bold());
            println!();

            if edges.is_empty() {
                println!("  {} Need at least two personas in {}", "(none)".dimmed(), store.root().display());
                return Ok(());
            }

            let mut sorted: Vec<&SimilarityEdge> = edges.iter().collect();
            sorted.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal));
            for edge in sorted {
                println!(
                    "  {} {} {} {}",
                    bar(edge.similarity),
                    format!("{:.4}", edge.similarity).bold(),
                    edge.source.cyan(),
                    format!("↔ {}", edge.target).cyan()
                );
            }
        }
    }

    Ok(())
}

pub fn run_neighbors(slug: &str, top: usize, format: OutputFormat, config: &Config) -> Result<()> {
    let store = PersonaStore::new(config.personas_dir());
    require_persona(&store, slug)?;

    let personas = store.load_all()?;
    let edges = compute_similarities(&personas)?;
    let mut neighbors = rank_neighbors(slug, &edges);
    neighbors.truncate(top);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&neighbors)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&neighbors)?),
        OutputFormat::Text => {
            println!("{} {}", "Most similar to".bold(), slug.green().bold());
            println!();
            if neighbors.is_empty() {
                println!("  {}", "(no other personas)".dimmed());
            }
            for (i, n) in neighbors.iter().enumerate() {
                println!("  {:>2}. {} {:.4} {}", i + 1, bar(n.similarity), n.similarity, n.slug.cyan());
            }
        }
    }

    Ok(())
}

/// Ten-cell bar for a similarity in [0, 1]
fn bar(similarity: f64) -> String {
    let filled = (similarity.clamp(0.0, 1.0) * 10.0).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}
