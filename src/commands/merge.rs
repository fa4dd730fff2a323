use colored::*;
use eyre::{Context, Result};
use std::collections::HashMap;

use crate::cli::OutputFormat;
use crate::commands::persona::require_persona;
use crate::config::Config;
use crate::merge::{MergeStrategy, merge_traits};
use crate::persona::meta::{MetaPersonaSpec, build_meta_persona, save_meta_persona};
use crate::persona::store::PersonaStore;

/// Arguments of `persona-lab merge`
pub struct MergeArgs {
    pub sources: Vec<String>,
    pub strategy: MergeStrategy,
    pub weights: Vec<String>,
    pub save: bool,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub format: OutputFormat,
    pub quiet: bool,
}

pub fn run(args: MergeArgs, config: &Config) -> Result<()> {
    let store = PersonaStore::new(config.personas_dir());

    let sources = args
        .sources
        .iter()
        .map(|slug| require_persona(&store, slug))
        .collect::<Result<Vec<_>>>()?;

    let weights = parse_weights(&args.weights)?;
    if let Some(ref w) = weights {
        check_weight_sources(w, &args.sources)?;
        if args.strategy != MergeStrategy::Weighted {
            log::warn!("Weights are ignored by the {} strategy", args.strategy);
            eprintln!(
                "{} Weights are ignored by the {} strategy",
                "!".yellow(),
                args.strategy.to_string().magenta()
            );
        }
    }

    if !args.save {
        let merged = merge_traits(&sources, args.strategy, weights.as_ref())?;
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&merged)?),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&merged)?),
            OutputFormat::Text => {
                println!(
                    "{} {} ({})",
                    "Merged traits of".bold(),
                    args.sources.join(", ").cyan(),
                    args.strategy.to_string().magenta()
                );
                println!();
                for (name, value) in &merged {
                    println!("  {} {:<20} {:.2}", "•".cyan(), name, value);
                }
            }
        }
        return Ok(());
    }

    let spec = MetaPersonaSpec {
        name: args.name.ok_or_else(|| eyre::eyre!("--name is required with --save"))?,
        slug: args.slug,
        description: args.description,
        ..Default::default()
    };
    let meta = build_meta_persona(&spec, &sources, args.strategy, weights.as_ref())?;
    let path = save_meta_persona(&store, &meta)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&meta)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&meta)?),
        OutputFormat::Text => {
            if !args.quiet {
                println!("{} Created meta-persona {}", "✓".green(), meta.name.bold());
                println!("  Saved to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Parse repeated `slug=weight` arguments; `None` when none were given
fn parse_weights(raw: &[String]) -> Result<Option<HashMap<String, f64>>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let mut weights = HashMap::new();
    for entry in raw {
        let (slug, value) = entry
            .split_once('=')
            .ok_or_else(|| eyre::eyre!("Invalid weight '{}': expected slug=weight", entry))?;
        let weight: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid weight value for '{}': {}", slug, value))?;
        if !weight.is_finite() || weight < 0.0 {
            eyre::bail!("Weight for '{}' must be a non-negative number, got {}", slug, value);
        }
        weights.insert(slug.trim().to_string(), weight);
    }

    Ok(Some(weights))
}

/// Every weighted slug must be one of the merge sources
fn check_weight_sources(weights: &HashMap<String, f64>, sources: &[String]) -> Result<()> {
    let mut unknown: Vec<&str> = weights
        .keys()
        .filter(|slug| !sources.contains(*slug))
        .map(|slug| slug.as_str())
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }

    unknown.sort();
    eyre::bail!(
        "Weight given for {} not among the merge sources ({})",
        unknown.join(", "),
        sources.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_weights_empty() {
        assert!(parse_weights(&[]).unwrap().is_none());
    }

    #[test]
    fn test_parse_weights() {
        let weights = parse_weights(&strings(&["skeptic=2", "dreamer = 0.5"])).unwrap().unwrap();
        assert_eq!(weights["skeptic"], 2.0);
        assert_eq!(weights["dreamer"], 0.5);
    }

    #[test]
    fn test_parse_weights_rejects_bad_input() {
        assert!(parse_weights(&strings(&["skeptic"])).is_err());
        assert!(parse_weights(&strings(&["skeptic=heavy"])).is_err());
        assert!(parse_weights(&strings(&["skeptic=-1"])).is_err());
    }

    #[test]
    fn test_check_weight_sources_accepts_known_slugs() {
        let weights = parse_weights(&strings(&["skeptic=2"])).unwrap().unwrap();
        assert!(check_weight_sources(&weights, &strings(&["skeptic", "dreamer"])).is_ok());
    }

    #[test]
    fn test_check_weight_sources_rejects_unknown_slug() {
        let weights = parse_weights(&strings(&["skeptic=2", "typo=9"])).unwrap().unwrap();
        let err = check_weight_sources(&weights, &strings(&["skeptic", "dreamer"])).unwrap_err();

        assert!(err.to_string().starts_with("Weight given for typo not among"));
    }
}
