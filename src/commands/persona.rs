//! Persona browsing commands

use colored::*;
use eyre::{Context, Result};
use serde::Serialize;

use crate::cli::{OutputFormat, PersonaAction};
use crate::config::Config;
use crate::persona::compare::compare_traits;
use crate::persona::store::PersonaStore;
use crate::persona::{Persona, Traits};

pub fn run(action: PersonaAction, config: &Config) -> Result<()> {
    let store = PersonaStore::new(config.personas_dir());

    match action {
        PersonaAction::List { format } => list(&store, OutputFormat::resolve(format)),
        PersonaAction::Show { slug, revision, format } => {
            show(&store, &slug, revision.as_deref(), OutputFormat::resolve(format))
        }
        PersonaAction::Versions { slug, format } => versions(&store, &slug, OutputFormat::resolve(format)),
        PersonaAction::Compare { slug, from, to, format } => {
            compare(&store, &slug, &from, &to, OutputFormat::resolve(format))
        }
    }
}

/// Load a persona's latest version or fail with a readable message
pub fn require_persona(store: &PersonaStore, slug: &str) -> Result<Persona> {
    store
        .load(slug)?
        .ok_or_else(|| eyre::eyre!("Persona '{}' not found in {}", slug, store.root().display()))
}

fn list(store: &PersonaStore, format: OutputFormat) -> Result<()> {
    let personas = store.load_all()?;

    #[derive(Serialize)]
    struct PersonaSummary {
        slug: String,
        name: String,
        traits: usize,
        meta: bool,
    }

    let summaries: Vec<PersonaSummary> = personas
        .iter()
        .map(|p| PersonaSummary {
            slug: p.slug.clone(),
            name: p.name.clone(),
            traits: p.traits.len(),
            meta: p.origin.is_some(),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summaries)?),
        OutputFormat::Text => {
            println!("{}", "Personas:".bold());
            println!();

            if personas.is_empty() {
                println!("  {} No personas found in {}", "(none)".dimmed(), store.root().display());
            } else {
                for persona in &personas {
                    let marker = if persona.origin.is_some() { "◆".magenta() } else { "●".green() };
                    println!("  {} {} {}", marker, persona.slug.bold(), persona.name.dimmed());
                    println!("    Traits: {}", trait_summary(&persona.traits).cyan());
                }
            }
        }
    }

    Ok(())
}

fn show(store: &PersonaStore, slug: &str, revision: Option<&str>, format: OutputFormat) -> Result<()> {
    let persona = match revision {
        Some(version) => store.load_version(slug, version)?,
        None => require_persona(store, slug)?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&persona)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&persona)?),
        OutputFormat::Text => {
            println!("{} {}", "Persona:".bold(), persona.name.green().bold());
            println!("{} {}", "Slug:".bold(), persona.slug);

            if let Some(ref description) = persona.description {
                println!();
                println!("{} {}", "Description:".bold(), description);
            }
            if let Some(ref tone) = persona.tone {
                println!("{} {}", "Tone:".bold(), tone);
            }
            if let Some(ref style) = persona.style {
                println!("{} {}", "Style:".bold(), style);
            }

            println!();
            println!("{}", "Traits:".bold());
            let vector = persona.trait_vector()?;
            if persona.traits.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            match persona.traits {
                Traits::Tags(_) => {
                    for name in vector.keys() {
                        println!("  {} {}", "•".cyan(), name);
                    }
                }
                Traits::Scores(_) => {
                    let mut sorted: Vec<(&String, &f64)> = vector.iter().collect();
                    sorted.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
                    for (name, value) in sorted {
                        println!("  {} {:<20} {:.2}", "•".cyan(), name, value);
                    }
                }
            }

            if let Some(ref origin) = persona.origin {
                println!();
                println!(
                    "{} merged from {} ({}, {})",
                    "Origin:".bold(),
                    origin.sources.join(", ").cyan(),
                    origin.method.magenta(),
                    origin.date
                );
            }
        }
    }

    Ok(())
}

fn versions(store: &PersonaStore, slug: &str, format: OutputFormat) -> Result<()> {
    let versions = store.versions(slug)?;
    if versions.is_empty() {
        eyre::bail!("Persona '{}' has no versions in {}", slug, store.root().display());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&versions)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&versions)?),
        OutputFormat::Text => {
            println!("{} {}", "Versions of".bold(), slug.green().bold());
            let latest = versions.len() - 1;
            for (i, version) in versions.iter().enumerate() {
                if i == latest {
                    println!("  {} {} {}", "●".green(), version, "(latest)".dimmed());
                } else {
                    println!("  {} {}", "○".dimmed(), version);
                }
            }
        }
    }

    Ok(())
}

fn compare(store: &PersonaStore, slug: &str, from: &str, to: &str, format: OutputFormat) -> Result<()> {
    let before = store
        .load_version(slug, from)
        .with_context(|| format!("Failed to load version {} of '{}'", from, slug))?;
    let after = store
        .load_version(slug, to)
        .with_context(|| format!("Failed to load version {} of '{}'", to, slug))?;

    let deltas = compare_traits(&before.trait_vector()?, &after.trait_vector()?);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&deltas)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&deltas)?),
        OutputFormat::Text => {
            println!("{} {} {} → {}", "Comparing".bold(), slug.green().bold(), from, to);
            println!();
            for d in &deltas {
                let change = if d.delta > 0.0 {
                    format!("{:+.2}", d.delta).green()
                } else if d.delta < 0.0 {
                    format!("{:+.2}", d.delta).red()
                } else {
                    "  =".dimmed()
                };
                println!(
                    "  {:<20} {:>6} → {:<6} {}",
                    d.name,
                    fmt_value(d.before),
                    fmt_value(d.after),
                    change
                );
            }
        }
    }

    Ok(())
}

fn fmt_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn trait_summary(traits: &Traits) -> String {
    match traits {
        Traits::Tags(tags) => tags.join(", "),
        Traits::Scores(scores) => scores
            .iter()
            .map(|(k, v)| format!("{}={:.2}", k, v))
            .collect::<Vec<_>>()
            .join(", "),
    }
}
