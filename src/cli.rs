use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::merge::MergeStrategy;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "persona-lab",
    about = "Persona similarity maps and meta-persona merging",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/persona-lab/logs/persona-lab.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to persona-lab.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse stored personas
    Persona {
        #[command(subcommand)]
        action: PersonaAction,
    },

    /// Pairwise trait similarity between all personas
    Similarity {
        /// Only show pairs at or above this similarity
        #[arg(long)]
        min: Option<f64>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Personas most similar to one persona
    Similar {
        /// Persona slug
        slug: String,

        /// How many neighbors to show
        #[arg(long, short = 'n', default_value_t = 5)]
        top: usize,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Force-directed 2D layout of the similarity map
    Layout {
        #[command(flatten)]
        overrides: LayoutOverrides,

        /// Lay out precomputed similarity edges (JSON or YAML file) instead of the stored personas
        #[arg(long, value_name = "FILE")]
        edges: Option<PathBuf>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Merge personas' traits into a meta-persona
    Merge {
        /// Source persona slugs
        #[arg(required = true)]
        sources: Vec<String>,

        /// Aggregation strategy
        #[arg(long, short = 's', value_enum, default_value_t = MergeStrategy::Average)]
        strategy: MergeStrategy,

        /// Source weight as slug=weight (weighted strategy; repeatable)
        #[arg(long = "weight", short = 'w', value_name = "SLUG=WEIGHT")]
        weights: Vec<String>,

        /// Save the result as a new meta-persona
        #[arg(long, requires = "name")]
        save: bool,

        /// Display name of the meta-persona
        #[arg(long)]
        name: Option<String>,

        /// Slug of the meta-persona (defaults to the slugified name)
        #[arg(long)]
        slug: Option<String>,

        /// Description of the meta-persona
        #[arg(long)]
        description: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Per-invocation overrides of the configured layout constants
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LayoutOverrides {
    /// Number of relaxation iterations
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Repulsion constant
    #[arg(long)]
    pub repulsion: Option<f64>,

    /// Attraction coefficient
    #[arg(long)]
    pub attraction: Option<f64>,
}

#[derive(Subcommand)]
pub enum PersonaAction {
    /// List personas (latest versions)
    List {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show a persona's latest version
    Show {
        /// Persona slug
        slug: String,

        /// Show this version instead of the latest
        #[arg(long)]
        revision: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// List a persona's versions, oldest first
    Versions {
        /// Persona slug
        slug: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Compare traits between two versions of a persona
    Compare {
        /// Persona slug
        slug: String,

        /// Earlier version
        from: String,

        /// Later version
        to: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Config key (e.g., paths.personas, layout.iterations)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Config key
        key: String,

        /// Value to set
        value: String,
    },
}
