pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pitchguide")]
#[command(author = "Pitchguide Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn presentation decks into per-slide speaker guides using LLMs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long, default_value = "false")]
        force: bool,
    },

    /// Configure the API key for the generation endpoint
    #[command(long_about = "Configure the API key for the generation endpoint.\n\n\
        The endpoint is any OpenAI-compatible chat completions API. Set base_url\n\
        and model in ~/.config/pitchguide/config.toml to point at a different gateway.\n\n\
        The PITCHGUIDE_API_KEY environment variable is used when the config\n\
        file holds no key.")]
    Auth {
        /// Set API key directly (alternative to interactive prompt)
        #[arg(short, long)]
        key: Option<String>,

        /// Show whether a key is configured, without printing it
        #[arg(long, default_value = "false")]
        show: bool,
    },

    /// Print the text extracted from each slide of a deck
    Extract {
        /// Path to a .pdf or .pptx file
        #[arg(required = true)]
        path: PathBuf,

        /// Print the slides as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Generate a speaker guide for every slide of a deck
    Generate {
        /// Path to a .pdf or .pptx file
        #[arg(required = true)]
        path: PathBuf,

        /// Deck title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Model name for the chat completions endpoint
        #[arg(short, long, env = "PITCHGUIDE_MODEL")]
        model: Option<String>,

        /// Write the guides to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Format of the output file
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Retries for rate-limited or unavailable endpoints (overrides config)
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Serve the guide generator over HTTP
    Serve {
        /// Address to bind (overrides config)
        #[arg(long, env = "PITCHGUIDE_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long, env = "PITCHGUIDE_PORT")]
        port: Option<u16>,
    },

    /// Check system health and diagnose common problems
    Doctor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}
