//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "periphery",
    version,
    author = "neur0map",
    about = "Find the external contributors who shape a project through its dependencies",
    long_about = "Periphery resolves a project's declared dependencies to their source repositories, \
                  scores them for signal, and tallies commits and issues from contributors outside \
                  each repository's own organization."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/periphery/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage projects and their manifests
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Resolve, score and scrape a project's dependencies
    Analyze {
        /// Project ID
        project: String,
    },

    /// Continue an interrupted scrape
    Resume {
        /// Project ID
        project: String,
    },

    /// List dependencies by signal
    Deps {
        /// Project ID
        project: String,

        /// Show only dependencies that qualify for scraping
        #[arg(short, long)]
        qualifying: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show analysis and scrape progress
    Status {
        /// Project ID
        project: String,
    },

    /// Show the scrape log, newest first
    Logs {
        /// Project ID
        project: String,
    },

    /// List contributors by influence
    People {
        /// Project ID
        project: String,

        /// Maximum number of contributors to show
        #[arg(short, long, default_value = "25")]
        limit: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show one contributor's influence per repository
    Person {
        /// Project ID
        project: String,

        /// Contributor username
        username: String,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectAction {
    /// Create a project from a manifest file
    Create {
        /// Project name
        name: String,

        /// Path to the manifest (package.json)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Attach another manifest to a project
    AddManifest {
        /// Project ID
        project: String,

        /// Path to the manifest
        manifest: PathBuf,
    },

    /// List projects, newest first
    List,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
