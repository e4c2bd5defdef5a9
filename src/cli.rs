use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default tracing filter directive for this verbosity
    pub fn log_directive(self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Resolve versioned XML schema references and parse documents that use them
#[derive(Parser, Debug, Clone)]
#[command(name = "xsd-resolve")]
#[command(about = "Resolve versioned XML schema references to packaged resources")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Schema path, e.g. 'myschema/'
    #[arg(long = "path", global = true)]
    pub path: Option<String>,

    /// Lowest supported schema version
    #[arg(long = "version-min", global = true)]
    pub version_min: Option<i32>,

    /// Highest supported schema version
    #[arg(long = "version-max", global = true)]
    pub version_max: Option<i32>,

    /// Directory holding packaged resources (repeatable, searched in order)
    #[arg(short = 'r', long = "resource-root", action = clap::ArgAction::Append, global = true)]
    pub resource_roots: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose", global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long = "format", value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Map a schema URI to its packaged resource and open it
    Resolve {
        /// System id, e.g. http://www.scoppelletti.it/res/myschema/1.xsd
        system_id: String,

        /// Public id, reported in diagnostics only
        #[arg(long = "public-id", allow_hyphen_values = true)]
        public_id: Option<String>,
    },

    /// Parse an XML document, resolving its schema references
    Parse {
        /// XML file to parse
        file: PathBuf,

        /// Collect the text of elements with this local name (repeatable)
        #[arg(long = "collect", action = clap::ArgAction::Append)]
        collect: Vec<String>,

        /// Do not resolve xsi:schemaLocation hints
        #[arg(long = "no-schema-locations")]
        no_schema_locations: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Command::Parse { file, .. } = &self.command
            && !file.exists()
        {
            return Err(format!("File does not exist: {}", file.display()));
        }
        Ok(())
    }
}
