//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and all subcommand enums.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Incremental ctags-based symbol index for C and C++
#[derive(Parser)]
#[command(
    name = "tagdex",
    version = env!("CARGO_PKG_VERSION"),
    about = "Incremental ctags-based symbol index for C and C++",
    long_about = "Keeps a persistent symbol index of C/C++ projects up to date by re-tagging only what changed.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up .tagdex directory with the current directory as a project
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Index configured projects
    Index {
        /// Only index this project
        #[arg(short, long)]
        project: Option<String>,

        /// Drop the project's files and re-tag everything
        #[arg(short, long)]
        force: bool,

        /// Tag whole directories into a tag file instead of streaming per file
        #[arg(long)]
        batch: bool,

        /// Number of worker threads (overrides config)
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Re-index explicitly added, changed or removed files
    Update {
        /// Project the files belong to (detected from the first path if omitted)
        #[arg(short, long)]
        project: Option<String>,

        #[arg(long, num_args = 1..)]
        added: Vec<PathBuf>,

        #[arg(long, num_args = 1..)]
        changed: Vec<PathBuf>,

        #[arg(long, num_args = 1..)]
        removed: Vec<PathBuf>,
    },

    /// Remove a file or every file under a directory from the index
    Remove {
        path: PathBuf,

        /// Project the path belongs to (detected if omitted)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Query the index
    Retrieve {
        #[command(subcommand)]
        query: RetrieveQuery,
    },

    /// Display active settings
    Config,

    /// Delete every file and declaration from the index
    Clear,
}

#[derive(Subcommand)]
pub enum RetrieveQuery {
    /// Find declarations by name (`name` or `scope::name`)
    Symbol {
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the declarations of one file
    File {
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
