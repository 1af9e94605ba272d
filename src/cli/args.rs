//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Merge scattered coverage captures into one directory/package tree and query it
#[derive(Parser, Debug)]
#[command(name = "covtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Use this config file instead of the global/local lookup
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command that loads coverage data.
#[derive(clap::Args, Debug, Clone)]
pub struct LoadArgs {
    /// Root directory to search for coverage captures
    #[arg(default_value = ".", value_hint = ValueHint::DirPath)]
    pub root: PathBuf,

    /// Deepest directory level searched (root = 0)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Decode captures one location at a time
    #[arg(long)]
    pub sequential: bool,

    /// Tree metadata as key=value (repeatable)
    #[arg(short, long = "meta", value_name = "KEY=VALUE")]
    pub meta: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load captures and print overall coverage
    Summary {
        #[command(flatten)]
        load: LoadArgs,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// List packages, optionally filtered
    Packages {
        #[command(flatten)]
        load: LoadArgs,

        /// Glob over import paths ('*' stays within one segment, '**' crosses)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Minimum coverage rate, inclusive (0.0..=1.0)
        #[arg(long)]
        min: Option<f64>,

        /// Maximum coverage rate, inclusive (0.0..=1.0)
        #[arg(long)]
        max: Option<f64>,

        /// Required package metadata as key=value (repeatable)
        #[arg(long = "where", value_name = "KEY=VALUE")]
        where_meta: Vec<String>,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one package with its functions
    Show {
        /// Import path of the package
        import_path: String,

        #[command(flatten)]
        load: LoadArgs,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the directory hierarchy with rolled-up coverage
    Tree {
        #[command(flatten)]
        load: LoadArgs,

        /// List packages under their directories
        #[arg(long)]
        packages: bool,
    },

    /// Manage named trees kept in the forest file
    Forest {
        #[command(subcommand)]
        command: ForestCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ForestCommands {
    /// Load captures and store them under a name (replaces an existing tree)
    Add {
        /// Name of the tree
        name: String,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// List stored trees with their coverage
    List,

    /// Remove a stored tree
    Remove {
        /// Name of the tree
        name: String,
    },

    /// Compare one package across all stored trees
    Compare {
        /// Import path of the package
        import_path: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show {
        /// Root whose local config is layered in
        #[arg(default_value = ".", value_hint = ValueHint::DirPath)]
        root: PathBuf,
    },

    /// Show config paths
    Path {
        /// Root whose local config path is shown
        #[arg(default_value = ".", value_hint = ValueHint::DirPath)]
        root: PathBuf,
    },

    /// Print a commented config template
    Template,
}
