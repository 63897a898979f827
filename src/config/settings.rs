//! Configuration settings for TreeCopy
//!
//! Defines the copy options, CLI arguments, and defaults.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TreeCopy - mirror a directory tree into another directory
#[derive(Parser, Debug, Clone)]
#[command(name = "treecopy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Recursively copy a directory tree, overwriting existing files")]
#[command(long_about = r#"
TreeCopy copies every file below SOURCE to the same relative path below TARGET.
Existing target files are replaced. Target directories are created only when a
file is about to be written into them.

Examples:
  treecopy ./assets ./build/assets                 # Basic copy
  treecopy ./src ./dst --symlinks follow           # Copy what links point to
  treecopy ./src ./dst --atomic --output-format json
"#)]
pub struct CliArgs {
    /// Source directory
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Target directory (created on demand)
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// How to treat symbolic links found in the source tree
    #[arg(long, value_enum, default_value = "skip", value_name = "POLICY")]
    pub symlinks: SymlinkPolicy,

    /// Create target directories even when no file is copied into them
    #[arg(long)]
    pub eager_dirs: bool,

    /// Write each file to a temporary sibling and rename it into place
    #[arg(long)]
    pub atomic: bool,

    /// Output format for the summary
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress the summary)
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

/// Symbolic link handling
///
/// `Follow` gives the classic treatment of a tree walk built on plain
/// file and directory checks, where a link counts as whatever it points to.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkPolicy {
    /// Ignore links entirely
    #[default]
    Skip,
    /// Copy the file or traverse the directory a link points to
    Follow,
    /// Recreate the link itself at the target
    Preserve,
}

/// When target directories are created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirCreation {
    /// Just before the first file is written into the directory
    #[default]
    Lazy,
    /// As soon as the matching source directory is visited
    Eager,
}

/// How file contents reach the target path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Remove the existing file, then write the new one in place
    #[default]
    Direct,
    /// Write a temporary sibling, then rename it over the target
    Atomic,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CopyConfig {
    /// Source path
    pub source: PathBuf,
    /// Target path
    pub target: PathBuf,
    /// Symbolic link handling
    pub symlinks: SymlinkPolicy,
    /// Target directory creation policy
    pub dir_creation: DirCreation,
    /// File write strategy
    pub write_mode: WriteMode,
    /// Summary output format
    pub output_format: OutputFormat,
}

impl CopyConfig {
    /// Create a config for the given pair of paths with default options
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Self {
        Self {
            source: args.source.clone(),
            target: args.target.clone(),
            symlinks: args.symlinks,
            dir_creation: if args.eager_dirs {
                DirCreation::Eager
            } else {
                DirCreation::Lazy
            },
            write_mode: if args.atomic {
                WriteMode::Atomic
            } else {
                WriteMode::Direct
            },
            output_format: args.output_format,
        }
    }

    /// Default log directive for the given verbosity
    pub fn log_directive(verbose: u8, quiet: bool) -> &'static str {
        if quiet {
            return "error";
        }
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
