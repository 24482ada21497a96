//! Command line argument parsing
//!
//! Subcommands:
//! - `run`: generate a script for an instruction, resolve its dependencies, and execute it
//! - `ask`: answer a question in plain text
//! - `web`: generate a self-contained web page
//! - `interactive`: run the interactive loop
//! - `scripts`: manage the saved-script library
//! - `show-config`: show configuration discovery information
//! - `init-config`: write a default user configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "taskomat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turns natural-language instructions into generated scripts and runs them")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a script for an instruction, install its dependencies, and run it
    Run {
        /// The instruction, e.g. "rename every jpg in ~/pics to lowercase"
        instruction: Vec<String>,
        /// File to attach to the request (image or document)
        #[arg(short = 'a', long = "attach")]
        attach: Option<PathBuf>,
        /// Print the generated script before running it
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Ask a question and print the answer
    Ask {
        /// The question
        question: Vec<String>,
        /// File to attach to the request (image or document)
        #[arg(short = 'a', long = "attach")]
        attach: Option<PathBuf>,
    },
    /// Generate a self-contained web page
    Web {
        /// What the page should do
        instruction: Vec<String>,
        /// Write the generated page here instead of stdout
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },
    /// Run in interactive mode
    Interactive,
    /// Manage the saved-script library
    Scripts {
        #[command(subcommand)]
        action: ScriptsAction,
    },
    /// Show configuration discovery information
    ShowConfig,
    /// Write a default configuration file to ~/.taskomat/config.toml
    InitConfig,
}

#[derive(Debug, Subcommand)]
pub enum ScriptsAction {
    /// List saved scripts
    List,
    /// Print a saved script
    Show { name: String },
    /// Save a script from a file
    Save { name: String, file: PathBuf },
    /// Delete a saved script
    Delete { name: String },
    /// Run a saved script through the dependency and execution stages
    Run { name: String },
}
