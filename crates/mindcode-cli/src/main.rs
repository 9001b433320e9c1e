//! Mindcode CLI - Command-line interface for the Mindcode compiler
//!
//! This is the main entry point. It provides a one-shot `compile`
//! command and a `watch` command that recompiles sources as they
//! change on disk.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "mindcode")]
#[command(author = "Mindcode Contributors")]
#[command(version)]
#[command(about = "Compile Mindcode to Mindustry logic", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one Mindcode file to mlog
    Compile {
        /// Mindcode source file
        file: PathBuf,

        /// Output file (defaults to the source name with an mcode extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ask before overwriting an existing output file
        #[arg(long)]
        prompt_overwrite: bool,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch a directory and recompile sources as they change
    Watch {
        /// Directory to watch for changes
        dir: PathBuf,

        /// Watch only the given directory, not its subdirectories
        #[arg(short = 'R', long)]
        no_recursive: bool,

        /// Extension of Mindcode source files
        #[arg(short, long, default_value = "mindcode")]
        extension: String,

        /// Don't write compiled output to files
        #[arg(short = 'W', long)]
        no_write: bool,

        /// Copy compiled output to the clipboard
        #[arg(short, long = "clip")]
        clipboard: bool,

        /// Delete the compiled file when its source is deleted
        #[arg(short, long)]
        delete: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Compile {
            file,
            output,
            prompt_overwrite,
            json,
        } => commands::compile(&file, output.as_deref(), prompt_overwrite, json),
        Commands::Watch {
            dir,
            no_recursive,
            extension,
            no_write,
            clipboard,
            delete,
        } => {
            let options = commands::WatchOptions {
                extension,
                write: !no_write,
                clipboard,
                delete_compiled: delete,
            };
            commands::watch(&dir, !no_recursive, options).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
