//! Farmhand CLI: queue and render Blender orders from any host.
//!
//! Usage:
//!   farmhand init [PATH]            Create a project in PATH
//!   farmhand order <SOURCE> [...]   Queue a render
//!   farmhand list                   Show the queue
//!   farmhand render                 Render every claimable order
//!   farmhand redo <NAME>            Re-queue an order at the back
//!   farmhand delete <NAME>          Remove an order
//!   farmhand clean [--hard]         Remove finished (or all) orders
//!   farmhand targets [NAME PATH]    List or register renderer targets

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use farmhand_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "farmhand",
    about = "Shared render queue for Blender projects",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Queue a render
    Order(commands::order::OrderArgs),

    /// Show the queue, oldest first
    List,

    /// Render every incomplete order not claimed by another host
    Render {
        /// Kill the renderer as soon as a fatal error is printed
        #[arg(long)]
        kill_on_fatal: bool,
    },

    /// Mark an order pending again and move it to the back of the queue
    Redo {
        /// Order name
        name: String,
    },

    /// Remove an order and everything cached for it
    Delete {
        /// Order name
        name: String,
    },

    /// Remove finished orders
    Clean {
        /// Remove every order, finished or not
        #[arg(long)]
        hard: bool,
    },

    /// List renderer targets, or register one
    Targets {
        /// Target name
        #[arg(requires = "path")]
        name: Option<String>,

        /// Renderer executable
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_config = AppConfig::load();

    let mut logging = app_config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    farmhand_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Order(args) => commands::order::run(args).await,
        Commands::List => commands::list::run(),
        Commands::Render { kill_on_fatal } => commands::render::run(&app_config, kill_on_fatal).await,
        Commands::Redo { name } => commands::redo::run(name),
        Commands::Delete { name } => commands::delete::run(name),
        Commands::Clean { hard } => commands::clean::run(hard),
        Commands::Targets { name, path } => commands::targets::run(name, path),
    }
}
