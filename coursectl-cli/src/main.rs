//! coursectl CLI - course catalog administration
//!
//! Thin front end over `coursectl-store`:
//! - `migrate`: create or upgrade the catalog schema and paged procedures
//! - `paginate`: call any paged procedure with ad-hoc filters
//! - `course`, `instructor`, `comment`: write the catalog's aggregates

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coursectl_store::{run_migrations, ConnectionManager, StoreConfig};
use tracing::debug;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "coursectl",
    author,
    version,
    about = "Course catalog persistence and paged procedure queries over PostgreSQL"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Database URL (overrides config files and DATABASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run pending schema migrations
    Migrate,
    /// Fetch one page from a paged procedure as JSON
    Paginate(commands::paginate::PaginateArgs),
    /// Create, update, delete or show courses
    Course(commands::course::CourseArgs),
    /// Manage instructors
    Instructor(commands::instructor::InstructorArgs),
    /// Manage course comments
    Comment(commands::comment::CommentArgs),
}

async fn connect(database_url: Option<String>) -> Result<ConnectionManager> {
    let mut config = StoreConfig::load().context("Failed to load store configuration")?;
    if let Some(url) = database_url {
        config.database_url = url;
    }
    debug!(max_connections = config.max_connections, "connecting to catalog store");

    ConnectionManager::connect(&config).await.context(
        "Failed to connect to the catalog database. \
         Set --database-url, DATABASE_URL or ~/.coursectl/config.toml",
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(err) = tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    let connections = connect(cli.database_url).await?;

    let outcome = match cli.command {
        Commands::Migrate => run_migrations(&connections)
            .await
            .context("Failed to run migrations"),
        Commands::Paginate(args) => commands::run_paginate(args, &connections).await,
        Commands::Course(args) => commands::run_course(args, &connections).await,
        Commands::Instructor(args) => commands::run_instructor(args, &connections).await,
        Commands::Comment(args) => commands::run_comment(args, &connections).await,
    };

    connections.close().await;
    outcome
}
