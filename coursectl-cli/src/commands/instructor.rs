//! `coursectl instructor` - register, list and edit instructors that courses link to

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coursectl_store::{ConnectionManager, InstructorRepo, NewInstructor};
use uuid::Uuid;

use super::print_json;

#[derive(Parser, Debug)]
pub struct InstructorArgs {
    #[command(subcommand)]
    pub command: InstructorCommands,
}

#[derive(Subcommand, Debug)]
pub enum InstructorCommands {
    /// Add an instructor and print the stored row
    Add(AddArgs),
    /// Print every instructor, ordered by last name
    List,
    /// Replace an instructor's names and degree
    Update(UpdateArgs),
}

#[derive(Parser, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    /// Academic degree or title
    #[arg(long, default_value = "")]
    pub degree: String,
}

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Instructor id
    pub id: Uuid,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    /// Academic degree or title
    #[arg(long)]
    pub degree: String,
}

pub async fn run_instructor(args: InstructorArgs, connections: &ConnectionManager) -> Result<()> {
    match args.command {
        InstructorCommands::Add(args) => {
            let instructor = InstructorRepo::new(connections)
                .create(NewInstructor {
                    first_name: args.first_name,
                    last_name: args.last_name,
                    degree: args.degree,
                })
                .await
                .context("Failed to add instructor")?;
            print_json(&instructor)
        }
        InstructorCommands::List => {
            let instructors = InstructorRepo::new(connections)
                .list()
                .await
                .context("Failed to list instructors")?;
            print_json(&instructors)
        }
        InstructorCommands::Update(args) => {
            let instructor = InstructorRepo::new(connections)
                .update(
                    args.id,
                    NewInstructor {
                        first_name: args.first_name,
                        last_name: args.last_name,
                        degree: args.degree,
                    },
                )
                .await
                .with_context(|| format!("Failed to update instructor {}", args.id))?;
            print_json(&instructor)
        }
    }
}
