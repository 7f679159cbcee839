//! `coursectl course` - create, update and delete course aggregates

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use coursectl_store::{ConnectionManager, CourseChanges, CourseCoordinator, NewCourse};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::print_json;

#[derive(Parser, Debug)]
pub struct CourseArgs {
    #[command(subcommand)]
    pub command: CourseCommands,
}

#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    /// Create a course with its price and instructors
    Create(CreateArgs),
    /// Change fields of an existing course
    Update(UpdateArgs),
    /// Delete a course with its price, instructor links and comments
    Delete(DeleteArgs),
    /// Show a course with its price and instructor ids
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: String,

    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    pub published: NaiveDate,

    #[arg(long)]
    pub price: Decimal,

    #[arg(long, default_value = "0")]
    pub promotion: Decimal,

    /// Instructor id (repeatable)
    #[arg(long = "instructor", value_name = "UUID")]
    pub instructors: Vec<Uuid>,
}

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Course id
    pub id: Uuid,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    pub published: Option<NaiveDate>,

    #[arg(long)]
    pub price: Option<Decimal>,

    #[arg(long)]
    pub promotion: Option<Decimal>,

    /// Replacement instructor id (repeatable); omit to keep current links
    #[arg(long = "instructor", value_name = "UUID")]
    pub instructors: Vec<Uuid>,

    /// Refuse the update unless the stored version matches
    #[arg(long)]
    pub expected_version: Option<i64>,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Course id
    pub id: Uuid,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Course id
    pub id: Uuid,
}

impl From<UpdateArgs> for CourseChanges {
    fn from(args: UpdateArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            publication_date: args.published,
            price: args.price,
            promotion: args.promotion,
            instructor_ids: Some(args.instructors),
            expected_version: args.expected_version,
        }
    }
}

pub async fn run_course(args: CourseArgs, connections: &ConnectionManager) -> Result<()> {
    let coordinator = CourseCoordinator::new(connections);

    match args.command {
        CourseCommands::Create(args) => {
            let id = coordinator
                .create(NewCourse {
                    title: args.title,
                    description: args.description,
                    publication_date: args.published,
                    price: args.price,
                    promotion: args.promotion,
                    instructor_ids: args.instructors,
                })
                .await
                .context("Failed to create course")?;
            println!("{}", id);
        }
        CourseCommands::Update(args) => {
            let id = args.id;
            let course = coordinator
                .update(id, args.into())
                .await
                .with_context(|| format!("Failed to update course {}", id))?;
            print_json(&course)?;
        }
        CourseCommands::Delete(args) => {
            coordinator
                .delete(args.id)
                .await
                .with_context(|| format!("Failed to delete course {}", args.id))?;
            println!("deleted {}", args.id);
        }
        CourseCommands::Show(args) => {
            let aggregate = coordinator
                .load(args.id)
                .await
                .with_context(|| format!("Failed to load course {}", args.id))?
                .with_context(|| format!("Course {} not found", args.id))?;
            print_json(&aggregate)?;
        }
    }
    Ok(())
}
