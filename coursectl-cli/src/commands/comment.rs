//! `coursectl comment` - student comments on a course

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coursectl_store::{CommentRepo, ConnectionManager, NewComment};
use uuid::Uuid;

use super::print_json;

#[derive(Parser, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommands,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Comment on a course
    Add(AddArgs),
    /// List a course's comments, newest first
    List(ListArgs),
}

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Course id
    pub course_id: Uuid,

    #[arg(long)]
    pub student: String,

    #[arg(long)]
    pub score: i32,

    #[arg(long)]
    pub text: String,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Course id
    pub course_id: Uuid,
}

pub async fn run_comment(args: CommentArgs, connections: &ConnectionManager) -> Result<()> {
    let repo = CommentRepo::new(connections);
    match args.command {
        CommentCommands::Add(args) => {
            let comment = repo
                .create(NewComment {
                    course_id: args.course_id,
                    student: args.student,
                    score: args.score,
                    body: args.text,
                })
                .await
                .with_context(|| format!("Failed to comment on course {}", args.course_id))?;
            print_json(&comment)
        }
        CommentCommands::List(args) => {
            let comments = repo
                .list_for_course(args.course_id)
                .await
                .with_context(|| format!("Failed to list comments for {}", args.course_id))?;
            print_json(&comments)
        }
    }
}
