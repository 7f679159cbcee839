//! `coursectl paginate` - call a paged procedure and print the page as JSON

use anyhow::{Context, Result};
use clap::Parser;
use coursectl_store::{ConnectionManager, PaginationExecutor, PaginationRequest};

use super::filters::parse_filters;
use super::print_json;

#[derive(Parser, Debug)]
pub struct PaginateArgs {
    /// Procedure name, optionally schema-qualified
    pub procedure: String,

    /// Page to fetch (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page
    #[arg(long, default_value_t = 10)]
    pub size: u32,

    /// Ordering column passed through to the procedure
    #[arg(long)]
    pub order: Option<String>,

    /// Filter as name=value (repeatable)
    #[arg(long = "filter", value_name = "NAME=VALUE")]
    pub filters: Vec<String>,
}

pub async fn run_paginate(args: PaginateArgs, connections: &ConnectionManager) -> Result<()> {
    let filters = parse_filters(&args.filters)?;
    let mut request =
        PaginationRequest::new(&args.procedure, args.page, args.size).filters(filters);
    request.ordering_column = args.order;

    let result = PaginationExecutor::new(connections)
        .paginate(&request)
        .await
        .with_context(|| format!("Failed to page through {}", args.procedure))?;

    print_json(&result)
}
