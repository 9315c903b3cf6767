//! Command-line interface.

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use exn::ResultExt;
use serde::Serialize;
use skilldex_cache::{CacheManager, Repository};
use skilldex_config::Config;
use skilldex_records::{DEFAULT_PAGE_SIZE, QuerySpec};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "skilldex", version, about = "Search, inspect and summarize a skills dataset")]
pub struct Cli {
    /// Config file [default: ./skilldex.toml, if present]
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// More logging on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// No logging at all
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List skills, with optional search, category filter and sort
    List(ListArgs),
    /// Show a single skill by identifier (exits with 1 if not found)
    Get {
        /// Numeric id or (URL-encoded) skill name
        identifier: String,
    },
    /// Count skills per category
    Summary,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Search names, taglines, descriptions, use cases, tags and categories
    #[arg(long = "q", visible_alias = "query", value_name = "Q", default_value = "")]
    pub q: String,
    /// Only skills whose categories contain this text
    #[arg(long, default_value = "")]
    pub category: String,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Results per page, 1 to 100
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
    /// latest, oldest or stars
    #[arg(long, default_value = "latest")]
    pub sort: String,
}
impl From<ListArgs> for QuerySpec {
    fn from(args: ListArgs) -> Self {
        QuerySpec {
            q: args.q,
            category: args.category,
            page: args.page,
            page_size: args.page_size,
            sort: args.sort.as_str().into(),
        }
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let backend = config.backend().or_raise(|| ErrorKind::Config)?;
    let cache = CacheManager::new(backend, config.revalidate_interval());
    let repo = Repository::new(cache.clone());
    let source = cache.source().await;
    tracing::info!(%source, "using dataset");

    let code = match cli.command {
        Command::List(args) => {
            let result = repo.list(args.into()).await.or_raise(|| ErrorKind::Query)?;
            print_json(&result)?;
            ExitCode::SUCCESS
        },
        Command::Get { identifier } => match repo.get_by_identifier(&identifier).await.or_raise(|| ErrorKind::Query)? {
            Some(record) => {
                print_json(&record)?;
                ExitCode::SUCCESS
            },
            None => {
                tracing::debug!(%identifier, "no matching skill");
                eprintln!("No skill found for identifier {identifier:?}");
                ExitCode::FAILURE
            },
        },
        Command::Summary => {
            let summary = repo.summary().await.or_raise(|| ErrorKind::Query)?;
            print_json(&summary)?;
            ExitCode::SUCCESS
        },
    };
    cache.close().await;
    Ok(code)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).or_raise(|| ErrorKind::Output)?;
    println!("{json}");
    Ok(())
}
