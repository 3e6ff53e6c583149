use anyhow::{Context, Result};
use clap::Parser;
use gitfetcher::{
    client::{GitHubService, OctocrabService},
    SearchRepoParams,
};
use trendstore::rules::{QueryDescriptor, RuleTable};

const DEFAULT_PER_PAGE: u8 = 20;

#[derive(Parser, Debug)]
#[command(
    name = "gitfetcher-search",
    about = "Run a repository search the way a collection cycle would and print the hits as JSON",
    after_help = "Example:\n  cargo run -p gitfetcher --bin search -- --query 'topic:llm' --per-page 10"
)]
struct Args {
    /// Search query; defaults to the first repository query of the built-in rule table.
    #[arg(long)]
    query: Option<String>,

    /// Results per page (1-100); overrides the rule table value when set.
    #[arg(long)]
    per_page: Option<u8>,

    /// GitHub token; if omitted the GITHUB_TOKEN environment variable is used.
    #[arg(long, env = "GITHUB_TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();
    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let descriptor = match args.query {
        Some(query) => QueryDescriptor::RepositorySearch {
            label: "cli".to_string(),
            query,
            sort: "stars".to_string(),
            order: "desc".to_string(),
            per_page: DEFAULT_PER_PAGE,
        },
        None => RuleTable::default()
            .repositories
            .queries
            .first()
            .cloned()
            .context("built-in rule table has no repository query")?,
    };
    let mut params = SearchRepoParams::from_query(&descriptor)?;
    if let Some(per_page) = args.per_page {
        params = params.with_per_page(per_page);
    }

    if args.token.is_none() {
        log::warn!("No GitHub token set; search is limited to the anonymous rate limit");
    }
    let client = OctocrabService::new(args.token).context("failed to initialize GitHub client")?;

    log::info!("Searching '{}' …", params.query);
    let results = client.search_repositories(&params).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
