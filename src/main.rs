// repodash command line.
// Plain-text views of pull requests, issues, workflow runs, and badges per repository.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use repodash::badges::Badges;
use repodash::cache::paths;
use repodash::github::{GitHubClient, RunConclusion, RunStatus, WorkflowRun};
use repodash::state::{Authored, Dashboard, SectionView, SortOrder, latest_per_workflow};
use repodash::token::{
    BrokerTokenSource, EnvTokenSource, FileTokenStore, MemoryTokenStore, TokenSource, TokenStore,
};
use repodash::{Config, Repository, Section, SectionRecords};

/// Dashboard for pull requests, issues, and CI runs across GitHub repositories
#[derive(Parser, Debug)]
#[command(name = "repodash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "REPODASH_CONFIG")]
    config: Option<PathBuf>,

    /// Don't read or write the on-disk response cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured repositories
    Repos,

    /// Open pull requests of a repository
    #[command(visible_alias = "prs")]
    Pulls(ListArgs),

    /// Open issues of a repository
    Issues(ListArgs),

    /// Recent runs of the repository's configured workflows
    Actions {
        /// Repository id or owner/name
        repo: String,

        /// Only the latest run of each workflow
        #[arg(long)]
        latest: bool,
    },

    /// Pull requests merged recently
    Merged {
        /// Repository id or owner/name
        repo: String,

        /// How many days back to look
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// shields.io badge URLs for every repository
    Badges,

    /// Clear the response cache
    Refresh,

    /// Manage the GitHub token
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Repository id or owner/name
    repo: String,

    /// Sort by creation date: newest or oldest
    #[arg(long, default_value = "newest")]
    sort: SortOrder,

    /// Only show records whose author contains this text
    #[arg(long)]
    user: Option<String>,
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Validate and store a token
    Set {
        token: String,

        /// Store without checking it against the API
        #[arg(long)]
        no_validate: bool,
    },

    /// Remove the stored token
    Clear,

    /// Show the current authentication mode and rate limit
    Status,

    /// Fetch a token from the configured broker and store it
    Load,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "repodash=debug" } else { "repodash=warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_env_overrides();

    tracing::debug!(
        api_base = %config.api_base,
        repositories = config.repositories.len(),
        "Configuration loaded"
    );

    let file_store = paths::token_path().map(FileTokenStore::new);

    let command = match cli.command {
        Commands::Token { action } => return run_token_command(&action, &config, file_store).await,
        command => command,
    };

    let dashboard = build_dashboard(&config, file_store, cli.no_cache).await?;

    match command {
        Commands::Repos => print_repositories(&dashboard),
        Commands::Pulls(args) => list_section(&dashboard, Section::PullRequests, &args).await?,
        Commands::Issues(args) => list_section(&dashboard, Section::Issues, &args).await?,
        Commands::Actions { repo, latest } => list_actions(&dashboard, &repo, latest).await?,
        Commands::Merged { repo, days } => {
            let repository = dashboard.registry().find(&repo)?;
            let merged = dashboard.merged_pull_requests(&repo, days).await?;

            println!("{}: {} merged in the last {} days", repository.title(), merged.len(), days);
            for pr in &merged {
                let merged_at = pr
                    .merged_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!("  #{:<6} {}  @{}  {}", pr.number, merged_at, pr.author_login(), pr.title);
            }
        }
        Commands::Badges => {
            for repository in dashboard.registry().iter() {
                let badges = Badges::for_repository(repository);
                println!("{}", repository.title());
                println!("  issues: {}", badges.issues);
                println!("  prs:    {}", badges.pull_requests);
                println!("  ci:     {}", badges.ci.as_deref().unwrap_or("N/A"));
            }
        }
        Commands::Refresh => {
            dashboard.refresh().await;
            println!("Cache cleared");
        }
        Commands::Token { .. } => {}
    }

    print_rate_limit(&dashboard);
    Ok(())
}

/// Token priority: environment variable, then the token file.
async fn build_dashboard(
    config: &Config,
    file_store: Option<FileTokenStore>,
    no_cache: bool,
) -> anyhow::Result<Dashboard> {
    let env_token = EnvTokenSource::new(&config.token.env_var).load_token().await?;

    let tokens: Arc<dyn TokenStore> = match (env_token, file_store) {
        (Some(token), _) => Arc::new(MemoryTokenStore::with_token(token)),
        (None, Some(store)) => Arc::new(store),
        (None, None) => Arc::new(MemoryTokenStore::new()),
    };

    let client = GitHubClient::new(&config.api_base, tokens)?;
    let dashboard = Dashboard::new(client, config.registry()?, config.cache.ttl_policy());

    Ok(match paths::responses_path() {
        Some(path) if !no_cache => dashboard.with_cache_file(path),
        _ => dashboard,
    })
}

async fn run_token_command(
    action: &TokenCommand,
    config: &Config,
    file_store: Option<FileTokenStore>,
) -> anyhow::Result<()> {
    let store = file_store.context("Could not determine a config directory for the token file")?;

    match action {
        TokenCommand::Set { token, no_validate } => {
            let token = token.trim();
            if token.is_empty() {
                bail!("Token must not be empty");
            }
            if !no_validate {
                let client = GitHubClient::new(&config.api_base, Arc::new(MemoryTokenStore::new()))?;
                let user = client
                    .validate_token(token)
                    .await
                    .context("Token was rejected by GitHub")?;
                println!("Token belongs to {}", user.login);
            }
            store.set(token)?;
            println!("Token saved to {}", store.path().display());
        }
        TokenCommand::Clear => {
            store.clear()?;
            println!("Token removed, using the public API");
        }
        TokenCommand::Status => {
            let env_token = EnvTokenSource::new(&config.token.env_var).load_token().await?;
            let (token, origin) = match env_token {
                Some(token) => (Some(token), format!("${}", config.token.env_var)),
                None => (store.get(), store.path().display().to_string()),
            };

            let Some(token) = token else {
                println!("Mode: Public API (60 requests/hour)");
                return Ok(());
            };

            let client = GitHubClient::new(&config.api_base, Arc::new(MemoryTokenStore::new()))?;
            match client.validate_token(&token).await {
                Ok(user) => println!("Mode: Authenticated as {} (token from {})", user.login, origin),
                Err(e) => println!("Mode: token from {} is not usable: {}", origin, e),
            }
            if let Some(info) = client.rate_limit() {
                println!("Rate limit: {}/{} remaining", info.remaining, info.limit);
            }
        }
        TokenCommand::Load => {
            let url = config
                .token
                .broker_url
                .as_deref()
                .context("No token broker configured (set token.broker_url or REPODASH_TOKEN_BROKER_URL)")?;

            match BrokerTokenSource::new(url).load_token().await? {
                Some(token) => {
                    store.set(&token)?;
                    println!("Token loaded from broker and saved to {}", store.path().display());
                }
                None => println!("Broker returned no token"),
            }
        }
    }

    Ok(())
}

fn print_repositories(dashboard: &Dashboard) {
    for repository in dashboard.registry().iter() {
        let workflows = if repository.has_workflows() {
            repository.workflows.join(", ")
        } else {
            "-".to_string()
        };
        println!(
            "{:<45} {:<55} workflows: {}",
            repository.id,
            repository.full_name(),
            workflows
        );
    }
}

async fn list_section(dashboard: &Dashboard, section: Section, args: &ListArgs) -> anyhow::Result<()> {
    dashboard.select_repository(Some(&args.repo)).await?;
    dashboard.set_sort_order(section, args.sort).await;
    if let Some(user) = &args.user {
        dashboard.set_user_filter(section, user).await;
    }

    let repository = dashboard.registry().find(&args.repo)?;
    let view = dashboard
        .load_section(section)
        .await
        .context("Load was superseded")?;
    print_view(repository, &view, false);
    Ok(())
}

async fn list_actions(dashboard: &Dashboard, repo: &str, latest: bool) -> anyhow::Result<()> {
    dashboard.select_repository(Some(repo)).await?;

    let repository = dashboard.registry().find(repo)?;
    let view = dashboard
        .load_section(Section::Actions)
        .await
        .context("Load was superseded")?;
    print_view(repository, &view, latest);
    Ok(())
}

fn print_view(repository: &Repository, view: &SectionView, latest_only: bool) {
    println!("{} ({}): {}", repository.title(), repository.full_name(), view.section.title());

    if let Some(error) = &view.error {
        println!("  ! {}", error.message);
    }
    if let Some(empty) = view.empty_state {
        println!("  {}", empty.message(view.section));
        return;
    }

    match &view.records {
        SectionRecords::PullRequests(prs) => {
            for pr in prs {
                let draft = if pr.draft { " [draft]" } else { "" };
                println!(
                    "  #{:<6} {}  @{}  {}{}",
                    pr.number,
                    pr.created_at.format("%Y-%m-%d"),
                    pr.author_login(),
                    pr.title,
                    draft
                );
            }
        }
        SectionRecords::Issues(issues) => {
            for issue in issues {
                println!(
                    "  #{:<6} {}  @{}  {} ({} comments)",
                    issue.number,
                    issue.created_at.format("%Y-%m-%d"),
                    issue.author_login(),
                    issue.title,
                    issue.comments
                );
            }
        }
        SectionRecords::Actions(runs) => {
            let runs = if latest_only { latest_per_workflow(runs) } else { runs.clone() };
            for run in &runs {
                println!(
                    "  {:<10} {}  {:<20} #{:<6} {}",
                    outcome(run),
                    run.created_at.format("%Y-%m-%d %H:%M"),
                    run.workflow_name(),
                    run.run_number,
                    run.head_branch.as_deref().unwrap_or("-")
                );
            }
        }
    }
}

fn outcome(run: &WorkflowRun) -> &'static str {
    match (run.status, run.conclusion) {
        (RunStatus::Completed, Some(RunConclusion::Success)) => "success",
        (RunStatus::Completed, Some(RunConclusion::Failure)) => "failure",
        (RunStatus::Completed, Some(RunConclusion::Cancelled)) => "cancelled",
        (RunStatus::Completed, Some(RunConclusion::Skipped)) => "skipped",
        (RunStatus::Completed, Some(RunConclusion::TimedOut)) => "timed out",
        (RunStatus::Completed, _) => "completed",
        (RunStatus::InProgress, _) => "running",
        (RunStatus::Queued | RunStatus::Waiting | RunStatus::Requested | RunStatus::Pending, _) => {
            "queued"
        }
        (RunStatus::Unknown, _) => "unknown",
    }
}

fn print_rate_limit(dashboard: &Dashboard) {
    let Some(info) = dashboard.rate_limit() else {
        return;
    };
    let mode = dashboard.auth_mode();

    println!();
    println!(
        "{}: {}/{} requests remaining",
        mode.label(),
        info.remaining,
        info.limit
    );
    if info.should_suggest_token(mode.is_authenticated()) {
        println!("Running low on the public rate limit. Add a token with `repodash token set <TOKEN>`.");
    } else if info.is_low() {
        if let Some(reset_at) = info.reset_at() {
            println!("Rate limit resets at {}", reset_at.with_timezone(&chrono::Local).format("%H:%M:%S"));
        }
    }
}
