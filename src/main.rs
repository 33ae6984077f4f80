mod config;
mod error;
mod fixer;
mod github;
mod logging;
mod store;
#[cfg(test)]
mod test_utils;
mod watcher;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use config::{CliOverrides, Config};
use error::Result;
use fixer::{FixRequest, FixVariant, Fixer};
use github::client::OctocrabHost;
use github::types::RepoSlug;
use std::path::PathBuf;
use store::processed::ProcessedSet;
use store::supabase::SupabaseStore;
use tokio::sync::watch;
use watcher::poll::PollDriver;

#[derive(Parser)]
#[command(
    name = "forkfix",
    version,
    about = "Fork a repository and open a pull request for an issue"
)]
struct Cli {
    #[arg(long, global = true, help = "Path to a TOML config file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a pull request for a single issue
    Fix {
        #[arg(help = "Upstream repository, e.g. octocat/Hello-World")]
        upstream_repo_name: String,
        #[arg(help = "Issue number on the upstream repository")]
        issue_number: u64,
        #[arg(help = "GitHub token (defaults to GITHUB_TOKEN)")]
        github_token: Option<String>,
        #[arg(long, value_enum)]
        variant: Option<FixVariant>,
        #[arg(long)]
        branch_prefix: Option<String>,
        #[arg(long)]
        base_branch: Option<String>,
    },
    /// Poll the issue table and fix every new issue
    Poll {
        #[arg(long, help = "Seconds between polls")]
        interval: Option<u64>,
        #[arg(long, help = "Stop after this many cycles")]
        max_cycles: Option<u64>,
        #[arg(long, help = "File listing already processed issue URLs")]
        processed: Option<PathBuf>,
        #[arg(long, value_enum)]
        variant: Option<FixVariant>,
    },
}

impl Command {
    fn overrides(&self) -> CliOverrides {
        match self {
            Command::Fix {
                github_token,
                variant,
                branch_prefix,
                base_branch,
                ..
            } => CliOverrides {
                github_token: github_token.clone(),
                variant: *variant,
                branch_prefix: branch_prefix.clone(),
                base_branch: base_branch.clone(),
                ..CliOverrides::default()
            },
            Command::Poll {
                interval,
                max_cycles,
                processed,
                variant,
            } => CliOverrides {
                poll_interval_secs: *interval,
                max_cycles: *max_cycles,
                processed_path: processed.clone(),
                variant: *variant,
                ..CliOverrides::default()
            },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let config = match Config::load(cli.config.as_deref(), cli.command.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.log_level, config.log_format) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    tracing::debug!(?config, "configuration loaded");

    let outcome = match cli.command {
        Command::Fix {
            upstream_repo_name,
            issue_number,
            ..
        } => run_fix(&config, &upstream_repo_name, issue_number).await,
        Command::Poll { .. } => run_poll(&config).await,
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, "aborting");
        std::process::exit(1);
    }
}

/// Usage errors share the exit status of every other failure.
fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

async fn run_fix(config: &Config, upstream: &str, issue_number: u64) -> Result<()> {
    let request = FixRequest {
        upstream: upstream.parse::<RepoSlug>()?,
        issue_number,
    };
    let host = OctocrabHost::new(config.require_token()?, config.github_api_url.as_deref())?;
    let fixer = Fixer::new(host, config.fix_options());

    let pr = fixer.apply(&request).await?;
    println!("Pull Request created successfully: {}", pr.url);
    Ok(())
}

async fn run_poll(config: &Config) -> Result<()> {
    let host = OctocrabHost::new(config.require_token()?, config.github_api_url.as_deref())?;
    let fixer = Fixer::new(host, config.fix_options());

    let (url, key) = config.require_store()?;
    let store = SupabaseStore::new(url, key, &config.store_table)?
        .with_order_column(config.store_order_column.clone());
    let ledger = ProcessedSet::new(&config.processed_path);
    let processed_display = ledger.path().display().to_string();

    let driver = PollDriver::new(store, fixer, ledger, config.poll_interval())
        .with_max_cycles(config.max_cycles);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing current cycle");
            let _ = stop_tx.send(true);
        }
    });

    tracing::info!(
        table = %config.store_table,
        interval_secs = config.poll_interval_secs,
        processed = %processed_display,
        "starting issue poller"
    );
    driver.run(stop_rx).await;
    Ok(())
}
