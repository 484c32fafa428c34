//! opp - stacked pull requests for git and GitHub

mod cli;

use anstream::eprintln;
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use cli::style::Stylize;
use opp::types::MergeMethod;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter
const LOG_ENV: &str = "OPP_LOG";

#[derive(Parser)]
#[command(name = "opp", version, about = "Stacked pull requests for git and GitHub")]
struct Cli {
    /// Run as if opp was started in this directory
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    path: Option<PathBuf>,

    /// Print debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure opp for this repository
    Init {
        /// Accept the detected settings without prompting
        #[arg(short, long)]
        yes: bool,
    },

    /// Open a PR with the commits between the stack and a revision
    #[command(visible_aliases = ["new", "pull-request"])]
    Pr {
        /// Revision to open the PR for (defaults to HEAD)
        revision: Option<String>,
        /// Branch or PR to stack the new PR onto
        #[arg(long)]
        base: Option<String>,
        /// Open the PR as a draft
        #[arg(long)]
        draft: bool,
        /// Check out the PR branch afterwards
        #[arg(long)]
        checkout: bool,
        /// Choose the commits to include in an interactive rebase
        #[arg(short, long)]
        interactive: bool,
        /// Move the PR's commits off the current branch
        #[arg(short = 'x', long)]
        extract: bool,
    },

    /// Push a PR and the PRs it depends on
    #[command(visible_aliases = ["up", "p"])]
    Push {
        /// PR to push (defaults to the current branch)
        pr: Option<String>,
    },

    /// Rebase a PR and the PRs it depends on
    #[command(visible_aliases = ["reb", "r", "pull"])]
    Rebase {
        /// PR to rebase (defaults to the current branch)
        pr: Option<String>,
    },

    /// Merge a PR at the bottom of its stack
    #[command(visible_alias = "m")]
    Merge {
        /// PR to merge (defaults to the current branch)
        pr: Option<String>,
        /// Override github.merge_method
        #[arg(long, value_enum)]
        method: Option<MethodArg>,
    },

    /// Remove PRs that were merged, closed or deleted remotely
    #[command(visible_alias = "gc")]
    Clean {
        /// Number of PRs checked concurrently
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Show local PR stacks
    #[command(visible_alias = "s")]
    Status,

    /// Abandon a PR, deleting its branches
    #[command(visible_alias = "abandon")]
    Close {
        /// PR to close (defaults to the current branch)
        pr: Option<String>,
    },

    /// Switch to a PR branch
    #[command(visible_alias = "co")]
    Checkout {
        /// PR number or branch, such as 12 or pr/12
        pr: String,
    },

    /// Manage the current branch
    #[command(visible_alias = "b", subcommand)]
    Branch(BranchCommand),

    /// Comment on a PR
    Comment {
        /// Comment text
        body: String,
        /// PR to comment on (defaults to the current branch)
        #[arg(long)]
        pr: Option<String>,
    },
}

#[derive(Subcommand)]
enum BranchCommand {
    /// Tag the current branch, e.g. with a ticket id
    #[command(visible_alias = "t")]
    Tag {
        /// Tag to store
        tag: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Merge,
    Squash,
    Rebase,
}

impl From<MethodArg> for MergeMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Merge => Self::Merge,
            MethodArg::Squash => Self::Squash,
            MethodArg::Rebase => Self::Rebase,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e
                .downcast_ref::<opp::Error>()
                .is_some_and(opp::Error::is_invariant_violation)
            {
                eprintln!("{} {e:#}", "fatal:".error());
                std::process::abort();
            }
            eprintln!("{} {e:#}", "error:".error());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "opp=debug" } else { "opp=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let start = match cli.path {
        Some(path) => path,
        None => std::env::current_dir().context("cannot read the current directory")?,
    };
    let root = opp::git::GitRepo::discover(&start)
        .await
        .with_context(|| format!("{} is not inside a git repository", start.display()))?;

    match cli.command {
        Commands::Init { yes } => cli::init::run_init(&root, yes).await?,
        Commands::Pr {
            revision,
            base,
            draft,
            checkout,
            interactive,
            extract,
        } => {
            let options = opp::submit::CreateOptions {
                revision,
                base,
                draft,
                checkout,
                interactive,
                extract,
            };
            cli::pr::run_pr(&root, options).await?;
        }
        Commands::Push { pr } => cli::push::run_push(&root, pr.as_deref()).await?,
        Commands::Rebase { pr } => cli::rebase::run_rebase(&root, pr.as_deref()).await?,
        Commands::Merge { pr, method } => {
            cli::merge::run_merge(&root, pr.as_deref(), method.map(Into::into)).await?;
        }
        Commands::Clean { jobs } => cli::clean::run_clean(&root, jobs).await?,
        Commands::Status => cli::status::run_status(&root).await?,
        Commands::Close { pr } => cli::close::run_close(&root, pr.as_deref()).await?,
        Commands::Checkout { pr } => cli::checkout::run_checkout(&root, &pr).await?,
        Commands::Branch(BranchCommand::Tag { tag }) => {
            cli::branch::run_tag(&root, &tag).await?;
        }
        Commands::Comment { body, pr } => {
            cli::comment::run_comment(&root, pr.as_deref(), &body).await?;
        }
    }
    Ok(())
}
