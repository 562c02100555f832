use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use lifequest_core::domain::{RefreshPolicy, Timestamp, parse_timestamp};
use lifequest_core::impls::{FixedPrompt, FsDocumentStore, NoPrompt, OffsetPrompt};
use lifequest_core::observability::init_tracing;
use lifequest_core::ports::{DocumentId, PromptProvider};
use lifequest_core::schedule::{ReferenceTimes, compute_next_due};
use lifequest_core::{App, AppBuilder, Config};

mod prompt;

#[derive(Parser)]
#[command(name = "lifequest", version, about = "Recurring life tasks with rewards and leveling")]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "lifequest.toml")]
    config: PathBuf,

    /// Vault root; overrides `[vault] root`.
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler loop until Ctrl-C
    Run {
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },
    /// Complete a task
    Complete {
        /// Task document (vault path, or name under the task folder)
        doc: String,
        /// Next due time for a manual task (skips the prompt)
        #[arg(long, value_parser = timestamp_arg, conflicts_with = "after_hours")]
        next_due: Option<Timestamp>,
        /// Manual task becomes due this many hours after completion
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        after_hours: Option<u32>,
        /// Never prompt; manual tasks are left awaiting input
        #[arg(long)]
        no_prompt: bool,
    },
    /// Answer a pending manual task
    Supply {
        doc: String,
        #[arg(value_parser = timestamp_arg)]
        due: Timestamp,
    },
    /// Print task counts
    Status,
    /// Print the effective configuration (TOML)
    Config,
    /// Evaluate a refresh policy without a vault
    NextDue {
        /// 定时 / 固定间隔 / 每次指定时间
        #[arg(long)]
        policy: String,
        /// e.g. 每天8时, 每周一, 每月1日
        #[arg(long)]
        schedule: Option<String>,
        /// e.g. 2小时, 3天, 1周, 1月
        #[arg(long)]
        interval: Option<String>,
        /// 上一次完成时间 / 上一次刷新时间
        #[arg(long)]
        base: Option<String>,
        /// Reference time ("now" and the completion time)
        #[arg(long, value_parser = timestamp_arg)]
        at: Timestamp,
        /// Current cycle start (defaults to --at)
        #[arg(long, value_parser = timestamp_arg)]
        cycle_start: Option<Timestamp>,
    },
}

fn timestamp_arg(raw: &str) -> Result<Timestamp, String> {
    parse_timestamp(raw).ok_or_else(|| format!("unrecognized timestamp: {raw}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `跑步` -> `游戏/任务/跑步.md`; vault paths pass through.
fn resolve_doc(config: &Config, doc: &str) -> DocumentId {
    if doc.contains('/') {
        return DocumentId::new(doc);
    }
    let name = doc.strip_suffix(".md").unwrap_or(doc);
    DocumentId::new(format!("{}{name}.md", config.vault.task_prefix))
}

fn build_app(config: Config, prompt: Arc<dyn PromptProvider>) -> Result<App> {
    let store = Arc::new(FsDocumentStore::new(config.vault.root.clone()));
    let app = AppBuilder::new(config).store(store).prompt(prompt).build()?;
    Ok(app)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(vault) = cli.vault {
        config.vault.root = vault;
    }
    init_tracing(Some(config.logging.level.as_str()))?;

    match cli.command {
        Commands::Run { once } => {
            let app = build_app(config, Arc::new(NoPrompt))?;
            if once {
                print_json(&app.tick().await)?;
                return Ok(());
            }
            let scheduler = app.spawn_scheduler();
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            scheduler.shutdown_and_join().await;
        }
        Commands::Complete {
            doc,
            next_due,
            after_hours,
            no_prompt,
        } => {
            let prompt: Arc<dyn PromptProvider> = match (next_due, after_hours) {
                (Some(at), _) => Arc::new(FixedPrompt::new(at)),
                (None, Some(hours)) => Arc::new(OffsetPrompt::hours(hours)),
                (None, None) if no_prompt || !std::io::stdin().is_terminal() => Arc::new(NoPrompt),
                (None, None) => Arc::new(prompt::StdinPrompt),
            };
            let id = resolve_doc(&config, &doc);
            let app = build_app(config, prompt)?;
            let report = app
                .complete(&id)
                .await
                .with_context(|| format!("completing {id}"))?;
            print_json(&report)?;
        }
        Commands::Supply { doc, due } => {
            let id = resolve_doc(&config, &doc);
            let app = build_app(config, Arc::new(NoPrompt))?;
            let task = app
                .supply_next_due(&id, due)
                .await
                .with_context(|| format!("supplying due time for {id}"))?;
            print_json(&task)?;
        }
        Commands::Status => {
            let app = build_app(config, Arc::new(NoPrompt))?;
            print_json(&app.counts().await?)?;
        }
        Commands::Config => {
            config.validate()?;
            print!("{}", config.to_toml()?);
        }
        Commands::NextDue {
            policy,
            schedule,
            interval,
            base,
            at,
            cycle_start,
        } => {
            let policy = RefreshPolicy::from_fields(
                Some(&policy),
                schedule.as_deref(),
                interval.as_deref(),
                base.as_deref(),
            )?;
            let refs = ReferenceTimes {
                now: at,
                last_completion: Some(at),
                cycle_start: cycle_start.unwrap_or(at),
            };
            print_json(&compute_next_due(&policy, &refs)?)?;
        }
    }

    Ok(())
}
