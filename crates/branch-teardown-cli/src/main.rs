//! Branch Tear-Down CLI
//!
//! The `branch-teardown` command triggers clean-up jobs for deleted branch jobs.
//!
//! ## Commands
//!
//! - `config`: show or change the global tear-down job
//! - `resolve`: print which job a deletion would trigger
//! - `notify`: handle one deletion event
//! - `listen`: handle newline-delimited deletion events from stdin

use anyhow::{Context, Result};
use branch_teardown::fakes::MemoryJobRegistry;
use branch_teardown::{
    resolve, DeletedItem, GitWorkspaceReader, GlobalConfig, GlobalConfigFile, ItemListener,
    JenkinsRegistry, JobRegistry, ListenerOutcome, TearDownListener, TearDownPlan,
    DEFAULT_CONFIG_FILE,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "branch-teardown")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trigger tear-down jobs for deleted multi-branch pipeline branches", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Global configuration file
    #[arg(long, global = true, env = "TEARDOWN_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the global tear-down job
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the tear-down job a deletion would trigger
    Resolve {
        /// Job name declared by the pipeline, if any
        #[arg(long = "override")]
        declared: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Handle a single deletion event (JSON)
    Notify {
        /// Event file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: PathBuf,

        #[command(flatten)]
        handling: HandlingArgs,
    },

    /// Handle newline-delimited deletion events from stdin until EOF
    Listen {
        #[command(flatten)]
        handling: HandlingArgs,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configured global tear-down job
    Show,
    /// Set the global tear-down job
    Set {
        /// Job name (an empty string clears it)
        name: String,
    },
    /// Remove the global tear-down job
    Clear,
}

#[derive(clap::Args, Clone)]
struct HandlingArgs {
    /// Resolve and build parameters, but do not queue anything
    #[arg(long)]
    dry_run: bool,

    /// Where repository URL and branch come from
    #[arg(long, value_enum, default_value_t = ScmSource::Recorded)]
    scm: ScmSource,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ScmSource {
    /// The SCM locator recorded in the event
    Recorded,
    /// The git checkout in the event's workspace directory
    Workspace,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    branch_teardown::init_tracing(cli.json, level);

    let config_file = GlobalConfigFile::new(&cli.config);

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config_file),
            ConfigAction::Set { name } => cmd_config_set(&config_file, &name),
            ConfigAction::Clear => cmd_config_set(&config_file, ""),
        },
        Commands::Resolve { declared, format } => {
            cmd_resolve(&config_file, declared.as_deref(), format)
        }
        Commands::Notify { event, handling } => cmd_notify(&config_file, &event, &handling).await,
        Commands::Listen { handling } => cmd_listen(&config_file, &handling).await,
    }
}

/// Print the configured global tear-down job
fn cmd_config_show(file: &GlobalConfigFile) -> Result<()> {
    let config = file
        .load()
        .with_context(|| format!("Failed to load {}", file.path().display()))?;

    match config.tear_down_job() {
        Some(name) => println!("{}", name),
        None => println!("(not set)"),
    }
    Ok(())
}

/// Set or clear the global tear-down job
fn cmd_config_set(file: &GlobalConfigFile, name: &str) -> Result<()> {
    let config = file
        .load()
        .with_context(|| format!("Failed to load {}", file.path().display()))?;
    config.set_tear_down_job(name);
    file.save(&config)
        .with_context(|| format!("Failed to save {}", file.path().display()))?;

    match config.tear_down_job() {
        Some(name) => println!("Global tear-down job set to '{}'", name),
        None => println!("Global tear-down job cleared"),
    }
    Ok(())
}

/// Print the job a deletion would trigger
fn cmd_resolve(file: &GlobalConfigFile, declared: Option<&str>, format: OutputFormat) -> Result<()> {
    let config = file.load()?;
    let global = config.tear_down_job();
    let target = resolve(declared, global.as_deref());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&target)?),
        OutputFormat::Text => println!("{} (from {})", target.job_name, target.source.as_str()),
    }
    Ok(())
}

/// Handle one deletion event
async fn cmd_notify(file: &GlobalConfigFile, event: &Path, handling: &HandlingArgs) -> Result<()> {
    let raw = read_event_source(event)?;
    let item: DeletedItem = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid deletion event in {}", event.display()))?;

    let listener = build_listener(file, handling)?;
    let line = handle_item(&listener, &item, handling)
        .await
        .with_context(|| format!("Failed to handle deletion of {}", item.full_name()))?;
    println!("{}", line);
    Ok(())
}

/// Handle newline-delimited events from stdin; a bad line never stops the stream
async fn cmd_listen(file: &GlobalConfigFile, handling: &HandlingArgs) -> Result<()> {
    let listener = build_listener(file, handling)?;
    info!(dry_run = handling.dry_run, "listening for deletion events on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut handled = 0u64;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let item: DeletedItem = match serde_json::from_str(&line) {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, "skipping malformed deletion event");
                continue;
            }
        };
        match handle_item(&listener, &item, handling).await {
            Ok(out) => println!("{}", out),
            Err(e) => warn!(deleted_job = %item.full_name(), error = %e, "deletion event not handled"),
        }
        handled += 1;
    }

    info!(events = handled, "stdin closed");
    listener.metrics().flush();
    Ok(())
}

fn read_event_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read event from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn build_listener(file: &GlobalConfigFile, handling: &HandlingArgs) -> Result<TearDownListener> {
    let config = file
        .load()
        .with_context(|| format!("Failed to load {}", file.path().display()))?;

    // A dry run only plans, so the registry is never consulted.
    let registry: Arc<dyn JobRegistry> = if handling.dry_run {
        Arc::new(MemoryJobRegistry::new())
    } else {
        Arc::new(JenkinsRegistry::from_env().context("Failed to configure Jenkins registry")?)
    };

    Ok(listener_with(Arc::new(config), registry, handling.scm))
}

fn listener_with(
    config: Arc<GlobalConfig>,
    registry: Arc<dyn JobRegistry>,
    scm: ScmSource,
) -> TearDownListener {
    let listener = TearDownListener::new(config, registry);
    match scm {
        ScmSource::Recorded => listener,
        ScmSource::Workspace => listener.with_scm_reader(Arc::new(GitWorkspaceReader::new())),
    }
}

/// Dry-run result for one item.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum PlanOutput {
    Ignored { deleted_job: String },
    Planned(TearDownPlan),
}

async fn handle_item(
    listener: &TearDownListener,
    item: &DeletedItem,
    handling: &HandlingArgs,
) -> Result<String> {
    if !handling.dry_run {
        let outcome = listener.on_deleted(item).await;
        return render_outcome(&outcome, handling.format);
    }

    let plan = match item.as_branch_job() {
        Some(job) => PlanOutput::Planned(listener.plan(job)?),
        None => PlanOutput::Ignored {
            deleted_job: item.full_name(),
        },
    };
    match handling.format {
        OutputFormat::Json => Ok(serde_json::to_string(&plan)?),
        OutputFormat::Text => Ok(match plan {
            PlanOutput::Ignored { deleted_job } => format!("ignored {}", deleted_job),
            PlanOutput::Planned(plan) => format!(
                "would trigger {} (from {}) for {} with git_url={} branch_name={}",
                plan.target.job_name,
                plan.target.source.as_str(),
                plan.deleted_job,
                plan.parameters.git_url(),
                plan.parameters.branch_name()
            ),
        }),
    }
}

fn render_outcome(outcome: &ListenerOutcome, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string(outcome)?);
    }

    Ok(match outcome {
        ListenerOutcome::Ignored { deleted_job } => format!("ignored {}", deleted_job),
        ListenerOutcome::Scheduled {
            deleted_job,
            target,
            queue_item,
            ..
        } => format!(
            "✓ scheduled {} for {} ({})",
            target.job_name, deleted_job, queue_item.reference
        ),
        ListenerOutcome::NotFound {
            deleted_job,
            target,
        } => format!(
            "- no job named {} for {}, nothing triggered",
            target.job_name, deleted_job
        ),
        ListenerOutcome::Failed {
            deleted_job,
            target,
            error,
        } => format!("✗ {} for {}: {}", target.job_name, deleted_job, error),
    })
}
