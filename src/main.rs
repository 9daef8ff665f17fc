// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use bid_analyzer::models::SectionKind;
use bid_analyzer::utils::logging::{
    format_error, format_info, format_step, format_success, format_warning,
};
use bid_analyzer::utils::{TaskBar, TaskProgressBars};
use bid_analyzer::{
    Config, OperationTimer, TaskId, TaskOptions, TaskScheduler, TaskStatus, TaskView, Validator,
};
use clap::{ArgAction, Parser, Subcommand};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "bid_analyzer")]
#[command(version)]
#[command(about = "Concurrent tender document analysis", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single tender document and show live progress
    Analyze {
        file: PathBuf,

        /// Print the final task view as JSON
        #[arg(long)]
        json: bool,

        /// Skip rendering the Markdown report
        #[arg(long)]
        no_report: bool,

        /// Name used in the report instead of the file name
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },

    /// Analyze every supported document in a directory
    Batch {
        dir: PathBuf,

        #[arg(long, value_name = "NUM")]
        limit: Option<usize>,
    },

    /// Print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    bid_analyzer::utils::logging::init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::default_config()
    };

    match cli.command {
        Commands::Analyze {
            file,
            json,
            no_report,
            name,
        } => {
            let options = TaskOptions {
                display_name: name,
                render_report: !no_report,
            };
            cmd_analyze(&config, &file, options, json, cli.color).await?;
        }
        Commands::Batch { dir, limit } => {
            cmd_batch(&config, &dir, limit, cli.color).await?;
        }
        Commands::CheckConfig => {
            cmd_check_config(&config)?;
        }
    }

    Ok(())
}

fn start_scheduler(config: &Config) -> Result<TaskScheduler> {
    let scheduler =
        TaskScheduler::from_config(config).context("Failed to initialize task scheduler")?;
    scheduler.spawn_janitor(
        Duration::from_secs(config.scheduler.cleanup_interval_secs.max(1)),
        config.scheduler.task_retention_hours,
    );

    let on_interrupt = scheduler.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running tasks");
            on_interrupt.shutdown();
        }
    });

    Ok(scheduler)
}

async fn cmd_analyze(
    config: &Config,
    file: &Path,
    options: TaskOptions,
    json: bool,
    colored: bool,
) -> Result<()> {
    let scheduler = start_scheduler(config)?;
    let id = scheduler
        .submit(file, options)
        .await
        .with_context(|| format!("Failed to submit {}", file.display()))?;
    info!("Task {} submitted", id);

    let bars = TaskProgressBars::new(colored);
    let bar = bars.add(&display_label(file));
    let view = follow(&scheduler, &id, &bar).await?;
    scheduler.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_summary(&view);
    }

    if view.status == TaskStatus::Failed {
        anyhow::bail!("Analysis of {} failed", file.display());
    }
    Ok(())
}

async fn cmd_batch(config: &Config, dir: &Path, limit: Option<usize>, colored: bool) -> Result<()> {
    Validator::validate_directory(dir)?;

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| Validator::is_supported_document(path))
        .collect();
    files.sort();
    if let Some(limit) = limit {
        files.truncate(limit);
    }

    if files.is_empty() {
        println!("{}", format_warning("No supported documents found"));
        return Ok(());
    }

    let timer = OperationTimer::new(&format!("batch analysis of {}", dir.display()));
    let scheduler = start_scheduler(config)?;
    info!(
        "Found {} documents, running {} at a time",
        files.len(),
        scheduler.max_workers()
    );
    let bars = TaskProgressBars::new(colored);

    let mut submitted = Vec::new();
    for file in &files {
        match scheduler.submit(file, TaskOptions::default()).await {
            Ok(id) => submitted.push((id, bars.add(&display_label(file)))),
            Err(e) => println!(
                "{}",
                format_error(&format!("Skipping {}: {}", file.display(), e))
            ),
        }
    }

    let views = join_all(
        submitted
            .iter()
            .map(|(id, bar)| follow(&scheduler, id, bar)),
    )
    .await;
    scheduler.shutdown();
    timer.finish_with_count(submitted.len());

    let mut completed = 0;
    let mut failed = 0;
    let total = views.len();
    for (index, outcome) in views.into_iter().enumerate() {
        let Ok(view) = outcome else {
            failed += 1;
            continue;
        };
        match view.status {
            TaskStatus::Completed => completed += 1,
            _ => failed += 1,
        }
        println!("\n{}", format_step(index + 1, total, &view.document));
        print_summary(&view);
    }

    println!(
        "\n{}",
        format_info(&format!(
            "Batch finished: {} completed, {} failed, {} skipped",
            completed,
            failed,
            files.len() - submitted.len()
        ))
    );
    Ok(())
}

fn cmd_check_config(config: &Config) -> Result<()> {
    config.validate()?;
    println!("{}", serde_json::to_string_pretty(config)?);
    println!("{}", format_success("Configuration is valid"));
    Ok(())
}

/// Polls the task until it is terminal, mirroring progress onto `bar`.
async fn follow(scheduler: &TaskScheduler, id: &TaskId, bar: &TaskBar) -> Result<TaskView> {
    loop {
        let view = scheduler.status(id)?;
        if view.status.is_terminal() {
            bar.finish(&view);
            return Ok(view);
        }
        bar.update(&view);
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn display_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary(view: &TaskView) {
    println!("\n{}", "=".repeat(80));
    println!("Task:     {}", view.task_id);
    println!("Document: {}", view.document);
    println!("Step:     {}", view.step);

    let status_line = format!("Status: {}", view.status);
    match view.status {
        TaskStatus::Completed if view.errors.is_empty() => {
            println!("{}", format_success(&status_line))
        }
        TaskStatus::Completed => println!("{}", format_warning(&status_line)),
        _ => println!("{}", format_error(&status_line)),
    }

    if let Some(result) = &view.result {
        for kind in SectionKind::ALL {
            let mark = if result.is_section_populated(kind) {
                "extracted"
            } else {
                "missing"
            };
            println!("  {:<24} {}", kind.as_str(), mark);
        }
        for note in &result.processing_notes {
            println!("  note: {}", note);
        }
    }

    if let Some(location) = &view.artifact_location {
        println!("Report:   {}", location);
    }
    for error in &view.errors {
        println!("{}", format_error(error));
    }
}
