use chrono::Utc;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;
use factory::FactoryError;
use factory::dispatch::Dispatcher;
use factory::domain::{OutcomeRecord, Role, WorkItem};
use factory::profile::BehaviorRegistry;
use factory::retrospective::{ProposalCategory, RetrospectiveEngine};
use factory::status::{Health, StatusAggregator, scan};
use factory::storage::MemoryDir;
use factory::tracker::{GhCliTracker, Tracker};

const RULE_WIDTH: usize = 60;

fn setup_logging(log_level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("factory")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("factory.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = log_level
        && std::env::var_os("RUST_LOG").is_none()
    {
        builder.parse_filters(level);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn print_items(items: &[WorkItem], max: usize) {
    for item in items.iter().take(max) {
        println!("     #{}: {}", item.id, truncate(&item.title, 40));
    }
    if items.len() > max {
        println!("     ... and {} more", items.len() - max);
    }
}

fn tracker(config: &Config) -> Arc<dyn Tracker> {
    Arc::new(GhCliTracker::new(config.tracker.gh_cli()))
}

fn memory_dir(config: &Config) -> MemoryDir {
    MemoryDir::new(&config.storage.memory_dir)
}

fn registry(config: &Config) -> BehaviorRegistry {
    BehaviorRegistry::new(&config.storage.profiles_dir)
}

async fn run_application(cli: &Cli, config: &Config) -> Result<ExitCode> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Dispatch { item, role, review } => handle_dispatch_command(*item, role, *review, config).await,
        Commands::Retrospective { apply } => handle_retrospective_command(*apply, config).await,
        Commands::Scan { source } => handle_scan_command(source.as_deref(), config).await,
        Commands::Status => handle_status_command(config).await,
        Commands::Outcome {
            item,
            role,
            result,
            reason,
        } => handle_outcome_command(*item, role, result, reason.as_deref(), config),
    }
}

async fn handle_dispatch_command(item: u64, role: &str, review: bool, config: &Config) -> Result<ExitCode> {
    info!("Dispatching #{} to {} (review: {})", item, role, review);

    let registry = registry(config);
    let available = registry.available();
    let dispatcher =
        Dispatcher::new(tracker(config), registry, memory_dir(config)).with_options(config.dispatch_options());

    let record = match dispatcher.dispatch(item, role, review).await {
        Ok(record) => record,
        Err(e @ FactoryError::InvalidRole(_)) => {
            eprintln!("{} {}", "Error:".red(), e);
            eprintln!("Valid roles: {}", Role::valid_names());
            return Ok(ExitCode::FAILURE);
        }
        Err(e @ FactoryError::UnknownRole(_)) => {
            eprintln!("{} {}", "Error:".red(), e);
            if available.is_empty() {
                eprintln!("No profiles found in {}", config.storage.profiles_dir.display());
            } else {
                let names: Vec<&str> = available.iter().map(|r| r.as_str()).collect();
                eprintln!("Profiles available: {}", names.join(", "));
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context(format!("Failed to dispatch #{}", item)),
    };

    let assignment = fs::read_to_string(&record.prompt_file)
        .context(format!("Failed to read assignment {}", record.prompt_file.display()))?;

    println!("{}", rule('='));
    println!("{}", "FACTORY DISPATCH".bold());
    println!("{}", rule('='));
    println!("Item: #{}", record.item);
    println!("Role: {}", record.role.to_string().cyan());
    println!("{}", rule('='));
    println!();
    println!("{}", assignment);
    println!("{}", rule('='));
    println!("{} {}", "Assignment saved to:".green(), record.prompt_file.display());
    Ok(ExitCode::SUCCESS)
}

async fn handle_retrospective_command(apply: bool, config: &Config) -> Result<ExitCode> {
    info!("Running retrospective (apply: {})", apply);

    let engine = RetrospectiveEngine::new(tracker(config), registry(config), memory_dir(config))
        .with_recent_limit(config.retrospective.recent_limit);
    let summary = engine.run(apply).await.context("Retrospective failed")?;

    println!("{}", rule('='));
    println!("{}", "SOFTWARE FACTORY - RETROSPECTIVE".bold());
    println!("{}", rule('='));
    println!("   Outcomes analyzed: {}", summary.tasks_analyzed);
    if summary.skipped_lines > 0 {
        println!("   {}", format!("Malformed lines skipped: {}", summary.skipped_lines).yellow());
    }
    println!("   Closed issues: {}", summary.activity.closed_issues);
    println!("   Merged review requests: {}", summary.activity.merged_reviews);
    println!();

    if summary.proposals.is_empty() {
        println!("{}", "No issues found. Factory is running well!".green());
    } else {
        println!(
            "{}",
            format!("Found {} improvement opportunities:", summary.proposals.len()).yellow()
        );
        for proposal in &summary.proposals {
            let tag = match proposal.category {
                ProposalCategory::Pattern => "pattern".magenta(),
                ProposalCategory::Metric => "metric".blue(),
            };
            println!("   - [{}] {}", tag, proposal.problem);
        }
    }

    for change in &summary.applied {
        println!("{} {} profile: {}", "Applied to".green(), change.role, change.item);
    }
    println!();
    println!("Report written to {}", summary.report_path.display());
    Ok(ExitCode::SUCCESS)
}

async fn handle_scan_command(source: Option<&str>, config: &Config) -> Result<ExitCode> {
    let mut gh = config.tracker.gh_cli();
    if let Some(source) = source {
        gh.repo = Some(source.to_string());
    }
    info!("Scanning {:?}", gh.repo);

    let result = scan(&GhCliTracker::new(gh)).await.context("Scan failed")?;

    println!("{}", rule('='));
    println!("{}", "SOFTWARE FACTORY - SCAN".bold());
    println!("{}", rule('='));

    println!("\n{}\n", "READY ISSUES (waiting for work):".cyan());
    if result.ready.is_empty() {
        println!("  No issues labeled 'ready'");
    }
    for item in &result.ready {
        println!("  #{}: {}", item.id, item.title);
    }

    println!("\n{}\n", "REVIEW REQUESTS NEEDING REVIEW:".cyan());
    if result.reviews.is_empty() {
        println!("  No review requests labeled 'review'");
    }
    for item in &result.reviews {
        println!("  #{}: {}", item.id, item.title);
    }

    println!("\n{}", rule('='));
    println!("Total actionable items: {}", result.actionable());

    Ok(if result.actionable() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn handle_status_command(config: &Config) -> Result<ExitCode> {
    let view = StatusAggregator::new(tracker(config), memory_dir(config))
        .with_recent_merges(config.status.recent_merges)
        .snapshot()
        .await
        .context("Failed to gather status")?;

    println!("{}", rule('='));
    println!("{}", "SOFTWARE FACTORY STATUS".bold());
    println!("   {}", view.generated_at.format("%Y-%m-%d %H:%M UTC"));
    println!("{}", rule('='));

    println!("\n{}", "ISSUE QUEUE".cyan());
    println!("{}", rule('-'));
    println!("   Ready:       {}", view.ready.len());
    println!("   In Progress: {}", view.in_progress.len());
    println!("   Blocked:     {}", view.blocked.len());
    if !view.ready.is_empty() {
        println!("\n   Ready issues:");
        print_items(&view.ready, 5);
    }
    if !view.in_progress.is_empty() {
        println!("\n   In progress:");
        print_items(&view.in_progress, usize::MAX);
    }
    if !view.blocked.is_empty() {
        println!("\n   {}", "Blocked:".red());
        print_items(&view.blocked, usize::MAX);
    }

    println!("\n{}", "REVIEW REQUESTS".cyan());
    println!("{}", rule('-'));
    println!("   Open: {}", view.open_reviews.len());
    print_items(&view.open_reviews, usize::MAX);
    if !view.recent_merges.is_empty() {
        println!("\n   Recently merged:");
        print_items(&view.recent_merges, usize::MAX);
    }

    println!("\n{}", "METRICS".cyan());
    println!("{}", rule('-'));
    println!("   Total dispatches logged: {}", view.dispatch_count);
    println!("   Outcomes recorded: {}", view.outcomes.total);
    if view.outcomes.total > 0 {
        let results: Vec<String> = view.outcomes.by_result.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        let roles: Vec<String> = view.outcomes.by_role.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        println!("   By result: {}", results.join(", "));
        println!("   By role: {}", roles.join(", "));
    }

    println!("\n{}", "HEALTH".cyan());
    println!("{}", rule('-'));
    match &view.health {
        Health::Healthy => println!("   {}", "All systems nominal".green()),
        Health::Unhealthy(concerns) => {
            for concern in concerns {
                println!("   {}", concern.to_string().yellow());
            }
        }
    }

    println!("\n{}", rule('='));
    println!("Total actionable items: {}", view.actionable());
    println!("Next: {}", view.next_step());
    println!("{}", rule('='));
    Ok(ExitCode::SUCCESS)
}

fn handle_outcome_command(item: u64, role: &str, result: &str, reason: Option<&str>, config: &Config) -> Result<ExitCode> {
    let role: Role = role.parse().context("Invalid outcome role")?;

    let mut record = OutcomeRecord::new(result, role)
        .with_item(item)
        .with_timestamp(Utc::now());
    if let Some(reason) = reason {
        record = record.with_reason(reason);
    }

    let log = memory_dir(config).outcome_log();
    log.append(&record.clone().into())
        .context(format!("Failed to append to {}", log.path().display()))?;

    info!("Recorded outcome {} for #{} ({})", record.result, item, role);
    println!("{} #{} {} ({})", "Recorded:".green(), item, record.result, role);
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging at the configured level
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")
}
