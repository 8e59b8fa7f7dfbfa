//! CLI command implementations
//!
//! Each invocation assembles the full stack from configuration, runs
//! one command against it, and exits. `serve` keeps the stack alive
//! behind the HTTP surface with the scheduler and status sweeper
//! running beside it.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::audit::{AuditAction, AuditEntry, AuditSink, MemoryAuditLog};
use crate::backup::scheduler::{self, BackupSchedule};
use crate::backup::{retention, BackupOrchestrator, BackupOutcome};
use crate::checksum;
use crate::config::AppConfig;
use crate::errors::OrchestratorError;
use crate::flight::FlightControl;
use crate::http_server::{self, BackupApiState, SettingsApiState};
use crate::notify::build_notifier;
use crate::process::SystemRunner;
use crate::restore::{tracker, RestoreOrchestrator, RestoreState, RestoreTracker};
use crate::settings::InMemorySettingsStore;
use crate::storage::{MetadataLedger, StorageLayout};
use crate::workspace::{FixedWorkspaceResolver, Principal};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// How often the sweeper drops expired restore statuses under `serve`
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function the binary should call.
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command).await
}

/// Run the appropriate command based on CLI args
pub async fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(config.as_deref()).await,
        Command::Backup { config } => backup(config.as_deref()).await,
        Command::Restore {
            backup_id,
            yes,
            config,
        } => restore(config.as_deref(), &backup_id, yes).await,
        Command::History { limit, config } => history(config.as_deref(), limit).await,
        Command::Verify { backup_id, config } => verify(config.as_deref(), &backup_id).await,
        Command::Cleanup { config } => cleanup(config.as_deref()).await,
    }
}

/// The assembled stack every command operates on
struct Stack {
    config: AppConfig,
    layout: StorageLayout,
    ledger: Arc<MetadataLedger>,
    settings: Arc<InMemorySettingsStore>,
    audit: Arc<MemoryAuditLog>,
    backup: Arc<BackupOrchestrator>,
    restore: Arc<RestoreOrchestrator>,
    tracker: RestoreTracker,
    schedule: BackupSchedule,
}

fn build_stack(config_path: Option<&Path>) -> CliResult<Stack> {
    let config = AppConfig::load_or_default(config_path)?;

    let layout = StorageLayout::new(config.storage_root_path());
    layout
        .ensure_directories()
        .map_err(|e| CliError::io("creating storage directories", e))?;

    let ledger = Arc::new(MetadataLedger::new(layout.ledger_path(), config.ledger_cap));
    let flights = FlightControl::new();
    let runner = Arc::new(SystemRunner::new(config.output_cap_bytes));
    let settings = Arc::new(InMemorySettingsStore::from_config(&config));
    let notifier = build_notifier(&config, settings.clone())?;
    let audit = Arc::new(MemoryAuditLog::default());

    let backup = Arc::new(BackupOrchestrator::new(
        &config,
        layout.clone(),
        ledger.clone(),
        flights.clone(),
        runner.clone(),
        Arc::new(FixedWorkspaceResolver::new(&config.default_tenant)),
        notifier.clone(),
        settings.clone(),
    )?);

    let restore_tracker = RestoreTracker::new(config.tracker_grace());
    let restore = Arc::new(RestoreOrchestrator::new(
        &config,
        layout.clone(),
        flights,
        runner,
        notifier,
        audit.clone(),
        restore_tracker.clone(),
        backup.clone(),
    )?);

    let schedule = BackupSchedule::from_config(&config)?;

    Ok(Stack {
        config,
        layout,
        ledger,
        settings,
        audit,
        backup,
        restore,
        tracker: restore_tracker,
        schedule,
    })
}

/// Operator identity for audit entries: the local login name
fn local_principal() -> Principal {
    Principal::operator(whoami::username())
}

/// Start the HTTP API with the scheduler and sweeper beside it
async fn serve(config_path: Option<&Path>) -> CliResult<()> {
    let stack = build_stack(config_path)?;
    let addr = stack.config.listen_socket_addr()?;

    tokio::spawn(scheduler::run(stack.schedule.clone(), stack.backup.clone()));
    tokio::spawn(tracker::run_sweeper(stack.tracker.clone(), SWEEP_INTERVAL));

    let app = http_server::build_router(
        Arc::new(BackupApiState::new(
            stack.backup.clone(),
            stack.audit.clone(),
            stack.schedule.clone(),
        )),
        stack.restore.clone(),
        Arc::new(SettingsApiState::new(
            stack.settings.clone(),
            stack.audit.clone(),
        )),
    );

    http_server::serve(addr, app)
        .await
        .map_err(|e| CliError::io("http server", e))
}

/// Run one backup and print the record
async fn backup(config_path: Option<&Path>) -> CliResult<()> {
    let stack = build_stack(config_path)?;
    let principal = local_principal();

    let record = stack.backup.execute_backup(&principal).await?;

    stack
        .audit
        .record(
            AuditEntry::builder(AuditAction::BackupCreated, &principal.id)
                .backup_id(&record.id)
                .detail(format!("{} bytes", record.file_size))
                .build(),
        )
        .await;

    println!("backup {} complete", record.id);
    println!("  database: {}", record.database_name);
    println!("  artifact: {}", record.file_path);
    println!("  size:     {} bytes", record.file_size);
    println!("  checksum: {}", record.checksum);
    Ok(())
}

/// Restore a backup, following the tracker until it finishes
async fn restore(config_path: Option<&Path>, backup_id: &str, yes: bool) -> CliResult<()> {
    let stack = build_stack(config_path)?;

    if !yes {
        confirm_restore(backup_id)?;
    }

    let principal = local_principal();
    let restore_id = stack.restore.execute_restore(backup_id, &principal).await?;
    info!(restore_id, backup_id, "restore started from the command line");

    let mut last_progress = None;
    loop {
        let Some(status) = stack.restore.restore_status(&restore_id) else {
            return Err(CliError::aborted(format!(
                "restore {} status expired before it finished",
                restore_id
            )));
        };

        if last_progress != Some(status.progress) {
            println!("  {:>3}% {}", status.progress, status.message);
            last_progress = Some(status.progress);
        }

        if status.is_terminal() {
            if status.state == RestoreState::Failed {
                return Err(CliError::aborted(
                    status
                        .error_message
                        .unwrap_or_else(|| "restore failed".to_string()),
                ));
            }
            println!("restore {} completed", restore_id);
            return Ok(());
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Typed confirmation before the destructive restore
fn confirm_restore(backup_id: &str) -> CliResult<()> {
    let phrase = format!("restore {}", backup_id);
    println!("WARNING: this overwrites the live database with the backup contents.");
    println!("A safety snapshot is taken first; a failed restore is not rolled back.");
    print!("Type '{}' to continue: ", phrase);
    std::io::stdout()
        .flush()
        .map_err(|e| CliError::io("writing prompt", e))?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| CliError::io("reading confirmation", e))?;

    if line.trim().to_lowercase() != phrase.to_lowercase() {
        return Err(CliError::aborted(
            "confirmation phrase did not match, nothing restored",
        ));
    }
    Ok(())
}

/// Print recent ledger records, newest first
async fn history(config_path: Option<&Path>, limit: usize) -> CliResult<()> {
    let stack = build_stack(config_path)?;

    let mut records = stack.ledger.load_all().await?;
    records.reverse();
    records.truncate(limit);

    if records.is_empty() {
        println!("no backups recorded");
        return Ok(());
    }

    for record in records {
        let when = record.timestamp.format("%Y-%m-%d %H:%M:%S");
        match record.status {
            BackupOutcome::Success => println!(
                "{}  {}  {:>12} bytes  {}",
                when, record.id, record.file_size, record.file_path
            ),
            BackupOutcome::Failed => println!(
                "{}  {}  failed: {}",
                when,
                record.id,
                record.error_message.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    Ok(())
}

/// Re-verify one artifact against its recorded checksum
async fn verify(config_path: Option<&Path>, backup_id: &str) -> CliResult<()> {
    let stack = build_stack(config_path)?;

    let record = stack
        .ledger
        .find(backup_id)
        .await?
        .ok_or_else(|| OrchestratorError::not_found(backup_id))?;

    if !record.is_success() {
        return Err(CliError::aborted(format!(
            "backup {} did not complete successfully and has no artifact",
            backup_id
        )));
    }

    let intact = checksum::verify_file(Path::new(&record.file_path), &record.checksum)
        .await
        .map_err(|e| CliError::io("reading backup artifact", e))?;

    if intact {
        println!(
            "backup {} verified, artifact matches its recorded checksum",
            backup_id
        );
        Ok(())
    } else {
        Err(CliError::aborted(format!(
            "backup {} failed verification, artifact does not match its recorded checksum",
            backup_id
        )))
    }
}

/// Run retention cleanup now
async fn cleanup(config_path: Option<&Path>) -> CliResult<()> {
    let stack = build_stack(config_path)?;
    let principal = local_principal();

    let report = retention::run_cleanup(&stack.ledger, &stack.layout, stack.settings.as_ref()).await?;

    stack
        .audit
        .record(
            AuditEntry::builder(AuditAction::CleanupRun, &principal.id)
                .detail(format!(
                    "deleted={}, retained={}",
                    report.deleted_count, report.retained_count
                ))
                .build(),
        )
        .await;

    println!(
        "cleanup removed {} expired backups, {} retained",
        report.deleted_count, report.retained_count
    );
    if report.missing_count > 0 {
        println!(
            "  {} expired records had no artifact left on disk",
            report.missing_count
        );
    }
    Ok(())
}
