use super::sync::{build_orchestrator, Environment, PathOverrides, SyncScope};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use qself_config::{default_scheduler_config, SchedulerConfig};
use qself_core::SyncOrchestrator;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Runs `sync` for every configured kind on a cron schedule.
pub struct Scheduler {
    scheduler: JobScheduler,
    orchestrator: Arc<SyncOrchestrator>,
    config: SchedulerConfig,
    // Held for the duration of a run; runs never overlap on the same snapshots
    sync_lock: Arc<Mutex<()>>,
}

impl Scheduler {
    pub async fn new(orchestrator: SyncOrchestrator, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| eyre!("Failed to create scheduler: {}", e))?;

        Ok(Self {
            scheduler,
            orchestrator: Arc::new(orchestrator),
            config,
            sync_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Start the schedule and block until Ctrl-C.
    pub async fn run(mut self) -> Result<()> {
        if self.config.run_on_startup {
            info!(operation = "scheduler_startup", "Running initial sync on startup");
            run_exclusive_sync(&self.orchestrator, &self.sync_lock).await;
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let sync_lock = Arc::clone(&self.sync_lock);
        let job = Job::new_async(self.config.schedule.as_str(), move |_uuid, _lock| {
            let orchestrator = Arc::clone(&orchestrator);
            let sync_lock = Arc::clone(&sync_lock);
            Box::pin(async move {
                info!(operation = "scheduled_sync_start", "Starting scheduled sync");
                run_exclusive_sync(&orchestrator, &sync_lock).await;
            })
        })
        .map_err(|e| eyre!("Invalid schedule '{}': {}", self.config.schedule, e))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| eyre!("Failed to add scheduled job: {}", e))?;
        self.scheduler
            .start()
            .await
            .map_err(|e| eyre!("Failed to start scheduler: {}", e))?;

        info!(
            operation = "scheduler_started",
            schedule = %self.config.schedule,
            kinds = ?self.orchestrator.enabled_kinds(),
            "Scheduler started"
        );

        tokio::signal::ctrl_c().await?;
        info!(operation = "scheduler_shutdown", "Received Ctrl-C; shutting down");

        self.scheduler
            .shutdown()
            .await
            .map_err(|e| eyre!("Failed to stop scheduler: {}", e))?;
        Ok(())
    }
}

/// Run a sync unless one is already in progress. Returns whether it ran.
async fn run_exclusive_sync(orchestrator: &SyncOrchestrator, sync_lock: &Mutex<()>) -> bool {
    let Ok(_guard) = sync_lock.try_lock() else {
        warn!(
            operation = "scheduled_sync_skipped",
            "Previous sync is still running; skipping this run"
        );
        return false;
    };

    run_scheduled_sync(orchestrator).await;
    true
}

/// A failed run is logged and the next scheduled run proceeds as usual.
async fn run_scheduled_sync(orchestrator: &SyncOrchestrator) {
    match orchestrator.sync().await {
        Ok(result) => {
            for report in result.reports() {
                info!(
                    operation = "scheduled_sync_report",
                    kind = report.kind,
                    fetched = report.fetched,
                    total = report.total,
                    saved = report.saved,
                    "Synced {}",
                    report.kind
                );
            }
            info!(
                operation = "scheduled_sync_complete",
                duration_ms = result.duration.as_millis() as u64,
                "Scheduled sync completed"
            );
        }
        Err(e) => {
            error!(operation = "scheduled_sync_error", error = %format!("{:#}", e), "Scheduled sync failed");
        }
    }
}

/// Effective scheduler settings: the config file, then CLI overrides.
pub fn scheduler_config(
    configured: Option<&SchedulerConfig>,
    schedule_override: Option<String>,
    no_startup_sync: bool,
) -> SchedulerConfig {
    let mut config = configured.cloned().unwrap_or_else(default_scheduler_config);
    if let Some(schedule) = schedule_override {
        config.schedule = schedule;
    }
    if no_startup_sync {
        config.run_on_startup = false;
    }
    config
}

pub async fn run_daemon(schedule_override: Option<String>, no_startup_sync: bool, output: &Output) -> Result<()> {
    let env = Environment::load()?;
    let orchestrator = build_orchestrator(&env, SyncScope::All, PathOverrides::default(), false)?;
    let config = scheduler_config(env.config.scheduler.as_ref(), schedule_override, no_startup_sync);

    output.info(format!(
        "Starting daemon ({}); press Ctrl-C to stop",
        config.schedule
    ));

    Scheduler::new(orchestrator, config).await?.run().await?;

    output.success("Daemon stopped");
    Ok(())
}
