//! Wires the three polling cycles and the memory report onto their triggers.
//!
//! ```text
//! message timer  (every N s, delayable)   ─► CheckMessages
//! reminder timer (daily HH:MM, delayable) ─► CheckReminder
//! release cron                            ─► CheckRelease
//! memory cron                             ─► MemoryMonitor::log_report
//! ```
//!
//! A failed cycle is reported through [`Lifecycle::notify_error`] and the
//! trigger keeps going. Cron triggers that fire while the previous run of the
//! same job is still going are skipped.

use crate::app::{CheckMessages, CheckRelease, CheckReminder, Lifecycle};
use crate::core::timer::DelayableTimer;
use crate::utils::error::Result;
use crate::utils::monitor::MemoryMonitor;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};

pub struct Cycles {
    pub check_messages: Arc<CheckMessages>,
    pub check_release: Arc<CheckRelease>,
    pub check_reminder: Arc<CheckReminder>,
}

pub struct Triggers {
    pub message_timer: Arc<DelayableTimer>,
    pub reminder_timer: Arc<DelayableTimer>,
    pub release_cron: String,
    pub memory_cron: String,
}

/// 執行中的排程，關閉時需呼叫 `shutdown`
pub struct RunningScheduler {
    cron: JobScheduler,
    timers: Vec<JoinHandle<()>>,
}

impl RunningScheduler {
    pub async fn shutdown(mut self) -> Result<()> {
        for handle in &self.timers {
            handle.abort();
        }
        self.cron.shutdown().await?;
        tracing::info!("🛑 Scheduler stopped");
        Ok(())
    }
}

/// Runs `cycle` unless another run holding `running` is still in flight.
/// Returns whether the cycle ran.
async fn run_exclusive<F>(running: &Mutex<()>, name: &str, cycle: F) -> bool
where
    F: Future<Output = ()>,
{
    let Ok(_guard) = running.try_lock() else {
        tracing::warn!("⏭️ {} still running, skipping this trigger", name);
        return false;
    };
    cycle.await;
    true
}

pub async fn start_scheduler(
    cycles: Cycles,
    triggers: Triggers,
    lifecycle: Lifecycle,
    monitor: Arc<MemoryMonitor>,
) -> Result<RunningScheduler> {
    let mut timers = Vec::new();

    let check_messages = cycles.check_messages.clone();
    let messages_lifecycle = lifecycle.clone();
    timers.push(tokio::spawn(triggers.message_timer.clone().run(move || {
        let use_case = check_messages.clone();
        let lifecycle = messages_lifecycle.clone();
        async move {
            if let Err(e) = use_case.execute().await {
                lifecycle.notify_error("Kramail check", &e).await;
            }
        }
    })));

    let check_reminder = cycles.check_reminder.clone();
    let reminder_lifecycle = lifecycle.clone();
    timers.push(tokio::spawn(triggers.reminder_timer.clone().run(move || {
        let use_case = check_reminder.clone();
        let lifecycle = reminder_lifecycle.clone();
        async move {
            tracing::info!("😴 Running scheduled reminder check");
            if let Err(e) = use_case.execute().await {
                lifecycle.notify_error("Sleep check", &e).await;
            }
        }
    })));

    let cron = JobScheduler::new().await?;

    let check_release = cycles.check_release.clone();
    let release_lifecycle = lifecycle.clone();
    let release_running = Arc::new(Mutex::new(()));
    let release_job = Job::new_async(triggers.release_cron.as_str(), move |_uuid, _lock| {
        let use_case = check_release.clone();
        let lifecycle = release_lifecycle.clone();
        let running = release_running.clone();
        Box::pin(async move {
            run_exclusive(&running, "Release check", async {
                if let Err(e) = use_case.execute().await {
                    lifecycle.notify_error("Release check", &e).await;
                }
            })
            .await;
        })
    })?;
    cron.add(release_job).await?;

    let memory_job = Job::new_async(triggers.memory_cron.as_str(), move |_uuid, _lock| {
        let monitor = monitor.clone();
        Box::pin(async move {
            monitor.log_report();
        })
    })?;
    cron.add(memory_job).await?;

    cron.start().await?;

    tracing::info!(
        "🚀 Scheduler started (kramails at {}, reminder at {}, release cron '{}', memory cron '{}')",
        triggers.message_timer.next_execution(),
        triggers.reminder_timer.next_execution(),
        triggers.release_cron,
        triggers.memory_cron
    );

    Ok(RunningScheduler { cron, timers })
}
