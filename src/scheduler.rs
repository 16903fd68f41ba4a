//! Morning and evening crawl triggers.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, instrument, warn};

use crate::crawler::{CrawlError, Crawler};
use crate::entities::{PersistedSchedulerState, RunReport, SchedulerState};

pub struct Scheduler {
    crawler: Arc<Crawler>,
    state: RwLock<SchedulerState>,
    jobs: Mutex<Option<JobScheduler>>,
}

impl Scheduler {
    /// Scheduler with `enabled` as the initial flag, overridden by any state
    /// persisted in the crawler's store.
    pub async fn new(
        crawler: Arc<Crawler>,
        morning_schedule: impl Into<String>,
        evening_schedule: impl Into<String>,
        enabled: bool,
    ) -> Self {
        let mut state = SchedulerState {
            enabled,
            morning_schedule: morning_schedule.into(),
            evening_schedule: evening_schedule.into(),
            last_run: None,
        };

        match crawler.store().load_scheduler_state().await {
            Ok(Some(saved)) => {
                debug!(enabled = saved.enabled, "restored scheduler state");
                state.enabled = saved.enabled;
                state.last_run = saved.last_run;
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "failed to load scheduler state, using defaults"),
        }

        Self {
            crawler,
            state: RwLock::new(state),
            jobs: Mutex::new(None),
        }
    }

    pub fn crawler(&self) -> &Arc<Crawler> {
        &self.crawler
    }

    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.read().await.enabled
    }

    /// Register both cron triggers and start ticking. Calling it twice is a
    /// no-op.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.is_some() {
            return Ok(());
        }

        let sched = JobScheduler::new()
            .await
            .context("failed to create cron scheduler")?;

        let (morning, evening) = {
            let state = self.state.read().await;
            (state.morning_schedule.clone(), state.evening_schedule.clone())
        };
        for (slot, cron) in [("morning", morning), ("evening", evening)] {
            let scheduler = Arc::clone(self);
            let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
                let scheduler = Arc::clone(&scheduler);
                Box::pin(async move {
                    scheduler.fire(slot).await;
                })
            })
            .with_context(|| format!("invalid {slot} schedule '{cron}'"))?;
            sched
                .add(job)
                .await
                .with_context(|| format!("failed to add {slot} job"))?;
        }

        sched
            .start()
            .await
            .context("failed to start cron scheduler")?;
        *jobs = Some(sched);
        info!("scheduler started");
        Ok(())
    }

    /// Stop the cron triggers. Safe to call when never started.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        if let Some(mut sched) = self.jobs.lock().await.take() {
            sched
                .shutdown()
                .await
                .context("failed to stop cron scheduler")?;
            info!("scheduler stopped");
        }
        Ok(())
    }

    /// One trigger firing. Disabled triggers and runs that collide with an
    /// active crawl are skipped; only a run that actually happened updates
    /// `last_run`.
    #[instrument(skip(self))]
    pub async fn fire(&self, slot: &str) -> Option<RunReport> {
        if !self.is_enabled().await {
            debug!("scheduler disabled, trigger skipped");
            return None;
        }

        info!("scheduled crawl starting");
        let started_at = Utc::now();
        let report = match self.crawler.run_all().await {
            Ok(report) => report,
            Err(CrawlError::AlreadyRunning) => {
                warn!("crawl already in progress, scheduled run skipped");
                return None;
            }
            Err(err) => {
                error!(error = %err, "scheduled crawl failed");
                return None;
            }
        };

        let saved = {
            let mut state = self.state.write().await;
            state.last_run = Some(started_at);
            PersistedSchedulerState {
                enabled: state.enabled,
                last_run: state.last_run,
            }
        };
        self.persist(&saved).await;
        Some(report)
    }

    /// Flip the enabled flag and return the new state.
    pub async fn toggle(&self) -> SchedulerState {
        let (snapshot, saved) = {
            let mut state = self.state.write().await;
            state.enabled = !state.enabled;
            let saved = PersistedSchedulerState {
                enabled: state.enabled,
                last_run: state.last_run,
            };
            (state.clone(), saved)
        };
        info!(enabled = snapshot.enabled, "scheduler toggled");
        self.persist(&saved).await;
        snapshot
    }

    async fn persist(&self, saved: &PersistedSchedulerState) {
        if let Err(err) = self.crawler.store().save_scheduler_state(saved).await {
            warn!(error = %err, "failed to persist scheduler state");
        }
    }
}
