//! Scheduler: owns the registered probes and fires them.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use status_core::{CronSchedule, OverlapPolicy, Schedule};
use status_probe::Probe;
use status_telemetry::error_chain;

use crate::error::{SchedulerError, SchedulerResult};

/// One registered probe and when it fires.
struct Job {
    name: String,
    schedule: Schedule,
    probe: Arc<dyn Probe>,
    registered_at: Instant,
}

/// Fires every registered probe according to its own schedule.
///
/// Registration happens before running; `run`/`run_until` consume the
/// scheduler.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Job>,
    names: HashSet<String>,
    overlap: OverlapPolicy,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what happens when a firing arrives while the previous one of
    /// the same probe is still running.
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn overlap(&self) -> OverlapPolicy {
        self.overlap
    }

    /// Register `probe` to fire on `schedule`.
    ///
    /// The schedule is parsed here; an invalid one means the probe is never
    /// scheduled.
    pub fn register(&mut self, schedule: &str, probe: Arc<dyn Probe>) -> SchedulerResult<()> {
        let name = self.claim_name(probe.as_ref())?;
        let parsed = Schedule::parse(schedule).map_err(|source| SchedulerError::InvalidSchedule {
            name: name.clone(),
            schedule: schedule.to_string(),
            source,
        })?;
        self.push(name, parsed, probe);
        Ok(())
    }

    /// Register `probe` on the schedule from its own configuration.
    pub fn register_probe(&mut self, probe: Arc<dyn Probe>) -> SchedulerResult<()> {
        let name = self.claim_name(probe.as_ref())?;
        let config = probe.config();
        let parsed = config
            .parse_schedule()
            .map_err(|source| SchedulerError::InvalidSchedule {
                name: name.clone(),
                schedule: config.schedule.clone(),
                source,
            })?;
        self.push(name, parsed, probe);
        Ok(())
    }

    /// The probe's name, if it is non-empty and not yet registered.
    fn claim_name(&self, probe: &dyn Probe) -> SchedulerResult<String> {
        let name = probe.config().name.clone();
        if name.trim().is_empty() {
            return Err(SchedulerError::EmptyName);
        }
        if self.names.contains(&name) {
            return Err(SchedulerError::AlreadyRegistered(name));
        }
        Ok(name)
    }

    fn push(&mut self, name: String, schedule: Schedule, probe: Arc<dyn Probe>) {
        info!(probe = %name, kind = probe.kind(), %schedule, "probe registered");
        self.names.insert(name.clone());
        self.jobs.push(Job {
            name,
            schedule,
            probe,
            registered_at: Instant::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Registered probe names, in registration order.
    pub fn probe_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.name.as_str()).collect()
    }

    /// Fire probes forever.
    pub async fn run(self) {
        let (_keep_open, shutdown) = watch::channel(false);
        self.run_until(shutdown).await;
    }

    /// Fire probes until `shutdown` turns `true` or its sender is dropped.
    ///
    /// Returns once every in-flight firing has finished.
    pub async fn run_until(self, shutdown: watch::Receiver<bool>) {
        let overlap = self.overlap;
        info!(probes = self.jobs.len(), ?overlap, "scheduler started");

        if self.jobs.is_empty() {
            warn!("no probes registered");
            stopped(shutdown).await;
            info!("scheduler stopped");
            return;
        }

        let mut timelines = JoinSet::new();
        for job in self.jobs {
            timelines.spawn(run_job(job, overlap, shutdown.clone()));
        }

        while let Some(joined) = timelines.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "probe timeline task failed");
            }
        }
        info!("scheduler stopped");
    }
}

/// Resolves once shutdown is requested.
async fn stopped(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender counts as shutdown.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// The timeline of one probe.
async fn run_job(job: Job, overlap: OverlapPolicy, shutdown: watch::Receiver<bool>) {
    let mut ticker = Ticker::new(&job.schedule, job.registered_at);
    let in_flight = Arc::new(AtomicBool::new(false));
    let mut firings = JoinSet::new();

    let stop = stopped(shutdown);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            ticked = ticker.tick() => {
                if !ticked {
                    warn!(probe = %job.name, schedule = %job.schedule, "schedule has no further occurrences");
                    break;
                }

                let guard = match overlap {
                    OverlapPolicy::Concurrent => None,
                    OverlapPolicy::Skip => {
                        if in_flight.swap(true, Ordering::AcqRel) {
                            debug!(probe = %job.name, "previous firing still running, skipped");
                            continue;
                        }
                        Some(InFlight(in_flight.clone()))
                    }
                };

                let probe = job.probe.clone();
                let name = job.name.clone();
                firings.spawn(async move {
                    fire(probe.as_ref(), &name).await;
                    drop(guard);
                });
            }
            Some(joined) = firings.join_next(), if !firings.is_empty() => {
                if let Err(e) = joined {
                    error!(probe = %job.name, error = %e, "firing task failed");
                }
            }
        }
    }

    if !firings.is_empty() {
        debug!(probe = %job.name, in_flight = firings.len(), "waiting for in-flight firings");
    }
    while let Some(joined) = firings.join_next().await {
        if let Err(e) = joined {
            error!(probe = %job.name, error = %e, "firing task failed");
        }
    }
}

/// Execute once and log the outcome; errors never stop the timeline.
async fn fire(probe: &dyn Probe, name: &str) {
    debug!(probe = %name, "firing");
    match probe.execute().await {
        Ok(result) => debug!(
            probe = %name,
            outcome = %result.outcome,
            status = ?result.status_code,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "firing finished"
        ),
        Err(e) => warn!(
            probe = %name,
            kind = probe.kind(),
            error = %error_chain(&e),
            "firing failed"
        ),
    }
}

/// Clears the in-flight flag when a firing ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Produces the firing instants of one schedule.
enum Ticker {
    Every(Interval),
    Cron {
        cron: CronSchedule,
        /// Last instant fired, so a tick never repeats it.
        last: Option<DateTime<Local>>,
        /// Instant the current tick is waiting for; kept until it fires.
        pending: Option<DateTime<Local>>,
    },
}

impl Ticker {
    fn new(schedule: &Schedule, registered_at: Instant) -> Self {
        match schedule {
            Schedule::Every(period) => {
                let mut interval = tokio::time::interval_at(registered_at + *period, *period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Ticker::Every(interval)
            }
            Schedule::Cron(cron) => Ticker::Cron {
                cron: cron.clone(),
                last: None,
                pending: None,
            },
        }
    }

    /// Wait for the next firing; `false` when the schedule is exhausted.
    ///
    /// Cancel safe: a dropped cron tick leaves its instant pending, and the
    /// next tick waits for that instant (or fires at once if it has passed).
    async fn tick(&mut self) -> bool {
        match self {
            Ticker::Every(interval) => {
                interval.tick().await;
                true
            }
            Ticker::Cron {
                cron,
                last,
                pending,
            } => {
                let next = match *pending {
                    Some(next) => next,
                    None => {
                        let now = Local::now();
                        let from = match *last {
                            Some(last) if last > now => last,
                            _ => now,
                        };
                        let Some(next) = cron.next_after(&from) else {
                            return false;
                        };
                        *pending = Some(next);
                        next
                    }
                };
                let wait = (next - Local::now()).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
                *last = Some(next);
                *pending = None;
                true
            }
        }
    }
}
