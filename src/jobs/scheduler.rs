//! Worker pool, periodic registrations and retry policy.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::handlers::parse_job_date;
use super::{JobError, JobHandler};
use crate::config::SchedulerConfig;
use crate::models::{Job, JobKind, JobState};
use crate::repository::{DieselError, JobRepository, PurgeCounts};

/// Delay before retrying after attempt `attempt` (1-based): `attempt^4` seconds.
pub fn retry_backoff(attempt: i32) -> chrono::Duration {
    let n = i64::from(attempt.max(1));
    chrono::Duration::seconds(n.pow(4))
}

/// A job the running scheduler enqueues on a fixed interval.
#[derive(Debug, Clone)]
pub struct PeriodicJob {
    pub kind: JobKind,
    pub args: Value,
    pub interval: Duration,
    /// Enqueue once as soon as the scheduler starts.
    pub run_on_start: bool,
}

/// Durable job scheduler.
pub struct JobScheduler {
    jobs: JobRepository,
    config: SchedulerConfig,
    job_timeout: Duration,
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
    periodic: Vec<PeriodicJob>,
}

impl JobScheduler {
    pub fn new(jobs: JobRepository, config: SchedulerConfig) -> Self {
        Self {
            jobs,
            job_timeout: config.job_timeout(),
            config,
            handlers: HashMap::new(),
            periodic: Vec::new(),
        }
    }

    /// Override the per-job timeout.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Register the handler for its job kind, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    /// Enqueue `kind` every `interval` while the scheduler runs.
    pub fn register_periodic(
        &mut self,
        kind: JobKind,
        args: Value,
        interval: Duration,
        run_on_start: bool,
    ) {
        self.periodic.push(PeriodicJob {
            kind,
            args,
            interval,
            run_on_start,
        });
    }

    pub fn periodic_jobs(&self) -> &[PeriodicJob] {
        &self.periodic
    }

    /// Attempts each job gets by default: the first run plus the configured retries.
    pub fn max_attempts(&self) -> i32 {
        attempts(self.config.max_retries)
    }

    /// Attempts for `kind`, honouring the retries its handler declares.
    pub fn max_attempts_for(&self, kind: JobKind) -> i32 {
        let retries = self
            .handlers
            .get(&kind)
            .and_then(|h| h.max_retries())
            .unwrap_or(self.config.max_retries);
        attempts(retries)
    }

    /// Per-attempt timeout for `kind`, honouring its handler's declaration.
    pub fn timeout_for(&self, kind: JobKind) -> Duration {
        self.handlers
            .get(&kind)
            .and_then(|h| h.timeout())
            .unwrap_or(self.job_timeout)
    }

    /// Enqueue a job to run now.
    pub async fn enqueue(&self, kind: JobKind, args: Value) -> Result<Job, JobError> {
        let job = self
            .jobs
            .enqueue(kind.as_str(), &args, self.max_attempts_for(kind), Utc::now())
            .await?;
        info!("Enqueued job {} ({}) args={}", job.id, kind, args);
        Ok(job)
    }

    /// Enqueue an on-demand fetch by kind name with an optional ISO date.
    pub async fn enqueue_fetch(&self, kind: &str, date: Option<&str>) -> Result<Job, JobError> {
        let kind = JobKind::from_str(kind).ok_or_else(|| JobError::UnknownKind(kind.to_string()))?;
        let date = date.map(str::trim).filter(|d| !d.is_empty());

        let args = match date {
            Some(date) if kind.accepts_date() => {
                let date = parse_job_date(date)?;
                json!({ "date": date.format("%Y-%m-%d").to_string() })
            }
            Some(date) => {
                return Err(JobError::InvalidArgs(format!(
                    "{} does not take a date (got {})",
                    kind, date
                )))
            }
            None => json!({}),
        };

        self.enqueue(kind, args).await
    }

    /// Run until `shutdown` resolves.
    ///
    /// Stops claiming on shutdown and waits up to the grace period for
    /// in-flight jobs; anything still running after that is aborted and
    /// rescued on the next start.
    pub async fn run<F>(self: Arc<Self>, shutdown: F) -> Result<(), JobError>
    where
        F: Future<Output = ()> + Send,
    {
        let rescued = self.rescue_stuck().await?;
        if rescued > 0 {
            warn!("Rescued {} job(s) left running by a previous worker", rescued);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tickers = JoinSet::new();

        for periodic in self.periodic.clone() {
            if periodic.run_on_start {
                self.enqueue(periodic.kind, periodic.args.clone()).await?;
            }
            tickers.spawn(periodic_ticker(self.clone(), periodic, stop_rx.clone()));
        }
        tickers.spawn(purge_ticker(
            self.clone(),
            Duration::from_secs(self.config.purge_interval.max(1)),
            stop_rx.clone(),
        ));

        let workers = self.config.workers.max(1) as usize;
        info!(
            "Scheduler started: {} worker(s), {} periodic job(s)",
            workers,
            self.periodic.len()
        );

        let mut in_flight: JoinSet<()> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            if in_flight.len() < workers {
                match self.jobs.claim_next(Utc::now()).await {
                    Ok(Some(job)) => {
                        let scheduler = self.clone();
                        in_flight.spawn(async move {
                            if let Err(e) = scheduler.execute(job).await {
                                error!("Failed to record job outcome: {}", e);
                            }
                        });
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => error!("Failed to claim job: {}", e),
                }
            }

            tokio::select! {
                _ = &mut shutdown => break,
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("Job task panicked: {}", e);
                    }
                }
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }

        info!(
            "Shutting down, waiting for {} in-flight job(s)",
            in_flight.len()
        );
        let _ = stop_tx.send(true);

        let drain = async { while in_flight.join_next().await.is_some() {} };
        if tokio::time::timeout(self.config.shutdown_grace(), drain)
            .await
            .is_err()
        {
            warn!(
                "{} job(s) still running after {:?}, aborting",
                in_flight.len(),
                self.config.shutdown_grace()
            );
            in_flight.abort_all();
            while in_flight.join_next().await.is_some() {}
        }

        while tickers.join_next().await.is_some() {}
        info!("Scheduler stopped");
        Ok(())
    }

    /// Run one claimed job and record its outcome.
    ///
    /// Returns the state the job was left in.
    pub async fn execute(&self, job: Job) -> Result<JobState, DieselError> {
        let kind = job.job_kind();
        info!(
            "Running job {} ({}) attempt {}/{}",
            job.id, job.kind, job.attempt, job.max_attempts
        );

        let result = match kind.and_then(|k| self.handlers.get(&k)) {
            Some(handler) => {
                let timeout = handler.timeout().unwrap_or(self.job_timeout);
                // Dropping the handler future cancels its in-flight requests
                match tokio::time::timeout(timeout, handler.run(&job)).await {
                    Ok(result) => result,
                    Err(_) => Err(JobError::Timeout(timeout)),
                }
            }
            None => Err(match kind {
                Some(kind) => JobError::NoHandler(kind),
                None => JobError::UnknownKind(job.kind.clone()),
            }),
        };

        match result {
            Ok(()) => {
                self.jobs.complete(job.id).await?;
                info!("Job {} ({}) completed", job.id, job.kind);
                Ok(JobState::Completed)
            }
            Err(e) if !e.is_terminal() && job.has_attempts_left() => {
                let retry_at = Utc::now() + retry_backoff(job.attempt);
                self.jobs.retry(job.id, &e.to_string(), retry_at).await?;
                warn!(
                    "Job {} ({}) attempt {} failed, retrying at {}: {}",
                    job.id, job.kind, job.attempt, retry_at, e
                );
                Ok(JobState::Retryable)
            }
            Err(e) => {
                self.jobs.discard(job.id, &e.to_string()).await?;
                error!(
                    "Job {} ({}) discarded after attempt {}: {}",
                    job.id, job.kind, job.attempt, e
                );
                Ok(JobState::Discarded)
            }
        }
    }

    /// Delete finished jobs past their retention.
    pub async fn purge(&self) -> Result<PurgeCounts, DieselError> {
        let now = Utc::now();
        let counts = self
            .jobs
            .purge(
                now - self.config.completed_retention(),
                now - self.config.discarded_retention(),
            )
            .await?;
        if counts.total() > 0 {
            info!(
                "Purged {} completed and {} discarded job(s)",
                counts.completed, counts.discarded
            );
        }
        Ok(counts)
    }

    /// Requeue jobs left `running` for longer than their kind's timeout.
    ///
    /// Jobs out of attempts are discarded instead.
    pub async fn rescue_stuck(&self) -> Result<usize, DieselError> {
        let now = Utc::now();
        let shortest = self
            .handlers
            .values()
            .filter_map(|h| h.timeout())
            .chain(std::iter::once(self.job_timeout))
            .min()
            .unwrap_or(self.job_timeout);

        let stuck: Vec<Job> = self
            .jobs
            .get_stuck(now - to_chrono(shortest))
            .await?
            .into_iter()
            .filter(|job| {
                let timeout = job
                    .job_kind()
                    .map(|k| self.timeout_for(k))
                    .unwrap_or(self.job_timeout);
                job.attempted_at
                    .map_or(true, |started| started < now - to_chrono(timeout))
            })
            .collect();

        for job in &stuck {
            let message = "worker stopped while the job was running";
            if job.has_attempts_left() {
                self.jobs.retry(job.id, message, Utc::now()).await?;
                debug!("Requeued stuck job {} ({})", job.id, job.kind);
            } else {
                self.jobs.discard(job.id, message).await?;
                debug!("Discarded stuck job {} ({})", job.id, job.kind);
            }
        }

        Ok(stuck.len())
    }
}

fn attempts(max_retries: u32) -> i32 {
    i32::try_from(max_retries)
        .unwrap_or(i32::MAX - 1)
        .saturating_add(1)
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::minutes(10))
}

async fn periodic_ticker(
    scheduler: Arc<JobScheduler>,
    periodic: PeriodicJob,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(periodic.interval.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; start-up runs are handled by run_on_start
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = scheduler.enqueue(periodic.kind, periodic.args.clone()).await {
                    error!("Failed to enqueue periodic {} job: {}", periodic.kind, e);
                }
            }
            _ = stop.changed() => break,
        }
    }
}

async fn purge_ticker(scheduler: Arc<JobScheduler>, every: Duration, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = scheduler.purge().await {
                    warn!("Job purge failed: {}", e);
                }
            }
            _ = stop.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobPolicy;
    use crate::repository::test_support::setup_test_db;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SleepyHandler {
        kind: JobKind,
        sleep: Duration,
        policy: JobPolicy,
        runs: AtomicUsize,
    }

    impl SleepyHandler {
        fn new(kind: JobKind, sleep: Duration) -> Arc<Self> {
            Self::with_policy(kind, sleep, JobPolicy::default())
        }

        fn with_policy(kind: JobKind, sleep: Duration, policy: JobPolicy) -> Arc<Self> {
            Arc::new(Self {
                kind,
                sleep,
                policy,
                runs: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl JobHandler for SleepyHandler {
        fn kind(&self) -> JobKind {
            self.kind
        }

        fn max_retries(&self) -> Option<u32> {
            self.policy.max_retries
        }

        fn timeout(&self) -> Option<Duration> {
            self.policy.timeout
        }

        async fn run(&self, _job: &Job) -> Result<(), JobError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.sleep).await;
            Ok(())
        }
    }

    fn config(max_retries: u32) -> SchedulerConfig {
        SchedulerConfig {
            max_retries,
            poll_interval_ms: 20,
            shutdown_grace: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_backoff() {
        assert_eq!(retry_backoff(1).num_seconds(), 1);
        assert_eq!(retry_backoff(2).num_seconds(), 16);
        assert_eq!(retry_backoff(3).num_seconds(), 81);
        assert_eq!(retry_backoff(0).num_seconds(), 1);
    }

    #[tokio::test]
    async fn test_max_attempts_includes_first_run() {
        let (ctx, _dir) = setup_test_db().await;
        let scheduler = JobScheduler::new(ctx.jobs(), config(3));
        assert_eq!(scheduler.max_attempts(), 4);
        let job = scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();
        assert_eq!(job.max_attempts, 4);
    }

    #[tokio::test]
    async fn test_timeout_retries_then_discards() {
        let (ctx, _dir) = setup_test_db().await;
        let handler = SleepyHandler::new(JobKind::ReindexKnowledgeBases, Duration::from_secs(60));
        let mut scheduler =
            JobScheduler::new(ctx.jobs(), config(1)).with_job_timeout(Duration::from_millis(50));
        scheduler.register(handler.clone());

        let job = scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();

        let claimed = ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
        assert_eq!(scheduler.execute(claimed).await.unwrap(), JobState::Retryable);

        let stored = ctx.jobs().get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Retryable);
        assert!(stored.last_error.unwrap().contains("timed out"));
        assert!(stored.scheduled_at > Utc::now());

        let later = Utc::now() + chrono::Duration::hours(1);
        let claimed = ctx.jobs().claim_next(later).await.unwrap().unwrap();
        assert_eq!(claimed.attempt, 2);
        assert_eq!(scheduler.execute(claimed).await.unwrap(), JobState::Discarded);
        assert_eq!(handler.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_success_completes() {
        let (ctx, _dir) = setup_test_db().await;
        let mut scheduler = JobScheduler::new(ctx.jobs(), config(3));
        scheduler.register(SleepyHandler::new(JobKind::ReindexKnowledgeBases, Duration::ZERO));

        let job = scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();
        let claimed = ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
        assert_eq!(scheduler.execute(claimed).await.unwrap(), JobState::Completed);

        let stored = ctx.jobs().get(job.id).await.unwrap().unwrap();
        assert!(stored.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_handler_is_terminal() {
        let (ctx, _dir) = setup_test_db().await;
        let scheduler = JobScheduler::new(ctx.jobs(), config(3));
        scheduler
            .enqueue(JobKind::FetchGovernoPiaui, json!({}))
            .await
            .unwrap();

        let claimed = ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
        assert_eq!(scheduler.execute(claimed).await.unwrap(), JobState::Discarded);
    }

    #[tokio::test]
    async fn test_enqueue_fetch_validates_arguments() {
        let (ctx, _dir) = setup_test_db().await;
        let scheduler = JobScheduler::new(ctx.jobs(), config(3));

        let job = scheduler
            .enqueue_fetch("fetch_governo_piaui", Some("2025-04-16"))
            .await
            .unwrap();
        assert_eq!(job.date_arg(), Some("2025-04-16"));

        let job = scheduler
            .enqueue_fetch("fetch_governo_piaui", None)
            .await
            .unwrap();
        assert_eq!(job.date_arg(), None);

        assert!(matches!(
            scheduler.enqueue_fetch("fetch_governo_piaui", Some("16/04/2025")).await,
            Err(JobError::InvalidArgs(_))
        ));
        assert!(matches!(
            scheduler
                .enqueue_fetch("fetch_diario_dos_municipios", Some("2025-04-16"))
                .await,
            Err(JobError::InvalidArgs(_))
        ));
        assert!(matches!(
            scheduler.enqueue_fetch("fetch_everything", None).await,
            Err(JobError::UnknownKind(_))
        ));
    }

    #[tokio::test]
    async fn test_rescue_stuck_requeues() {
        let (ctx, _dir) = setup_test_db().await;
        let scheduler =
            JobScheduler::new(ctx.jobs(), config(3)).with_job_timeout(Duration::from_millis(1));
        let job = scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();
        ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(scheduler.rescue_stuck().await.unwrap(), 1);
        let stored = ctx.jobs().get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Retryable);
    }

    #[tokio::test]
    async fn test_each_kind_uses_its_own_policy() {
        let (ctx, _dir) = setup_test_db().await;
        let reindex = SleepyHandler::with_policy(
            JobKind::ReindexKnowledgeBases,
            Duration::from_secs(60),
            JobPolicy {
                max_retries: Some(0),
                timeout: Some(Duration::from_millis(50)),
            },
        );
        let fetch = SleepyHandler::with_policy(
            JobKind::FetchGovernoPiaui,
            Duration::from_millis(200),
            JobPolicy {
                max_retries: Some(5),
                timeout: Some(Duration::from_secs(5)),
            },
        );
        let mut scheduler = JobScheduler::new(ctx.jobs(), config(3));
        scheduler.register(reindex.clone());
        scheduler.register(fetch.clone());

        assert_eq!(scheduler.max_attempts_for(JobKind::ReindexKnowledgeBases), 1);
        assert_eq!(scheduler.max_attempts_for(JobKind::FetchGovernoPiaui), 6);
        // No handler registered: scheduler defaults
        assert_eq!(scheduler.max_attempts_for(JobKind::FetchDiarioDosMunicipios), 4);
        assert_eq!(
            scheduler.timeout_for(JobKind::FetchDiarioDosMunicipios),
            Duration::from_secs(600)
        );

        let reindex_job = scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();
        let fetch_job = scheduler
            .enqueue(JobKind::FetchGovernoPiaui, json!({}))
            .await
            .unwrap();
        assert_eq!(reindex_job.max_attempts, 1);
        assert_eq!(fetch_job.max_attempts, 6);

        // Out of attempts after its own short timeout
        let claimed = ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.id, reindex_job.id);
        assert_eq!(scheduler.execute(claimed).await.unwrap(), JobState::Discarded);
        let stored = ctx.jobs().get(reindex_job.id).await.unwrap().unwrap();
        assert!(stored.last_error.unwrap().contains("timed out"));

        // Outlives the other kind's timeout under its own
        let claimed = ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.id, fetch_job.id);
        assert_eq!(scheduler.execute(claimed).await.unwrap(), JobState::Completed);
        assert_eq!(fetch.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rescue_uses_kind_timeout() {
        let (ctx, _dir) = setup_test_db().await;
        let mut scheduler = JobScheduler::new(ctx.jobs(), config(3));
        scheduler.register(SleepyHandler::with_policy(
            JobKind::ReindexKnowledgeBases,
            Duration::ZERO,
            JobPolicy {
                max_retries: None,
                timeout: Some(Duration::from_millis(1)),
            },
        ));
        scheduler.register(SleepyHandler::new(JobKind::FetchGovernoPiaui, Duration::ZERO));

        let short = scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();
        let long = scheduler
            .enqueue(JobKind::FetchGovernoPiaui, json!({}))
            .await
            .unwrap();
        ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
        ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(scheduler.rescue_stuck().await.unwrap(), 1);
        let short = ctx.jobs().get(short.id).await.unwrap().unwrap();
        let long = ctx.jobs().get(long.id).await.unwrap().unwrap();
        assert_eq!(short.state, JobState::Retryable);
        assert_eq!(long.state, JobState::Running);
    }

    #[tokio::test]
    async fn test_purge_respects_retention() {
        let (ctx, _dir) = setup_test_db().await;
        let mut scheduler = JobScheduler::new(ctx.jobs(), config(3));
        scheduler.register(SleepyHandler::new(JobKind::ReindexKnowledgeBases, Duration::ZERO));

        let old = scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();
        let recent = scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();
        for _ in 0..2 {
            let claimed = ctx.jobs().claim_next(Utc::now()).await.unwrap().unwrap();
            scheduler.execute(claimed).await.unwrap();
        }
        ctx.jobs()
            .set_finished_at(old.id, Utc::now() - chrono::Duration::days(8))
            .await
            .unwrap();

        let counts = scheduler.purge().await.unwrap();
        assert_eq!(counts.completed, 1);
        assert!(ctx.jobs().get(old.id).await.unwrap().is_none());
        assert!(ctx.jobs().get(recent.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_processes_queue_until_shutdown() {
        let (ctx, _dir) = setup_test_db().await;
        let handler = SleepyHandler::new(JobKind::ReindexKnowledgeBases, Duration::ZERO);
        let mut scheduler = JobScheduler::new(ctx.jobs(), config(3));
        scheduler.register(handler.clone());
        scheduler.register_periodic(
            JobKind::ReindexKnowledgeBases,
            json!({}),
            Duration::from_secs(3600),
            true,
        );
        let scheduler = Arc::new(scheduler);
        scheduler
            .enqueue(JobKind::ReindexKnowledgeBases, json!({}))
            .await
            .unwrap();

        let jobs = ctx.jobs();
        let shutdown = async move {
            for _ in 0..200 {
                if jobs.count_by_state(JobState::Completed).await.unwrap_or(0) >= 2 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        scheduler.clone().run(shutdown).await.unwrap();

        assert_eq!(handler.runs.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.jobs().count_by_state(JobState::Completed).await.unwrap(), 2);
    }
}
