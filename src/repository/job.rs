//! Durable job queue repository.
//!
//! Rows move `scheduled -> running -> completed | retryable | discarded`.
//! Claims happen inside a transaction so two workers never run the same
//! attempt.

use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{JobRecord, NewJobRecord};
use super::pool::{DbPool, DieselError};
use super::{format_datetime, parse_datetime, parse_datetime_opt};
use crate::models::{Job, JobState};
use crate::schema::jobs;
use crate::{with_conn, with_conn_split};

#[derive(diesel::QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt, column_name = "last_insert_rowid()")]
    id: i64,
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Job {
            id: record.id,
            kind: record.kind,
            args: serde_json::from_str(&record.args).unwrap_or(serde_json::Value::Null),
            state: JobState::from_str(&record.state).unwrap_or(JobState::Discarded),
            attempt: record.attempt,
            max_attempts: record.max_attempts,
            scheduled_at: parse_datetime(&record.scheduled_at),
            attempted_at: parse_datetime_opt(record.attempted_at),
            finished_at: parse_datetime_opt(record.finished_at),
            last_error: record.last_error,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

/// Rows removed by a retention purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub completed: usize,
    pub discarded: usize,
}

impl PurgeCounts {
    pub fn total(&self) -> usize {
        self.completed + self.discarded
    }
}

/// Job queue persistence.
#[derive(Clone)]
pub struct JobRepository {
    pool: DbPool,
}

impl JobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new job in the `scheduled` state.
    pub async fn enqueue(
        &self,
        kind: &str,
        args: &serde_json::Value,
        max_attempts: i32,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Job, DieselError> {
        let args_json = args.to_string();
        let scheduled_at = format_datetime(scheduled_at);
        let created_at = format_datetime(Utc::now());
        let record = NewJobRecord {
            kind,
            args: &args_json,
            state: JobState::Scheduled.as_str(),
            attempt: 0,
            max_attempts,
            scheduled_at: &scheduled_at,
            created_at: &created_at,
        };

        let id = with_conn_split!(self.pool,
            sqlite: conn => {
                diesel::insert_into(jobs::table)
                    .values(&record)
                    .execute(&mut conn)
                    .await?;
                // Scoped to this connection
                diesel::sql_query("SELECT last_insert_rowid()")
                    .get_result::<LastInsertRowId>(&mut conn)
                    .await
                    .map(|r| r.id as i32)
            },
            postgres: conn => {
                diesel::insert_into(jobs::table)
                    .values(&record)
                    .returning(jobs::id)
                    .get_result::<i32>(&mut conn)
                    .await
            }
        )?;

        self.get(id).await?.ok_or(DieselError::NotFound)
    }

    /// Get a job by id.
    pub async fn get(&self, id: i32) -> Result<Option<Job>, DieselError> {
        with_conn!(self.pool, conn => {
            jobs::table
                .find(id)
                .first::<JobRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Job::from))
        })
    }

    /// Atomically claim the next job that is due.
    ///
    /// The claimed job is `running` with its attempt counter incremented.
    pub async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<Job>, DieselError> {
        let now = format_datetime(now);

        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                let now = now.clone();
                Box::pin(async move {
                    let record: Option<JobRecord> = jobs::table
                        .filter(
                            jobs::state
                                .eq(JobState::Scheduled.as_str())
                                .or(jobs::state.eq(JobState::Retryable.as_str())),
                        )
                        .filter(jobs::scheduled_at.le(&now))
                        .order((jobs::scheduled_at.asc(), jobs::id.asc()))
                        .first(conn)
                        .await
                        .optional()?;

                    let Some(record) = record else {
                        return Ok(None);
                    };

                    let updated = diesel::update(
                        jobs::table
                            .filter(jobs::id.eq(record.id))
                            .filter(jobs::state.eq(&record.state)),
                    )
                    .set((
                        jobs::state.eq(JobState::Running.as_str()),
                        jobs::attempt.eq(record.attempt + 1),
                        jobs::attempted_at.eq(Some(&now)),
                    ))
                    .execute(conn)
                    .await?;

                    if updated == 0 {
                        return Ok(None);
                    }

                    let mut job = Job::from(record);
                    job.state = JobState::Running;
                    job.attempt += 1;
                    job.attempted_at = Some(parse_datetime(&now));
                    Ok(Some(job))
                })
            })
            .await
        })
    }

    /// Mark a running job as completed.
    pub async fn complete(&self, id: i32) -> Result<(), DieselError> {
        let now = format_datetime(Utc::now());
        with_conn!(self.pool, conn => {
            diesel::update(jobs::table.find(id))
                .set((
                    jobs::state.eq(JobState::Completed.as_str()),
                    jobs::finished_at.eq(Some(&now)),
                ))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    /// Record a failed attempt and schedule the next one.
    pub async fn retry(
        &self,
        id: i32,
        error: &str,
        retry_at: DateTime<Utc>,
    ) -> Result<(), DieselError> {
        let retry_at = format_datetime(retry_at);
        with_conn!(self.pool, conn => {
            diesel::update(jobs::table.find(id))
                .set((
                    jobs::state.eq(JobState::Retryable.as_str()),
                    jobs::scheduled_at.eq(&retry_at),
                    jobs::last_error.eq(Some(error)),
                ))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    /// Record a terminal failure.
    pub async fn discard(&self, id: i32, error: &str) -> Result<(), DieselError> {
        let now = format_datetime(Utc::now());
        with_conn!(self.pool, conn => {
            diesel::update(jobs::table.find(id))
                .set((
                    jobs::state.eq(JobState::Discarded.as_str()),
                    jobs::finished_at.eq(Some(&now)),
                    jobs::last_error.eq(Some(error)),
                ))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    /// Jobs left `running` since before `started_before` (worker crash or restart).
    pub async fn get_stuck(&self, started_before: DateTime<Utc>) -> Result<Vec<Job>, DieselError> {
        let cutoff = format_datetime(started_before);
        with_conn!(self.pool, conn => {
            jobs::table
                .filter(jobs::state.eq(JobState::Running.as_str()))
                .filter(jobs::attempted_at.lt(&cutoff))
                .order(jobs::id.asc())
                .load::<JobRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Job::from).collect())
        })
    }

    /// Delete completed jobs finished before `completed_before` and discarded
    /// jobs finished before `discarded_before`, in one transaction.
    pub async fn purge(
        &self,
        completed_before: DateTime<Utc>,
        discarded_before: DateTime<Utc>,
    ) -> Result<PurgeCounts, DieselError> {
        let completed_cutoff = format_datetime(completed_before);
        let discarded_cutoff = format_datetime(discarded_before);

        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                let completed_cutoff = completed_cutoff.clone();
                let discarded_cutoff = discarded_cutoff.clone();
                Box::pin(async move {
                    let completed = diesel::delete(
                        jobs::table
                            .filter(jobs::state.eq(JobState::Completed.as_str()))
                            .filter(jobs::finished_at.lt(&completed_cutoff)),
                    )
                    .execute(conn)
                    .await?;

                    let discarded = diesel::delete(
                        jobs::table
                            .filter(jobs::state.eq(JobState::Discarded.as_str()))
                            .filter(jobs::finished_at.lt(&discarded_cutoff)),
                    )
                    .execute(conn)
                    .await?;

                    Ok(PurgeCounts {
                        completed,
                        discarded,
                    })
                })
            })
            .await
        })
    }

    /// Recent jobs, newest first, optionally filtered by state.
    pub async fn list(&self, state: Option<JobState>, limit: i64) -> Result<Vec<Job>, DieselError> {
        with_conn!(self.pool, conn => {
            let mut query = jobs::table.order(jobs::id.desc()).limit(limit).into_boxed();
            if let Some(state) = state {
                query = query.filter(jobs::state.eq(state.as_str()));
            }
            query
                .load::<JobRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Job::from).collect())
        })
    }

    /// Number of jobs in a given state.
    pub async fn count_by_state(&self, state: JobState) -> Result<u64, DieselError> {
        let count: i64 = with_conn!(self.pool, conn => {
            jobs::table
                .filter(jobs::state.eq(state.as_str()))
                .select(count_star())
                .first(&mut conn)
                .await?
        });
        Ok(count as u64)
    }

    /// Overwrite a job's finish time (retention tests and manual backfills).
    pub async fn set_finished_at(&self, id: i32, finished_at: DateTime<Utc>) -> Result<(), DieselError> {
        let finished_at = format_datetime(finished_at);
        with_conn!(self.pool, conn => {
            diesel::update(jobs::table.find(id))
                .set(jobs::finished_at.eq(Some(&finished_at)))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup_test_db;
    use chrono::Duration;
    use serde_json::json;

    #[tokio::test]
    async fn test_enqueue_and_claim() {
        let (ctx, _dir) = setup_test_db().await;
        let repo = ctx.jobs();

        let job = repo
            .enqueue("fetch_governo_piaui", &json!({"date": "2025-04-16"}), 4, Utc::now())
            .await
            .unwrap();
        assert_eq!(job.state, JobState::Scheduled);
        assert_eq!(job.attempt, 0);
        assert_eq!(job.date_arg(), Some("2025-04-16"));

        let claimed = repo.claim_next(Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.state, JobState::Running);
        assert_eq!(claimed.attempt, 1);

        // Nothing else is due
        assert!(repo.claim_next(Utc::now()).await.unwrap().is_none());

        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Running);
        assert_eq!(stored.attempt, 1);
        assert!(stored.attempted_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueues_return_their_own_job() {
        let (ctx, _dir) = setup_test_db().await;

        for round in 0..10 {
            let mut handles = Vec::new();
            for i in 0..8 {
                let repo = ctx.jobs();
                let kind = format!("kind_{}_{}", round, i);
                handles.push(tokio::spawn(async move {
                    let job = repo.enqueue(&kind, &json!({}), 1, Utc::now()).await.unwrap();
                    (kind, job)
                }));
            }
            for handle in handles {
                let (kind, job) = handle.await.unwrap();
                assert_eq!(job.kind, kind);
                let stored = ctx.jobs().get(job.id).await.unwrap().unwrap();
                assert_eq!(stored.kind, kind);
            }
        }
    }

    #[tokio::test]
    async fn test_claim_respects_schedule_and_order() {
        let (ctx, _dir) = setup_test_db().await;
        let repo = ctx.jobs();
        let now = Utc::now();

        let later = repo
            .enqueue("fetch_diario_dos_municipios", &json!({}), 4, now + Duration::hours(1))
            .await
            .unwrap();
        let first = repo
            .enqueue("fetch_governo_piaui", &json!({}), 4, now - Duration::seconds(10))
            .await
            .unwrap();
        let second = repo
            .enqueue("reindex_knowledge_bases", &json!({}), 4, now - Duration::seconds(5))
            .await
            .unwrap();

        assert_eq!(repo.claim_next(now).await.unwrap().unwrap().id, first.id);
        assert_eq!(repo.claim_next(now).await.unwrap().unwrap().id, second.id);
        assert!(repo.claim_next(now).await.unwrap().is_none());

        let due = repo
            .claim_next(now + Duration::hours(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(due.id, later.id);
    }

    #[tokio::test]
    async fn test_retry_then_complete() {
        let (ctx, _dir) = setup_test_db().await;
        let repo = ctx.jobs();
        let now = Utc::now();

        let job = repo.enqueue("fetch_governo_piaui", &json!({}), 4, now).await.unwrap();
        repo.claim_next(now).await.unwrap().unwrap();

        repo.retry(job.id, "listing unreachable", now + Duration::seconds(16))
            .await
            .unwrap();
        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Retryable);
        assert_eq!(stored.last_error.as_deref(), Some("listing unreachable"));

        // Backoff not elapsed yet
        assert!(repo.claim_next(now).await.unwrap().is_none());

        let retried = repo
            .claim_next(now + Duration::seconds(20))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retried.attempt, 2);

        repo.complete(job.id).await.unwrap();
        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Completed);
        assert!(stored.finished_at.is_some());
        assert_eq!(repo.count_by_state(JobState::Completed).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stuck_jobs_detected() {
        let (ctx, _dir) = setup_test_db().await;
        let repo = ctx.jobs();
        let now = Utc::now();

        let job = repo.enqueue("fetch_governo_piaui", &json!({}), 4, now).await.unwrap();
        repo.claim_next(now).await.unwrap().unwrap();

        assert!(repo.get_stuck(now - Duration::minutes(1)).await.unwrap().is_empty());
        let stuck = repo.get_stuck(now + Duration::minutes(1)).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].id, job.id);
    }

    #[tokio::test]
    async fn test_purge_retention() {
        let (ctx, _dir) = setup_test_db().await;
        let repo = ctx.jobs();
        let now = Utc::now();

        let old_completed = repo.enqueue("a", &json!({}), 1, now).await.unwrap();
        let new_completed = repo.enqueue("b", &json!({}), 1, now).await.unwrap();
        let old_discarded = repo.enqueue("c", &json!({}), 1, now).await.unwrap();
        let recent_discarded = repo.enqueue("d", &json!({}), 1, now).await.unwrap();
        let scheduled = repo.enqueue("e", &json!({}), 1, now + Duration::days(1)).await.unwrap();

        repo.complete(old_completed.id).await.unwrap();
        repo.set_finished_at(old_completed.id, now - Duration::days(8)).await.unwrap();
        repo.complete(new_completed.id).await.unwrap();
        repo.discard(old_discarded.id, "boom").await.unwrap();
        repo.set_finished_at(old_discarded.id, now - Duration::days(31)).await.unwrap();
        repo.discard(recent_discarded.id, "boom").await.unwrap();
        repo.set_finished_at(recent_discarded.id, now - Duration::days(8)).await.unwrap();

        let counts = repo
            .purge(now - Duration::days(7), now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(counts, PurgeCounts { completed: 1, discarded: 1 });
        assert_eq!(counts.total(), 2);

        assert!(repo.get(old_completed.id).await.unwrap().is_none());
        assert!(repo.get(old_discarded.id).await.unwrap().is_none());
        assert!(repo.get(new_completed.id).await.unwrap().is_some());
        assert!(repo.get(recent_discarded.id).await.unwrap().is_some());
        assert!(repo.get(scheduled.id).await.unwrap().is_some());

        let listed = repo.list(Some(JobState::Discarded), 10).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
