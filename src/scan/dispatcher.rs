//! Dispatcher/aggregator for the registry scan
//!
//! One owner loop consumes [`Delivery`] values from a single channel and is
//! the only code that touches the [`ResultSet`]. Every message may fan out
//! into more tasks:
//!
//! - `RepoList` spawns one tag-list task per repository
//! - `TagList` spawns one manifest task per tag
//! - `TagDetail` lands in the result set
//!
//! Completion is detected with a [`WorkTracker`]: children are registered
//! while the parent's unit is still held, and the parent's unit is retired
//! only after the handler returns. The tracker's watcher fires once, when
//! nothing is left; that is the only way a scan finishes normally.

use super::message::{Delivery, ScanMessage};
use super::report::{Report, ResultSet, TagDetail, assemble};
use crate::concurrency::{ConcurrencyConfig, WorkTracker, WorkUnit};
use crate::error::FetchError;
use crate::image::history::latest_creation;
use crate::logging::Logger;
use crate::registry::RegistryApi;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// How a scan came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every discovered unit of work was retired
    Finished,
    /// The deadline elapsed with `abandoned` units still outstanding
    DeadlineExceeded { abandoned: usize },
    /// The cancellation token fired with `abandoned` units still outstanding
    Cancelled { abandoned: usize },
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completion::Finished)
    }
}

/// Counters gathered while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub requests: u64,
    pub repositories_listed: usize,
    pub empty_repositories: usize,
    pub tags_listed: usize,
    pub failed_fetches: usize,
    pub unavailable_tags: usize,
    pub elapsed: Duration,
    pub completion: Completion,
}

/// Ordered report plus the statistics of the scan that produced it
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub report: Report,
    pub stats: ScanStats,
}

/// Work a spawned task performs
#[derive(Debug, Clone)]
enum Job {
    Catalog,
    Tags { repo: String },
    Detail { repo: String, tag: String },
}

impl Job {
    fn describe(&self) -> String {
        match self {
            Job::Catalog => "catalog".to_string(),
            Job::Tags { repo } => format!("tags of {}", repo),
            Job::Detail { repo, tag } => format!("manifest of {}:{}", repo, tag),
        }
    }

    async fn execute(&self, api: &RegistryApi, logger: &Logger) -> Result<ScanMessage, FetchError> {
        match self {
            Job::Catalog => {
                let repos = api.list_repositories().await?;
                Ok(ScanMessage::RepoList { repos })
            }
            Job::Tags { repo } => {
                let tags = api.list_tags(repo).await?;
                Ok(ScanMessage::TagList {
                    repo: repo.clone(),
                    tags,
                })
            }
            Job::Detail { repo, tag } => {
                let manifest = api.get_manifest(repo, tag).await?;
                let analysis = latest_creation(&manifest);

                for skipped in &analysis.skipped {
                    logger.verbose(&format!("{}:{} skipped {}", repo, tag, skipped));
                }
                if !analysis.is_available() {
                    logger.warning(&format!(
                        "{}:{} has no parsable history entry ({} entries)",
                        repo,
                        tag,
                        manifest.history.len()
                    ));
                }

                Ok(ScanMessage::TagDetail {
                    repo: repo.clone(),
                    tag: tag.clone(),
                    created_at: analysis.created_at,
                })
            }
        }
    }
}

/// Everything a spawned task needs, shared by all tasks of one scan
#[derive(Clone)]
struct TaskContext {
    api: RegistryApi,
    logger: Logger,
    cancel: CancellationToken,
    limiter: Arc<Semaphore>,
    failures: Arc<AtomicUsize>,
    abandoned: Arc<AtomicUsize>,
}

impl TaskContext {
    /// Run one job once a fetch slot is free
    async fn execute(&self, job: &Job) -> Result<ScanMessage, FetchError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FetchError::Cancelled)?;
        job.execute(&self.api, &self.logger).await
    }
}

/// Why the owner loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Idle,
    Deadline,
    Cancelled,
}

/// Owner of one scan
pub struct Dispatcher {
    config: ConcurrencyConfig,
    tasks: TaskContext,
}

/// State only the owner loop touches
struct ScanState {
    results: ResultSet,
    repositories_listed: usize,
    empty_repositories: usize,
    tags_listed: usize,
    unavailable_tags: usize,
}

impl Dispatcher {
    pub fn new(api: RegistryApi, config: ConcurrencyConfig, logger: Logger) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_in_flight));
        Self {
            config,
            tasks: TaskContext {
                api,
                logger,
                cancel: CancellationToken::new(),
                limiter,
                failures: Arc::new(AtomicUsize::new(0)),
                abandoned: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    /// Use an externally owned token, e.g. one wired to Ctrl-C
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.tasks.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.tasks.cancel.clone()
    }

    /// Scan the whole registry and return the ordered report
    pub async fn run(self) -> ScanOutcome {
        let started = Instant::now();
        let logger = &self.tasks.logger;
        let cancel = &self.tasks.cancel;
        let (tx, mut rx) = mpsc::channel::<Delivery>(self.config.channel_capacity);
        let (tracker, root) = WorkTracker::new();
        let mut done = tracker.spawn_watcher();

        let mut state = ScanState {
            results: ResultSet::default(),
            repositories_listed: 0,
            empty_repositories: 0,
            tags_listed: 0,
            unavailable_tags: 0,
        };

        logger.verbose(&format!(
            "Scanning {} with up to {} requests in flight",
            self.tasks.api.catalog_url(),
            self.config.max_in_flight
        ));
        self.spawn(root, tx.clone(), Job::Catalog);

        let deadline = async {
            match self.config.deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        // Cancelled tasks retire their units at once, so the stop signals
        // must win over the idle signal they cause.
        let stop = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Stop::Cancelled,
                _ = &mut deadline => break Stop::Deadline,
                Some(delivery) = rx.recv() => {
                    self.handle(delivery, &tracker, &tx, &mut state);
                }
                _ = &mut done => break Stop::Idle,
            }
        };

        let completion = match stop {
            Stop::Idle => Completion::Finished,
            Stop::Deadline | Stop::Cancelled => {
                cancel.cancel();
                self.drain(&mut rx, &mut done, &mut state).await;

                let abandoned = self.tasks.abandoned.load(Ordering::Acquire);
                if stop == Stop::Deadline {
                    logger.warning(&format!(
                        "Deadline reached, abandoned {} outstanding units of work",
                        abandoned
                    ));
                    Completion::DeadlineExceeded { abandoned }
                } else {
                    logger.warning(&format!(
                        "Scan cancelled, abandoned {} outstanding units of work",
                        abandoned
                    ));
                    Completion::Cancelled { abandoned }
                }
            }
        };
        drop(tx);

        let stats = ScanStats {
            requests: self.tasks.api.requests_issued(),
            repositories_listed: state.repositories_listed,
            empty_repositories: state.empty_repositories,
            tags_listed: state.tags_listed,
            failed_fetches: self.tasks.failures.load(Ordering::Relaxed),
            unavailable_tags: state.unavailable_tags,
            elapsed: started.elapsed(),
            completion,
        };

        ScanOutcome {
            report: assemble(state.results),
            stats,
        }
    }

    /// After cancellation, wait for every task to retire its unit.
    ///
    /// Tag details that were already delivered are complete and recorded;
    /// lists that can no longer be expanded count as abandoned.
    async fn drain(
        &self,
        rx: &mut mpsc::Receiver<Delivery>,
        done: &mut oneshot::Receiver<()>,
        state: &mut ScanState,
    ) {
        loop {
            tokio::select! {
                biased;
                Some(Delivery { message, unit }) = rx.recv() => {
                    match message {
                        ScanMessage::TagDetail { repo, tag, created_at } => {
                            Self::record(state, repo, tag, created_at);
                        }
                        other => {
                            self.tasks.logger.debug(&format!("Dropping undelivered {}", other.kind()));
                            self.tasks.abandoned.fetch_add(1, Ordering::AcqRel);
                        }
                    }
                    drop(unit);
                }
                _ = &mut *done => break,
            }
        }
    }

    fn handle(
        &self,
        delivery: Delivery,
        tracker: &WorkTracker,
        tx: &mpsc::Sender<Delivery>,
        state: &mut ScanState,
    ) {
        let logger = &self.tasks.logger;
        let Delivery { message, unit } = delivery;
        logger.debug(&format!("Handling {}", message.kind()));

        match message {
            ScanMessage::RepoList { repos } => {
                logger.info(&format!("Registry lists {} repositories", repos.len()));
                state.repositories_listed += repos.len();
                for repo in repos {
                    self.spawn(tracker.register(), tx.clone(), Job::Tags { repo });
                }
            }
            ScanMessage::TagList { repo, tags } => {
                if tags.is_empty() {
                    logger.verbose(&format!("{} has no tags", repo));
                    state.empty_repositories += 1;
                }
                state.tags_listed += tags.len();
                for tag in tags {
                    let job = Job::Detail {
                        repo: repo.clone(),
                        tag,
                    };
                    self.spawn(tracker.register(), tx.clone(), job);
                }
            }
            ScanMessage::TagDetail {
                repo,
                tag,
                created_at,
            } => Self::record(state, repo, tag, created_at),
        }

        // children are registered, the parent can go
        drop(unit);
    }

    fn record(
        state: &mut ScanState,
        repo: String,
        tag: String,
        created_at: Option<chrono::DateTime<chrono::Utc>>,
    ) {
        if created_at.is_none() {
            state.unavailable_tags += 1;
        }
        state.results.insert(&repo, TagDetail::new(tag, created_at));
    }

    fn spawn(&self, unit: WorkUnit, tx: mpsc::Sender<Delivery>, job: Job) {
        let tasks = self.tasks.clone();
        tokio::spawn(async move {
            Self::execute_job(job, unit, tx, tasks).await;
        });
    }

    async fn execute_job(job: Job, unit: WorkUnit, tx: mpsc::Sender<Delivery>, tasks: TaskContext) {
        let result = tokio::select! {
            biased;
            _ = tasks.cancel.cancelled() => Err(FetchError::Cancelled),
            result = tasks.execute(&job) => result,
        };

        match result {
            Ok(message) => {
                if let Err(undelivered) = tx.send(Delivery { message, unit }).await {
                    tasks.abandoned.fetch_add(1, Ordering::AcqRel);
                    drop(undelivered);
                }
            }
            Err(FetchError::Cancelled) => {
                tasks.abandoned.fetch_add(1, Ordering::AcqRel);
                tasks
                    .logger
                    .debug(&format!("{} cancelled", job.describe()));
            }
            Err(e) => {
                tasks.failures.fetch_add(1, Ordering::Relaxed);
                tasks
                    .logger
                    .warning(&format!("Skipping {}: {}", job.describe(), e));
            }
        }
    }
}
