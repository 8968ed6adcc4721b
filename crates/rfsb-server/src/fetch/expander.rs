//! Concurrent directory expansion.
//!
//! Directories are expanded from a worklist with at most
//! `max_dir_listings` listings in flight. Each listing task carries its
//! directory's [`DiscoveryGuard`] and hands it back with the result, so the
//! expander registers every child (files and subdirectories) before the
//! guard is released.
//!
//! Every file and directory is taken at most once per fetch, keyed by its
//! resolved path, so overlapping request items never give one name two
//! producers.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rfsb_core::config::FetchConfig;
use rfsb_core::error::Result;
use rfsb_core::file::{relative_name, resolve_under};
use rfsb_core::protocol::{Chunk, FetchRequest};

use super::producer::{FileJob, FileProducer, ProducerContext};
use super::report::{ExpansionReport, FileOutcome, SkipReason, SkippedItem};
use super::tracker::{DiscoveryGuard, FileTicket};
use crate::listing::{DirListing, list_dir};

/// A directory waiting to be listed.
struct DirWork {
    name: String,
    path: PathBuf,
    guard: DiscoveryGuard,
}

type ListingResult = (DirWork, Result<DirListing>);

/// Paths already taken by this fetch.
#[derive(Default)]
struct Seen {
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
}

/// Expands a fetch request into file producers.
pub struct DirectoryExpander {
    root: PathBuf,
    max_dir_listings: usize,
    ctx: ProducerContext,
}

impl DirectoryExpander {
    /// Create an expander streaming into `sink`.
    ///
    /// `root` must be absolute and normalized.
    pub fn new(
        root: impl Into<PathBuf>,
        config: &FetchConfig,
        sink: mpsc::Sender<Chunk>,
        cancel: CancellationToken,
    ) -> Self {
        let root = root.into();
        Self {
            ctx: ProducerContext {
                root: Arc::new(root.clone()),
                chunk_size: config.chunk_size,
                sink,
                cancel,
                open_files: Arc::new(Semaphore::new(config.max_open_files.max(1))),
            },
            root,
            max_dir_listings: config.max_dir_listings.max(1),
        }
    }

    /// Expand `request`, spawning one producer per discovered file.
    ///
    /// Top-level items are registered through `root_guard`, which is
    /// released once every requested file and directory has been
    /// registered. Returns after every spawned producer has ended.
    pub async fn run(mut self, request: FetchRequest, root_guard: DiscoveryGuard) -> ExpansionReport {
        if let Ok(real) = tokio::fs::canonicalize(&self.root).await {
            self.ctx.root = Arc::new(real);
        }

        let mut report = ExpansionReport::default();
        let mut producers = JoinSet::new();
        let mut queue = VecDeque::new();
        let mut seen = Seen::default();

        let mut direct = Vec::with_capacity(request.files.len());
        for file in request.files {
            match resolve_under(&self.root, &file) {
                Ok(path) if !seen.files.insert(path.clone()) => {
                    debug!(path = %file, "Skipping file requested twice");
                    report.skipped.push(SkippedItem {
                        name: file,
                        reason: SkipReason::Duplicate,
                    });
                }
                Ok(path) => direct.push(FileJob {
                    name: self.name_of(&path, &file),
                    path,
                }),
                Err(e) => {
                    warn!(path = %file, error = %e, "Skipping requested file");
                    report.record_error(file, &e);
                }
            }
        }
        let tickets = root_guard.discover_files(direct.len());
        for (job, ticket) in direct.into_iter().zip(tickets) {
            self.spawn_producer(&mut producers, job, ticket);
        }

        for dir in request.dirs {
            match resolve_under(&self.root, &dir) {
                Ok(path) if !seen.dirs.insert(path.clone()) => {
                    debug!(path = %dir, "Skipping directory requested twice");
                    report.skipped.push(SkippedItem {
                        name: dir,
                        reason: SkipReason::Duplicate,
                    });
                }
                Ok(path) => queue.push_back(DirWork {
                    name: self.name_of(&path, &dir),
                    path,
                    guard: root_guard.discover_subdir(),
                }),
                Err(e) => {
                    warn!(path = %dir, error = %e, "Skipping requested directory");
                    report.record_error(dir, &e);
                }
            }
        }
        drop(root_guard);

        let mut listings: JoinSet<ListingResult> = JoinSet::new();
        loop {
            if self.ctx.cancel.is_cancelled() {
                break;
            }
            while listings.len() < self.max_dir_listings {
                let Some(work) = queue.pop_front() else {
                    break;
                };
                listings.spawn(async move {
                    let result = list_dir(&work.path, &work.name).await;
                    (work, result)
                });
            }
            while let Some(joined) = producers.try_join_next() {
                reap(&mut report, joined);
            }

            let next = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => break,
                next = listings.join_next() => next,
            };
            // Queue and listings are both empty
            let Some(joined) = next else {
                break;
            };

            match joined {
                Ok((work, Ok(listing))) => {
                    self.expand(work, listing, &mut seen, &mut queue, &mut producers, &mut report);
                }
                Ok((work, Err(e))) => {
                    warn!(dir = %work.name, error = %e, "Skipping directory");
                    report.record_error(work.name, &e);
                }
                Err(e) => warn!(error = %e, "Directory listing task failed"),
            }
        }

        // Pending directories release their guards here.
        listings.abort_all();
        drop(queue);

        while let Some(joined) = producers.join_next().await {
            reap(&mut report, joined);
        }
        debug!(
            streamed = report.streamed,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "Expansion finished"
        );
        report
    }

    /// Register and start the children of one listed directory.
    ///
    /// Children already taken through another request item are left to
    /// the producer or listing that claimed them first.
    fn expand(
        &self,
        work: DirWork,
        listing: DirListing,
        seen: &mut Seen,
        queue: &mut VecDeque<DirWork>,
        producers: &mut JoinSet<(String, FileOutcome)>,
        report: &mut ExpansionReport,
    ) {
        let DirWork { name, path, guard } = work;
        debug!(
            dir = %name,
            files = listing.files.len(),
            dirs = listing.dirs.len(),
            "Directory listed"
        );

        for invalid in listing.invalid {
            let entry = join_name(&name, &invalid);
            warn!(name = %entry, "Skipping entry with a non UTF-8 name");
            report.skipped.push(SkippedItem {
                name: entry,
                reason: SkipReason::InvalidPath,
            });
        }

        let jobs: Vec<FileJob> = listing
            .files
            .into_iter()
            .map(|file| FileJob {
                name: join_name(&name, &file),
                path: path.join(&file),
            })
            .filter(|job| seen.files.insert(job.path.clone()))
            .collect();

        let tickets = guard.discover_files(jobs.len());
        for sub in listing.dirs {
            let sub_path = path.join(&sub);
            if !seen.dirs.insert(sub_path.clone()) {
                continue;
            }
            queue.push_back(DirWork {
                name: join_name(&name, &sub),
                path: sub_path,
                guard: guard.discover_subdir(),
            });
        }
        drop(guard);

        for (job, ticket) in jobs.into_iter().zip(tickets) {
            self.spawn_producer(producers, job, ticket);
        }
    }

    fn spawn_producer(
        &self,
        producers: &mut JoinSet<(String, FileOutcome)>,
        job: FileJob,
        ticket: FileTicket,
    ) {
        if self.ctx.cancel.is_cancelled() {
            return;
        }
        producers.spawn(FileProducer::new(job, ticket, self.ctx.clone()).run());
    }

    fn name_of(&self, path: &Path, requested: &str) -> String {
        relative_name(&self.root, path).unwrap_or_else(|_| requested.to_string())
    }
}

fn reap(report: &mut ExpansionReport, joined: std::result::Result<(String, FileOutcome), JoinError>) {
    match joined {
        Ok((name, outcome)) => report.record(name, outcome),
        Err(e) => warn!(error = %e, "File producer task failed"),
    }
}

fn join_name(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", parent, child)
    }
}
