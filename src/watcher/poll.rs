use crate::error::Result;
use crate::fixer::{FixRequest, IssueFixer};
use crate::store::processed::ProcessedSet;
use crate::store::IssueStore;
use crate::watcher::issue_url::parse_issue_url;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub seen: usize,
    pub skipped: usize,
    pub malformed: usize,
    pub fixed: usize,
    pub failed: usize,
}

/// Polls the issue store and opens a pull request for every issue not yet in the ledger.
pub struct PollDriver<S, F> {
    store: S,
    fixer: F,
    ledger: ProcessedSet,
    interval: Duration,
    max_cycles: Option<u64>,
}

impl<S: IssueStore, F: IssueFixer> PollDriver<S, F> {
    pub fn new(store: S, fixer: F, ledger: ProcessedSet, interval: Duration) -> Self {
        Self {
            store,
            fixer,
            ledger,
            interval,
            max_cycles: None,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    #[cfg(test)]
    pub fn fixer(&self) -> &F {
        &self.fixer
    }

    /// One pass over the store. Row failures are logged and do not stop the pass.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut processed = self.ledger.load()?;
        let rows = self.store.fetch_all().await?;
        let mut report = CycleReport {
            seen: rows.len(),
            ..CycleReport::default()
        };

        for row in rows {
            let Some(url) = row.issue_link.as_deref().map(str::trim) else {
                tracing::warn!(created_at = ?row.created_at, "row has no issue_link, skipping");
                report.malformed += 1;
                continue;
            };

            if processed.contains(url) {
                tracing::debug!(url, "already processed");
                report.skipped += 1;
                continue;
            }

            let issue = match parse_issue_url(url) {
                Ok(issue) => issue,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping row");
                    report.malformed += 1;
                    continue;
                }
            };

            tracing::info!(url, upstream = %issue.upstream, number = issue.number, "processing issue");
            let request = FixRequest {
                upstream: issue.upstream,
                issue_number: issue.number,
            };

            match self.fixer.fix(&request).await {
                Ok(pr) => {
                    self.ledger.append(url)?;
                    processed.insert(url.to_string());
                    tracing::info!(url, pr = %pr.url, "issue processed");
                    report.fixed += 1;
                }
                Err(e) => {
                    tracing::error!(url, error = %e, "could not fix issue");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Runs cycles until `shutdown` flips to true or `max_cycles` is reached.
    ///
    /// Shutdown is only observed between cycles, never in the middle of one.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut cycles: u64 = 0;

        while !*shutdown.borrow() {
            match self.run_cycle().await {
                Ok(report) => tracing::info!(
                    seen = report.seen,
                    skipped = report.skipped,
                    malformed = report.malformed,
                    fixed = report.fixed,
                    failed = report.failed,
                    "poll cycle finished"
                ),
                Err(e) => tracing::error!(error = %e, "poll cycle aborted"),
            }

            cycles += 1;
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                tracing::info!(cycles, "reached cycle limit, stopping");
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = stop_requested(&mut shutdown) => {}
            }
        }

        tracing::info!(cycles, "shutdown requested, poller stopped");
    }
}

/// Resolves once the flag is true. Never resolves if every sender is gone.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
