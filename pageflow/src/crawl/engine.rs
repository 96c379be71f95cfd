//! The crawl loop: extract every page, then advance with retry.

use chrono::Utc;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::CrawlConfig;
use super::report::{CrawlReport, SkipRecord, StopReason};
use super::retry::{BackoffPolicy, RetryDecision, RetryState};
use super::source::{Navigator, PageSource};
use crate::cancellation::CancellationToken;
use crate::errors::{ConfigurationError, ItemExtractionFault};
use crate::events::{CrawlEvent, EventSink, NoOpEventSink};
use crate::extract::{ExtractionResult, FieldExtractor};

/// Accumulates results while a crawl runs.
struct RunState {
    run_id: String,
    results: Vec<ExtractionResult>,
    skipped: Vec<SkipRecord>,
    items_seen: usize,
    pages_visited: usize,
    retry: RetryState,
}

/// Drives a page source through a navigator, extracting every item.
///
/// Page `n + 1` is only requested once every item of page `n` has been
/// extracted. Item faults skip the item; navigation faults are retried with
/// exponential backoff and end the crawl gracefully once the attempt budget
/// is spent. A crawl never fails: it returns whatever it collected.
pub struct CrawlEngine<E> {
    extractor: E,
    config: CrawlConfig,
    policy: BackoffPolicy,
    event_sink: Arc<dyn EventSink>,
    cancellation: Option<Arc<CancellationToken>>,
}

impl<E> std::fmt::Debug for CrawlEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlEngine")
            .field("config", &self.config)
            .field("cancellable", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl<E> CrawlEngine<E> {
    /// Creates an engine, rejecting invalid bounds.
    pub fn new(extractor: E, config: CrawlConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            extractor,
            policy: BackoffPolicy::from_config(&config),
            config,
            event_sink: Arc::new(NoOpEventSink),
            cancellation: None,
        })
    }

    /// Sets the observer for crawl events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the token checked before every page and every backoff wait.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// The engine's extractor.
    #[must_use]
    pub const fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Runs a crawl starting at `source`.
    pub async fn crawl<S, N>(&self, source: S, navigator: &N) -> CrawlReport
    where
        S: PageSource,
        N: Navigator<S> + ?Sized,
        E: FieldExtractor<S::Item>,
    {
        let started_at = Utc::now();
        let mut run = RunState {
            run_id: Uuid::now_v7().to_string(),
            results: Vec::new(),
            skipped: Vec::new(),
            items_seen: 0,
            pages_visited: 0,
            retry: RetryState::new(),
        };

        info!(
            run_id = %run.run_id,
            max_pages = self.config.max_pages,
            max_nav_retries = self.config.max_nav_retries,
            "Crawl started"
        );
        self.emit(&CrawlEvent::Started {
            run_id: run.run_id.clone(),
            max_pages: self.config.max_pages,
            max_nav_retries: self.config.max_nav_retries,
        });

        let mut current = source;
        let mut page = 1usize;
        let stop_reason = loop {
            if let Some(stop) = self.check_cancelled(page) {
                break stop;
            }

            self.emit(&CrawlEvent::PageStarted {
                page,
                location: current.location(),
            });
            let items = current.items().await;
            if items.is_empty() {
                debug!(page, "Page has no items");
                self.emit(&CrawlEvent::PageExhausted { page });
                break StopReason::SourceExhausted;
            }

            run.pages_visited += 1;
            self.extract_page(page, &items, &mut run);

            if self.config.page_limit().is_some_and(|limit| page >= limit) {
                debug!(page, "Page limit reached");
                break StopReason::PageLimitReached;
            }

            let next_page = navigator.has_next(&current).await;
            if !next_page.should_advance() {
                debug!(page, "Terminal marker found");
                self.emit(&CrawlEvent::LastPage { page });
                break StopReason::LastPage;
            }

            let advanced = self.advance(page, &current, navigator, &mut run.retry).await;
            match advanced {
                Ok(next) => {
                    run.retry.reset();
                    current = next;
                    page += 1;
                    if let Some(settle) = &self.config.settle_delay {
                        self.pause(settle.sample()).await;
                    }
                }
                Err(stop) => break stop,
            }
        };

        info!(
            run_id = %run.run_id,
            pages = run.pages_visited,
            results = run.results.len(),
            skipped = run.skipped.len(),
            stop_reason = %stop_reason,
            "Crawl finished"
        );
        self.emit(&CrawlEvent::Completed {
            run_id: run.run_id.clone(),
            pages_visited: run.pages_visited,
            results: run.results.len(),
            skipped: run.skipped.len(),
            stop_reason: stop_reason.to_string(),
        });

        CrawlReport {
            run_id: run.run_id,
            results: run.results,
            pages_visited: run.pages_visited,
            items_seen: run.items_seen,
            skipped: run.skipped,
            navigation_retries: run.retry.total_retries,
            stop_reason,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn extract_page<I>(&self, page: usize, items: &[I], run: &mut RunState)
    where
        E: FieldExtractor<I>,
    {
        let mut extracted = 0;
        let mut skipped = 0;

        for (index, item) in items.iter().enumerate() {
            run.items_seen += 1;
            let outcome = catch_unwind(AssertUnwindSafe(|| self.extractor.extract(item))).unwrap_or_else(
                |payload| {
                    Err(ItemExtractionFault::new(format!(
                        "extractor panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                },
            );

            match outcome {
                Ok(result) => {
                    self.emit(&CrawlEvent::ItemExtracted {
                        page,
                        index,
                        fields_present: result.present(),
                        fields_absent: result.absent(),
                        fingerprint: result.fingerprint(),
                    });
                    run.results.push(result);
                    extracted += 1;
                }
                Err(fault) => {
                    warn!(page, index, reason = %fault.reason, "Item skipped");
                    self.emit(&CrawlEvent::ItemSkipped {
                        page,
                        index,
                        reason: fault.reason.clone(),
                    });
                    run.skipped.push(SkipRecord::new(page, index, fault.reason));
                    skipped += 1;
                }
            }
        }

        debug!(page, extracted, skipped, "Page completed");
        self.emit(&CrawlEvent::PageCompleted {
            page,
            extracted,
            skipped,
        });
    }

    async fn advance<S, N>(
        &self,
        page: usize,
        current: &S,
        navigator: &N,
        retry: &mut RetryState,
    ) -> Result<S, StopReason>
    where
        S: PageSource,
        N: Navigator<S> + ?Sized,
    {
        loop {
            let attempt = retry.begin_attempt();
            let fault = match navigator.advance(current).await {
                Ok(next) => {
                    debug!(page, attempt, "Navigation succeeded");
                    return Ok(next);
                }
                Err(fault) => fault,
            };

            match retry.after_failure(&self.policy, fault.is_transient()) {
                RetryDecision::Retry {
                    attempt: next_attempt,
                    delay,
                    units,
                } => {
                    let wait_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    warn!(page, attempt, wait_ms, error = %fault.message, "Navigation failed, retrying");
                    self.emit(&CrawlEvent::NavigationRetry {
                        page,
                        attempt: next_attempt,
                        wait_units: units,
                        wait_ms,
                        error: fault.message.clone(),
                    });
                    if let Some(stop) = self.check_cancelled(page) {
                        return Err(stop);
                    }
                    if !self.pause(delay).await {
                        return Err(self.cancelled_stop(page));
                    }
                }
                RetryDecision::GiveUp => {
                    warn!(page, attempts = attempt, error = %fault.message, "Navigation attempts exhausted");
                    self.emit(&CrawlEvent::NavigationExhausted { page, attempts: attempt });
                    return Err(StopReason::NavigationExhausted { attempts: attempt });
                }
                RetryDecision::NotRetryable => {
                    warn!(page, attempt, error = %fault.message, "Navigation failed permanently");
                    self.emit(&CrawlEvent::NavigationFailed {
                        page,
                        attempt,
                        error: fault.message.clone(),
                    });
                    return Err(StopReason::NavigationFailed { message: fault.message });
                }
            }
        }
    }

    /// Sleeps for `delay`, waking early on cancellation. Returns false if cancelled.
    async fn pause(&self, delay: Duration) -> bool {
        match &self.cancellation {
            Some(token) => tokio::select! {
                () = tokio::time::sleep(delay) => true,
                () = token.cancelled() => false,
            },
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }

    fn check_cancelled(&self, page: usize) -> Option<StopReason> {
        self.cancellation
            .as_ref()
            .filter(|token| token.is_cancelled())
            .map(|_| self.cancelled_stop(page))
    }

    fn cancelled_stop(&self, page: usize) -> StopReason {
        let reason = self.cancellation.as_ref().and_then(|token| token.reason());
        info!(page, reason = ?reason, "Crawl cancelled");
        self.emit(&CrawlEvent::Cancelled {
            page,
            reason: reason.clone(),
        });
        StopReason::Cancelled { reason }
    }

    fn emit(&self, event: &CrawlEvent) {
        self.event_sink.record(event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Crawls with default pacing and returns only the records.
///
/// `max_pages` of 0 crawls until the source is exhausted.
pub async fn crawl<S, N, E>(
    source: S,
    navigator: &N,
    extractor: E,
    max_pages: usize,
    max_nav_retries: u32,
) -> Result<Vec<ExtractionResult>, ConfigurationError>
where
    S: PageSource,
    N: Navigator<S> + ?Sized,
    E: FieldExtractor<S::Item>,
{
    let config = CrawlConfig::new()
        .with_max_pages(max_pages)
        .with_max_nav_retries(max_nav_retries);
    let engine = CrawlEngine::new(extractor, config)?;
    Ok(engine.crawl(source, navigator).await.into_results())
}
