//! Transcript acquisition state machine.
//!
//! Strategies run strictly in order (primary, timedtext, page-scrape), each at
//! most once and each under its own timeout. The first success wins. When all
//! of them fail, [`Orchestrator::acquire`] falls back to a title-only summary
//! while [`Orchestrator::fetch_transcript`] reports exhaustion.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::{GenerateError, summarize_failures};
use crate::fetch::{PageScrapeFetcher, PrimaryFetcher, TimedtextFetcher, TranscriptFetcher};
use crate::llm::Generator;
use crate::summarize::summarize_without_transcript;
use crate::youtube::YoutubeClient;
use crate::{FetchFailure, FetchReason, PipelineError, TranscriptResult, TranscriptSource, VideoId};

pub const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a completed acquisition
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub result: TranscriptResult,
    /// Failures of the strategies tried before the outcome, in order
    pub failures: Vec<FetchFailure>,
    /// Title-only summary, present exactly when `result` is empty
    pub fallback_summary: Option<String>,
}

impl Acquisition {
    /// True when the primary strategy did not deliver the transcript
    pub fn used_fallback(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn no_transcript(&self) -> bool {
        self.result.is_empty()
    }

    /// Aggregated failure text for diagnostics
    pub fn error_info(&self) -> Option<String> {
        if self.failures.is_empty() {
            None
        } else {
            Some(summarize_failures(&self.failures))
        }
    }
}

#[derive(Debug)]
enum State<'a> {
    Trying {
        strategy: TranscriptSource,
        failures: Vec<FetchFailure>,
    },
    TryingNoTranscript {
        title: &'a str,
        failures: Vec<FetchFailure>,
    },
    Done(Acquisition),
    Failed(PipelineError),
}

/// Runs the fetchers in fallthrough order
#[derive(Clone)]
pub struct Orchestrator {
    primary: Arc<dyn TranscriptFetcher>,
    timedtext: Arc<dyn TranscriptFetcher>,
    page_scrape: Arc<dyn TranscriptFetcher>,
    generator: Arc<dyn Generator>,
    strategy_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        primary: Arc<dyn TranscriptFetcher>,
        timedtext: Arc<dyn TranscriptFetcher>,
        page_scrape: Arc<dyn TranscriptFetcher>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            primary,
            timedtext,
            page_scrape,
            generator,
            strategy_timeout: DEFAULT_STRATEGY_TIMEOUT,
        }
    }

    /// Wire the three YouTube fetchers over one client
    pub fn for_youtube(client: YoutubeClient, lang: &str, generator: Arc<dyn Generator>) -> Self {
        Self::new(
            Arc::new(PrimaryFetcher::new(client.clone(), lang)),
            Arc::new(TimedtextFetcher::new(client.clone())),
            Arc::new(PageScrapeFetcher::new(client)),
            generator,
        )
    }

    pub fn with_strategy_timeout(mut self, timeout: Duration) -> Self {
        self.strategy_timeout = timeout;
        self
    }

    /// Acquire a transcript, or a title-only summary when none can be fetched.
    ///
    /// Only cancellation or a failing generative call is fatal.
    pub async fn acquire(
        &self,
        video_id: &VideoId,
        title: &str,
        cancel: &CancellationToken,
    ) -> Result<Acquisition, PipelineError> {
        self.run(video_id, Some(title), cancel).await
    }

    /// Acquire a transcript without the title-only fallback.
    ///
    /// Fails with [`PipelineError::Exhausted`] when every strategy fails.
    pub async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> Result<Acquisition, PipelineError> {
        self.run(video_id, None, cancel).await
    }

    async fn run(
        &self,
        video_id: &VideoId,
        title: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Acquisition, PipelineError> {
        let mut state = State::Trying {
            strategy: TranscriptSource::Primary,
            failures: Vec::new(),
        };

        loop {
            state = match state {
                State::Trying { strategy, failures } => self.try_strategy(video_id, strategy, failures, title, cancel).await,
                State::TryingNoTranscript { title, failures } => {
                    self.try_no_transcript(video_id, title, failures, cancel).await
                }
                State::Done(acquisition) => return Ok(acquisition),
                State::Failed(err) => {
                    error!("Acquisition for {video_id} failed: {err}");
                    return Err(err);
                }
            };
        }
    }

    async fn try_strategy<'a>(
        &self,
        video_id: &VideoId,
        strategy: TranscriptSource,
        mut failures: Vec<FetchFailure>,
        title: Option<&'a str>,
        cancel: &CancellationToken,
    ) -> State<'a> {
        if cancel.is_cancelled() {
            return State::Failed(PipelineError::Cancelled);
        }
        info!("{video_id}: trying {strategy} strategy");

        let failure = match self.attempt(video_id, strategy, cancel).await {
            Ok(result) => {
                info!(
                    "{video_id}: {strategy} strategy succeeded with {} segments",
                    result.segments().len()
                );
                return State::Done(Acquisition {
                    result,
                    failures,
                    fallback_summary: None,
                });
            }
            Err(failure) => failure,
        };

        if failure.reason == FetchReason::Cancelled {
            return State::Failed(PipelineError::Cancelled);
        }
        warn!("{video_id}: {failure} [{}]", failure.reason.code());
        failures.push(failure);

        match (next_strategy(strategy), title) {
            (Some(next), _) => State::Trying {
                strategy: next,
                failures,
            },
            (None, Some(title)) => State::TryingNoTranscript { title, failures },
            (None, None) => State::Failed(PipelineError::Exhausted(failures)),
        }
    }

    async fn try_no_transcript<'a>(
        &self,
        video_id: &VideoId,
        title: &str,
        failures: Vec<FetchFailure>,
        cancel: &CancellationToken,
    ) -> State<'a> {
        warn!(
            "{video_id}: all transcript strategies failed ({}), summarizing from title",
            summarize_failures(&failures)
        );
        match summarize_without_transcript(self.generator.as_ref(), video_id, title, cancel).await {
            Ok(summary) => State::Done(Acquisition {
                result: TranscriptResult::empty(),
                failures,
                fallback_summary: Some(summary),
            }),
            Err(GenerateError::Cancelled) => State::Failed(PipelineError::Cancelled),
            Err(e) => State::Failed(PipelineError::Generation(e)),
        }
    }

    async fn attempt(
        &self,
        video_id: &VideoId,
        strategy: TranscriptSource,
        cancel: &CancellationToken,
    ) -> Result<TranscriptResult, FetchFailure> {
        let fetcher = match strategy {
            TranscriptSource::Primary => &self.primary,
            TranscriptSource::Timedtext => &self.timedtext,
            TranscriptSource::PageScrape => &self.page_scrape,
            TranscriptSource::None => return Err(FetchFailure::new(strategy, FetchReason::NotFound("fetcher"))),
        };

        // Provenance comes from the fetcher itself
        let source = fetcher.strategy();
        let segments = match tokio::time::timeout(self.strategy_timeout, fetcher.fetch(video_id, cancel)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(FetchFailure::new(
                    source,
                    FetchReason::Timeout {
                        secs: self.strategy_timeout.as_secs(),
                    },
                ));
            }
        };

        TranscriptResult::new(source, segments).ok_or_else(|| FetchFailure::new(source, FetchReason::Empty))
    }
}

fn next_strategy(current: TranscriptSource) -> Option<TranscriptSource> {
    match current {
        TranscriptSource::Primary => Some(TranscriptSource::Timedtext),
        TranscriptSource::Timedtext => Some(TranscriptSource::PageScrape),
        TranscriptSource::PageScrape | TranscriptSource::None => None,
    }
}
