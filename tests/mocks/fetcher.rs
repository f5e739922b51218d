use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use ytstudy::fetch::TranscriptFetcher;
use ytstudy::{FetchFailure, FetchReason, Segment, TranscriptSource, VideoId};

#[derive(Clone)]
enum Behavior {
    Succeed(Vec<Segment>),
    Fail(FetchReason),
    Hang,
}

#[derive(Clone)]
pub struct MockFetcher {
    strategy: TranscriptSource,
    behavior: Behavior,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    fn with(strategy: TranscriptSource, behavior: Behavior) -> Self {
        Self {
            strategy,
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding(strategy: TranscriptSource, texts: &[&str]) -> Self {
        let segments = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Segment {
                text: text.to_string(),
                offset_ms: i as u64 * 1500,
                duration_ms: 1500,
            })
            .collect();
        Self::with(strategy, Behavior::Succeed(segments))
    }

    pub fn failing(strategy: TranscriptSource, reason: FetchReason) -> Self {
        Self::with(strategy, Behavior::Fail(reason))
    }

    /// Never completes on its own; only a timeout or cancellation ends it
    pub fn hanging(strategy: TranscriptSource) -> Self {
        Self::with(strategy, Behavior::Hang)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TranscriptFetcher for MockFetcher {
    fn strategy(&self) -> TranscriptSource {
        self.strategy
    }

    async fn fetch(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<Vec<Segment>, FetchFailure> {
        self.calls.lock().unwrap().push(video_id.to_string());
        match &self.behavior {
            Behavior::Succeed(segments) => Ok(segments.clone()),
            Behavior::Fail(reason) => Err(FetchFailure::new(self.strategy, reason.clone())),
            Behavior::Hang => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(FetchFailure::new(self.strategy, FetchReason::Cancelled)),
                    _ = tokio::time::sleep(Duration::from_secs(3600)) => unreachable!("hanging fetcher woke up"),
                }
            }
        }
    }
}
