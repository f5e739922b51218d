use std::sync::LazyLock;

use async_trait::async_trait;
use log::{debug, warn};
use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::{TranscriptFetcher, clean_text};
use crate::youtube::YoutubeClient;
use crate::{FetchFailure, FetchReason, Segment, TranscriptSource, VideoId};

static CAPTION_BASE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""captionTracks"\s*:\s*\[\s*\{[^\]]*?"baseUrl"\s*:\s*"([^"]+)""#).expect("baseUrl regex")
});
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""shortDescription"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("description regex"));

/// Last-resort scrape of the watch page.
///
/// Yields unstructured text: either the stripped body of the first embedded
/// caption track or, failing that, the video description. Timing is not
/// available, so as a segment list it is a single segment at offset zero.
#[derive(Debug, Clone)]
pub struct PageScrapeFetcher {
    client: YoutubeClient,
}

impl PageScrapeFetcher {
    pub fn new(client: YoutubeClient) -> Self {
        Self { client }
    }

    /// Best-effort transcript text for `video_id`
    pub async fn fetch_text(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<String, FetchFailure> {
        self.scrape(video_id.as_str(), cancel)
            .await
            .map_err(|reason| FetchFailure::new(TranscriptSource::PageScrape, reason))
    }

    async fn scrape(&self, video_id: &str, cancel: &CancellationToken) -> Result<String, FetchReason> {
        let html = self.client.get_text(&self.client.watch_url(video_id)?, cancel).await?;

        if let Some(caption_url) = extract_caption_url(&html) {
            debug!("Embedded caption track for {video_id}: {caption_url}");
            match self.client.get_text(&caption_url, cancel).await {
                Ok(body) => {
                    let text = clean_text(&body, " ");
                    if !text.is_empty() {
                        return Ok(text);
                    }
                    warn!("Embedded caption track for {video_id} was empty");
                }
                Err(FetchReason::Cancelled) => return Err(FetchReason::Cancelled),
                Err(e) => warn!("Embedded caption track for {video_id} failed: {e}"),
            }
        }

        match extract_description(&html) {
            Some(description) => {
                debug!("Using description of {video_id} as transcript stand-in");
                Ok(description)
            }
            None => Err(FetchReason::NotFound("caption track or description")),
        }
    }
}

#[async_trait]
impl TranscriptFetcher for PageScrapeFetcher {
    fn strategy(&self) -> TranscriptSource {
        TranscriptSource::PageScrape
    }

    async fn fetch(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<Vec<Segment>, FetchFailure> {
        let text = self.fetch_text(video_id, cancel).await?;
        Ok(vec![Segment {
            text,
            offset_ms: 0,
            duration_ms: 0,
        }])
    }
}

fn extract_caption_url(html: &str) -> Option<String> {
    CAPTION_BASE_URL_RE
        .captures(html)
        .map(|caps| caps[1].replace("\\u0026", "&"))
}

fn extract_description(html: &str) -> Option<String> {
    let raw = DESCRIPTION_RE.captures(html)?.get(1)?.as_str();
    let text = raw
        .replace("\\n", " ")
        .replace("\\\"", "\"")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() { None } else { Some(text) }
}
