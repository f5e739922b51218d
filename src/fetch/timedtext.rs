use std::sync::LazyLock;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::{TranscriptFetcher, clean_text, into_chronological, secs_to_millis};
use crate::youtube::YoutubeClient;
use crate::{FetchFailure, FetchReason, Segment, TranscriptSource, VideoId};

/// Duration assumed for a `<text>` element without a usable `dur`
const DEFAULT_DUR_MS: u64 = 2000;

static LANG_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"lang_code="([^"]+)""#).expect("lang_code regex"));
static TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").expect("text regex"));
static START_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bstart="([^"]*)""#).expect("start regex"));
static DUR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bdur="([^"]*)""#).expect("dur regex"));

/// Captions straight from the `/api/timedtext` track listing.
#[derive(Debug, Clone)]
pub struct TimedtextFetcher {
    client: YoutubeClient,
}

impl TimedtextFetcher {
    pub fn new(client: YoutubeClient) -> Self {
        Self { client }
    }

    async fn fetch_segments(&self, video_id: &str, cancel: &CancellationToken) -> Result<Vec<Segment>, FetchReason> {
        let list_url = self
            .client
            .url_with_query("/api/timedtext", &[("type", "list"), ("v", video_id)])?;
        let listing = self.client.get_text(&list_url, cancel).await?;

        let lang = first_lang_code(&listing).ok_or(FetchReason::NoTracks)?;
        debug!("Timedtext track for {video_id}: lang={lang}");

        let caption_url = self
            .client
            .url_with_query("/api/timedtext", &[("lang", lang.as_str()), ("v", video_id)])?;
        let payload = self.client.get_text(&caption_url, cancel).await?;

        let segments = parse_timedtext(&payload);
        if segments.is_empty() {
            return Err(FetchReason::Empty);
        }
        Ok(segments)
    }
}

#[async_trait]
impl TranscriptFetcher for TimedtextFetcher {
    fn strategy(&self) -> TranscriptSource {
        TranscriptSource::Timedtext
    }

    async fn fetch(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<Vec<Segment>, FetchFailure> {
        self.fetch_segments(video_id.as_str(), cancel)
            .await
            .map_err(|reason| FetchFailure::new(TranscriptSource::Timedtext, reason))
    }
}

fn first_lang_code(listing: &str) -> Option<String> {
    LANG_CODE_RE.captures(listing).map(|caps| caps[1].to_string())
}

/// Parse `<text start=".." dur="..">` elements leniently.
///
/// A missing or unparseable `start` falls back to the element's ordinal in
/// seconds and `dur` to two seconds; elements with no text after cleanup are
/// dropped.
fn parse_timedtext(payload: &str) -> Vec<Segment> {
    let segments = TEXT_RE
        .captures_iter(payload)
        .enumerate()
        .filter_map(|(index, caps)| {
            let attrs = &caps[1];
            // Self-closing elements carry no text
            let text = clean_text(caps.get(2)?.as_str(), "");
            if text.is_empty() {
                return None;
            }
            Some(Segment {
                text,
                offset_ms: secs_to_millis(attribute(&START_RE, attrs)).unwrap_or(index as u64 * 1000),
                duration_ms: secs_to_millis(attribute(&DUR_RE, attrs)).unwrap_or(DEFAULT_DUR_MS),
            })
        })
        .collect();
    into_chronological(segments)
}

fn attribute<'a>(re: &Regex, attrs: &'a str) -> Option<&'a str> {
    re.captures(attrs).and_then(|c| c.get(1)).map(|m| m.as_str())
}
