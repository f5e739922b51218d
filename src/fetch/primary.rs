use std::sync::LazyLock;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{TranscriptFetcher, into_chronological, secs_to_millis};
use crate::youtube::YoutubeClient;
use crate::{FetchFailure, FetchReason, Segment, TranscriptSource, VideoId};

const CLIENT_VERSION: &str = "2.20241126.01.00";

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#).expect("api key regex"));
static API_KEY_FALLBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#).expect("api key regex"));

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Captions through the InnerTube player API, the same route the public
/// captions libraries take.
#[derive(Debug, Clone)]
pub struct PrimaryFetcher {
    client: YoutubeClient,
    lang: String,
}

impl PrimaryFetcher {
    pub fn new(client: YoutubeClient, lang: impl Into<String>) -> Self {
        Self {
            client,
            lang: lang.into(),
        }
    }

    async fn fetch_segments(&self, video_id: &str, cancel: &CancellationToken) -> Result<Vec<Segment>, FetchReason> {
        // Step 1: watch page for the InnerTube API key
        let page_html = self.client.get_text(&self.client.watch_url(video_id)?, cancel).await?;
        let api_key = extract_api_key(&page_html).ok_or(FetchReason::NotFound("InnerTube API key"))?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: player endpoint
        let player_url = self
            .client
            .url_with_query("/youtubei/v1/player", &[("key", api_key.as_str()), ("prettyPrint", "false")])?;
        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": self.lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": CLIENT_VERSION
                }
            },
            "videoId": video_id
        });
        let resp: InnerTubePlayerResponse = self.client.post_json(&player_url, &body, cancel).await?;

        let tracks = resp
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default();

        // Requested language first, otherwise whatever comes first
        let track = tracks
            .iter()
            .find(|t| t.language_code == self.lang)
            .or_else(|| tracks.first())
            .ok_or(FetchReason::NoTracks)?;
        debug!("Using caption track: lang={}", track.language_code);

        // Step 3: caption XML
        let caption_xml = self.client.get_text(&track.base_url, cancel).await?;
        let segments = parse_caption_xml(&caption_xml)?;
        if segments.is_empty() {
            return Err(FetchReason::Empty);
        }
        Ok(segments)
    }
}

#[async_trait]
impl TranscriptFetcher for PrimaryFetcher {
    fn strategy(&self) -> TranscriptSource {
        TranscriptSource::Primary
    }

    async fn fetch(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<Vec<Segment>, FetchFailure> {
        self.fetch_segments(video_id.as_str(), cancel)
            .await
            .map_err(|reason| FetchFailure::new(TranscriptSource::Primary, reason))
    }
}

fn extract_api_key(html: &str) -> Option<String> {
    API_KEY_RE
        .captures(html)
        .or_else(|| API_KEY_FALLBACK_RE.captures(html))
        .map(|caps| caps[1].to_string())
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, FetchReason> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<(u64, u64)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"start" => start = secs_to_millis(Some(&value)),
                        b"dur" => dur = secs_to_millis(Some(&value)),
                        _ => {}
                    }
                }
                let ordinal = segments.len() as u64 * 1000;
                current = Some((start.unwrap_or(ordinal), dur.unwrap_or(0)));
                text.clear();
            }
            Ok(Event::Text(ref e)) if current.is_some() => {
                let raw_text = e.unescape().unwrap_or_default();
                text.push_str(&raw_text);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                if let Some((offset_ms, duration_ms)) = current.take() {
                    // Captions are often double-escaped (`&amp;#39;`)
                    let decoded = html_escape::decode_html_entities(text.trim()).to_string();
                    if !decoded.is_empty() {
                        segments.push(Segment {
                            text: decoded,
                            offset_ms,
                            duration_ms,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchReason::Malformed(format!("caption XML: {e}"))),
            _ => {}
        }
    }

    Ok(into_chronological(segments))
}
