pub mod config;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod summarize;
pub mod title;
pub mod youtube;

use serde::Serialize;

pub use error::{FetchFailure, FetchReason, PipelineError};

/// Opaque video identifier resolved from user input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub offset_ms: u64,
    pub duration_ms: u64,
}

/// Which acquisition strategy produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptSource {
    Primary,
    Timedtext,
    PageScrape,
    None,
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptSource::Primary => write!(f, "primary"),
            TranscriptSource::Timedtext => write!(f, "timedtext"),
            TranscriptSource::PageScrape => write!(f, "page-scrape"),
            TranscriptSource::None => write!(f, "none"),
        }
    }
}

/// Transcript acquired for a single request.
///
/// Segments are non-empty unless `source` is [`TranscriptSource::None`], in
/// which case both `segments` and `raw_text` are empty.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptResult {
    segments: Vec<Segment>,
    source: TranscriptSource,
    raw_text: String,
}

impl TranscriptResult {
    /// Build a result from segments produced by `source`.
    ///
    /// Returns `None` when `segments` is empty, since only the `None` source
    /// may carry an empty transcript.
    pub fn new(source: TranscriptSource, segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() || source == TranscriptSource::None {
            return None;
        }
        let raw_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Some(Self {
            segments,
            source,
            raw_text,
        })
    }

    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            source: TranscriptSource::None,
            raw_text: String::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn source(&self) -> TranscriptSource {
        self.source
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_empty(&self) -> bool {
        self.source == TranscriptSource::None
    }
}

const SHORT_LINK_HOST: &str = "youtu.be";
const SHORT_LINK_MARKER: &str = "youtu.be/";
const MAIN_HOST: &str = "youtube.com";

/// Extract a video ID from a YouTube URL.
///
/// Well-formed URLs are resolved by host: `youtu.be/<id>` takes the first path
/// segment, `*youtube.com*` takes the `v` query parameter (or the ID in an
/// `/embed/` or `/shorts/` path). Strings that do not parse as URLs fall back to
/// substring matching on `v=` and `youtu.be/`.
pub fn resolve_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();

    let token = match url::Url::parse(input) {
        Ok(parsed) => from_parsed_url(&parsed),
        Err(_) => from_substrings(input),
    }?;

    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(VideoId(token.to_string()))
}

fn from_parsed_url(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?.to_ascii_lowercase();

    if host == SHORT_LINK_HOST {
        return parsed.path_segments()?.next().map(str::to_string);
    }

    if host.contains(MAIN_HOST) {
        if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| *k == "v") {
            return Some(v.into_owned());
        }
        let mut segs = parsed.path_segments()?;
        let kind = segs.next().unwrap_or("");
        if kind == "embed" || kind == "shorts" {
            return segs.next().map(str::to_string);
        }
    }

    None
}

fn from_substrings(input: &str) -> Option<String> {
    if let Some((_, rest)) = input.split_once("v=") {
        return rest.split('&').next().map(str::to_string);
    }

    if let Some((_, rest)) = input.split_once(SHORT_LINK_MARKER) {
        return rest.split(['?', '/', '#']).next().map(str::to_string);
    }

    None
}
