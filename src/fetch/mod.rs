//! Transcript acquisition strategies.
//!
//! Each fetcher owns one way of getting captions out of YouTube and reports
//! failure as a [`FetchFailure`] tagged with its strategy, so the orchestrator
//! can fall through to the next one.

pub mod page_scrape;
pub mod primary;
pub mod timedtext;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::{FetchFailure, Segment, TranscriptSource, VideoId};

pub use page_scrape::PageScrapeFetcher;
pub use primary::PrimaryFetcher;
pub use timedtext::TimedtextFetcher;

/// One transcript acquisition strategy
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    fn strategy(&self) -> TranscriptSource;

    /// Fetch segments for `video_id`. A successful return is never empty.
    async fn fetch(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<Vec<Segment>, FetchFailure>;
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

/// Replace markup tags with `separator`, decode entities and collapse whitespace
pub(crate) fn clean_text(raw: &str, separator: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, separator);
    let decoded = html_escape::decode_html_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert a seconds attribute to whole milliseconds, rejecting garbage
pub(crate) fn secs_to_millis(value: Option<&str>) -> Option<u64> {
    let secs = value?.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).floor() as u64)
}

/// Restore chronological order after lenient parsing
pub(crate) fn into_chronological(mut segments: Vec<Segment>) -> Vec<Segment> {
    segments.sort_by_key(|s| s.offset_ms);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  <font color=\"#fff\">Hi</font>  there&#39;s   more ", ""), "Hi there's more");
        assert_eq!(clean_text("a &amp; b &lt;c&gt; &quot;d&quot;", ""), "a & b <c> \"d\"");
        assert_eq!(clean_text("Hel<b>lo</b>", ""), "Hello");
        assert_eq!(clean_text("<p>one</p><p>two</p>", " "), "one two");
    }

    #[test]
    fn test_secs_to_millis() {
        assert_eq!(secs_to_millis(Some("1.5")), Some(1500));
        assert_eq!(secs_to_millis(Some("2.0009")), Some(2000));
        assert_eq!(secs_to_millis(Some("abc")), None);
        assert_eq!(secs_to_millis(Some("-1")), None);
        assert_eq!(secs_to_millis(Some("NaN")), None);
        assert_eq!(secs_to_millis(None), None);
    }

    #[test]
    fn test_into_chronological_is_stable() {
        let seg = |text: &str, offset_ms| Segment {
            text: text.to_string(),
            offset_ms,
            duration_ms: 0,
        };
        let sorted = into_chronological(vec![seg("b", 2000), seg("a", 1000), seg("c", 2000)]);
        let texts: Vec<_> = sorted.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
