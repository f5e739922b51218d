use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::youtube::YoutubeClient;
use crate::{FetchReason, VideoId};

/// Title used when lookup fails
pub const UNKNOWN_TITLE: &str = "Video Title Not Found";

pub const DEFAULT_TITLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Looks up a video's display title
#[async_trait]
pub trait TitleSource: Send + Sync {
    /// Never fails; falls back to [`UNKNOWN_TITLE`]
    async fn title(&self, video_id: &VideoId, cancel: &CancellationToken) -> String;
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
}

/// Title lookup through the public oEmbed endpoint
#[derive(Debug, Clone)]
pub struct OEmbedTitles {
    client: YoutubeClient,
    timeout: Duration,
}

impl OEmbedTitles {
    pub fn new(client: YoutubeClient) -> Self {
        Self {
            client,
            timeout: DEFAULT_TITLE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn lookup(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<Option<String>, FetchReason> {
        let watch_url = url::Url::parse_with_params("https://www.youtube.com/watch", &[("v", video_id.as_str())])
            .map_err(|e| FetchReason::Malformed(format!("watch URL: {e}")))?;
        let url = self
            .client
            .url_with_query("/oembed", &[("url", watch_url.as_str()), ("format", "json")])?;

        let body = self.client.get_text(&url, cancel).await?;
        let response: OEmbedResponse =
            serde_json::from_str(&body).map_err(|e| FetchReason::Malformed(format!("oEmbed response: {e}")))?;
        Ok(response.title.filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl TitleSource for OEmbedTitles {
    async fn title(&self, video_id: &VideoId, cancel: &CancellationToken) -> String {
        match tokio::time::timeout(self.timeout, self.lookup(video_id, cancel)).await {
            Ok(Ok(Some(title))) => title,
            Ok(Ok(None)) => UNKNOWN_TITLE.to_string(),
            Ok(Err(e)) => {
                warn!("Failed to fetch video title for {video_id}: {e}");
                UNKNOWN_TITLE.to_string()
            }
            Err(_) => {
                warn!("Video title lookup for {video_id} timed out after {:?}", self.timeout);
                UNKNOWN_TITLE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn video() -> VideoId {
        crate::resolve_video_id("https://youtu.be/t1tle").unwrap()
    }

    #[tokio::test]
    async fn test_oembed_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "How Crabs Work",
                "author_name": "Sea Channel"
            })))
            .mount(&server)
            .await;

        let titles = OEmbedTitles::new(YoutubeClient::new(reqwest::Client::new(), server.uri()));
        assert_eq!(titles.title(&video(), &CancellationToken::new()).await, "How Crabs Work");
    }

    #[tokio::test]
    async fn test_oembed_query_carries_encoded_watch_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"title": "T"})))
            .mount(&server)
            .await;

        let titles = OEmbedTitles::new(YoutubeClient::new(reqwest::Client::new(), server.uri()));
        let video_id = VideoId("abc&format=xml".to_string());
        assert_eq!(titles.title(&video_id, &CancellationToken::new()).await, "T");

        let requests = server.received_requests().await.unwrap();
        let pairs: Vec<(String, String)> = requests[0].url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "url".to_string(),
                    "https://www.youtube.com/watch?v=abc%26format%3Dxml".to_string()
                ),
                ("format".to_string(), "json".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_slow_oembed_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"title": "Too Late"}))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let titles = OEmbedTitles::new(YoutubeClient::new(reqwest::Client::new(), server.uri()))
            .with_timeout(Duration::from_millis(100));
        let started = tokio::time::Instant::now();
        assert_eq!(titles.title(&video(), &CancellationToken::new()).await, UNKNOWN_TITLE);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_oembed_failure_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let titles = OEmbedTitles::new(YoutubeClient::new(reqwest::Client::new(), server.uri()));
        assert_eq!(titles.title(&video(), &CancellationToken::new()).await, UNKNOWN_TITLE);
    }
}
