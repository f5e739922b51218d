use std::future::Future;

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::FetchReason;

pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// HTTP access to the YouTube surfaces the fetchers scrape.
///
/// The base URL is configurable so tests can point every strategy at a mock
/// server; absolute URLs found inside responses (caption `baseUrl`s) are
/// fetched as-is.
#[derive(Debug, Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
}

impl YoutubeClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Join a path (with leading slash) onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Join `path` onto the base URL with form-encoded query pairs
    pub fn url_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<String, FetchReason> {
        url::Url::parse_with_params(&self.url(path), query)
            .map(String::from)
            .map_err(|e| FetchReason::Malformed(format!("request URL: {e}")))
    }

    pub fn watch_url(&self, video_id: &str) -> Result<String, FetchReason> {
        self.url_with_query("/watch", &[("v", video_id)])
    }

    /// GET `url` and return the body, failing on non-2xx
    pub async fn get_text(&self, url: &str, cancel: &CancellationToken) -> Result<String, FetchReason> {
        debug!("GET {url}");
        let request = async {
            self.http
                .get(url)
                .header("User-Agent", USER_AGENT)
                .header("Accept-Language", "en-US,en;q=0.9")
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        };
        cancellable(cancel, request).await?.map_err(FetchReason::from)
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, url: &str, body: &B, cancel: &CancellationToken) -> Result<T, FetchReason>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {url}");
        let request = async {
            self.http
                .post(url)
                .header("User-Agent", USER_AGENT)
                .json(body)
                .send()
                .await?
                .error_for_status()?
                .json::<T>()
                .await
        };
        cancellable(cancel, request).await?.map_err(FetchReason::from)
    }
}

/// Race `fut` against the cancellation token
pub async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, FetchReason>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchReason::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = YoutubeClient::new(reqwest::Client::new(), "http://localhost:1234/");
        assert_eq!(client.url("/x"), "http://localhost:1234/x");
        assert_eq!(client.watch_url("abc").unwrap(), "http://localhost:1234/watch?v=abc");
    }

    #[test]
    fn test_query_values_are_encoded() {
        let client = YoutubeClient::new(reqwest::Client::new(), "http://localhost:1234");
        assert_eq!(
            client.watch_url("abc&type=xyz#frag").unwrap(),
            "http://localhost:1234/watch?v=abc%26type%3Dxyz%23frag"
        );
        let url = client
            .url_with_query("/api/timedtext", &[("type", "list"), ("v", "a&v=b")])
            .unwrap();
        let pairs: Vec<(String, String)> = url::Url::parse(&url).unwrap().query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("type".to_string(), "list".to_string()),
                ("v".to_string(), "a&v=b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancellable_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = cancellable(&cancel, std::future::pending::<()>()).await;
        assert_eq!(out, Err(FetchReason::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellable_passes_through() {
        let cancel = CancellationToken::new();
        let out = cancellable(&cancel, async { 7 }).await;
        assert_eq!(out, Ok(7));
    }
}
