use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use ytstudy::VideoId;
use ytstudy::title::TitleSource;

pub struct FixedTitle(pub &'static str);

#[async_trait]
impl TitleSource for FixedTitle {
    async fn title(&self, _video_id: &VideoId, _cancel: &CancellationToken) -> String {
        self.0.to_string()
    }
}
