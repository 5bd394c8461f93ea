use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport used by [`HttpFeed`](super::HttpFeed) to send prepared requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
