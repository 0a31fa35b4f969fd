use futures::future::BoxFuture;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;

/// Decides whether a URL points at a reachable image.
pub trait ImageValidator: Send + Sync {
    fn validate<'a>(&'a self, url: &'a str) -> BoxFuture<'a, bool>;
}

pub struct HttpImageValidator {
    client: Client,
}

impl HttpImageValidator {
    pub fn new(timeout: Duration) -> Result<HttpImageValidator, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpImageValidator { client })
    }

    async fn check(&self, url: &str) -> bool {
        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!("Image request to {} failed: {}", url, e);
                return false;
            }
        };

        if resp.status() != StatusCode::OK {
            tracing::debug!("Image request to {} returned {}", url, resp.status());
            return false;
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        is_image_content_type(content_type)
    }
}

impl ImageValidator for HttpImageValidator {
    fn validate<'a>(&'a self, url: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(self.check(url))
    }
}

pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split_once('/')
        .map(|(kind, _)| kind.trim().eq_ignore_ascii_case("image"))
        .unwrap_or(false)
}
