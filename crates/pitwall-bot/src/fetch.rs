//! Car image download with a bounded wait.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_util::future::BoxFuture;
use pitwall_core::model::Resource;
use tracing::{debug, warn};

pub trait ImageFetcher: Send + Sync {
    fn car_image(&self, server_url: &str, car_id: &str) -> BoxFuture<'static, Result<Resource>>;
}

/// Fetches car thumbnails from the game server's web API.
#[derive(Clone)]
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

pub fn car_image_url(server_url: &str, car_id: &str) -> String {
    format!(
        "{}/rest/race/car/{}/image?type=IMAGE_SMALL",
        server_url.trim_end_matches('/'),
        car_id
    )
}

impl ImageFetcher for HttpImageFetcher {
    fn car_image(&self, server_url: &str, car_id: &str) -> BoxFuture<'static, Result<Resource>> {
        let http = self.http.clone();
        let url = car_image_url(server_url, car_id);
        let name = format!("car_{car_id}");
        Box::pin(async move {
            let response = http
                .get(&url)
                .send()
                .await
                .with_context(|| format!("Car image request failed for {url}"))?;
            if !response.status().is_success() {
                bail!("Car image request failed with status {}", response.status());
            }
            let mime_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("image/png")
                .to_string();
            let data = response
                .bytes()
                .await
                .context("Failed to read car image bytes")?;
            Ok(Resource::new(name, mime_type, data))
        })
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Ready(Resource),
    Failed(anyhow::Error),
    TimedOut,
}

/// Runs the fetch on its own task and waits at most `timeout` for it.
///
/// On expiry the task is aborted and the caller gets [`FetchOutcome::TimedOut`].
pub async fn car_image_within(
    fetcher: &Arc<dyn ImageFetcher>,
    server_url: &str,
    car_id: &str,
    timeout: Duration,
) -> FetchOutcome {
    let mut task = tokio::spawn(fetcher.car_image(server_url, car_id));
    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(Ok(resource))) if !resource.is_zero() => FetchOutcome::Ready(resource),
        Ok(Ok(Ok(_))) => FetchOutcome::Failed(anyhow::anyhow!("empty image")),
        Ok(Ok(Err(err))) => {
            debug!(car_id, "car image fetch failed: {err:#}");
            FetchOutcome::Failed(err)
        }
        Ok(Err(join_err)) => {
            warn!(car_id, "car image task failed: {join_err}");
            FetchOutcome::Failed(join_err.into())
        }
        Err(_) => {
            task.abort();
            debug!(car_id, timeout_ms = timeout.as_millis() as u64, "car image fetch timed out");
            FetchOutcome::TimedOut
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use bytes::Bytes;

    use super::*;

    /// Fetcher that answers after `delay`, or fails when `fail` is set.
    pub struct StubFetcher {
        pub delay: Duration,
        pub fail: bool,
    }

    impl ImageFetcher for StubFetcher {
        fn car_image(&self, _server_url: &str, car_id: &str) -> BoxFuture<'static, Result<Resource>> {
            let delay = self.delay;
            let fail = self.fail;
            let name = format!("car_{car_id}");
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                if fail {
                    bail!("connection refused");
                }
                Ok(Resource::new(name, "image/png", Bytes::from_static(b"png")))
            })
        }
    }
}
