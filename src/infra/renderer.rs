//! Client for the co-located view renderer.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use crate::application::render::{RenderedFragment, RendererClient, single_node};

const METRIC_FALLBACK_TOTAL: &str = "mondrian_renderer_fallback_total";
const METRIC_REQUEST_MS: &str = "mondrian_renderer_request_ms";

/// Asks the renderer service for a view's markup over a form-encoded POST.
///
/// One attempt per render. The client timeout covers connecting, sending
/// and reading the whole body.
#[derive(Debug, Clone)]
pub struct HttpRendererClient {
    http: Client,
    endpoint: Url,
}

impl HttpRendererClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("mondrian/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, endpoint })
    }

    async fn fetch(&self, view: &str, props_json: &str) -> Result<String, Fallback> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .form(&[("view", view), ("props", props_json)])
            .send()
            .await
            .map_err(Fallback::transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Fallback {
                reason: "status",
                detail: format!("renderer answered {status}"),
            });
        }

        response.text().await.map_err(Fallback::transport)
    }
}

#[async_trait]
impl RendererClient for HttpRendererClient {
    async fn render(&self, view: &str, props_json: &str) -> RenderedFragment {
        let started = Instant::now();
        let outcome = self.fetch(view, props_json).await.and_then(|body| {
            single_node(&body).map_err(|err| Fallback {
                reason: "malformed",
                detail: err.to_string(),
            })
        });
        histogram!(METRIC_REQUEST_MS).record(started.elapsed().as_secs_f64() * 1_000.0);

        match outcome {
            Ok(markup) => {
                debug!(
                    target: "mondrian::renderer",
                    view,
                    bytes = markup.len(),
                    "renderer returned markup"
                );
                RenderedFragment::Markup(markup)
            }
            Err(fallback) => {
                counter!(METRIC_FALLBACK_TOTAL, "reason" => fallback.reason).increment(1);
                warn!(
                    target: "mondrian::renderer",
                    view,
                    reason = fallback.reason,
                    detail = %fallback.detail,
                    "renderer unavailable, serving client-mounted view"
                );
                RenderedFragment::Empty
            }
        }
    }
}

struct Fallback {
    reason: &'static str,
    detail: String,
}

impl Fallback {
    fn transport(err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "timeout"
        } else {
            "transport"
        };
        Self {
            reason,
            detail: err.to_string(),
        }
    }
}
