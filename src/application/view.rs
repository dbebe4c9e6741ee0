//! Server-side rendered pages.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::{
    application::{
        error::AppError,
        render::{PageAssembler, PageShellContext, RenderError, RendererClient, compose},
    },
    cache::{CacheEntry, CacheOutcome, RenderCache, ViewKey, fingerprint_json},
    domain::view::{Properties, ViewRequest},
};

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub entry: CacheEntry,
    pub outcome: CacheOutcome,
}

#[derive(Clone)]
pub struct ViewService {
    cache: Arc<RenderCache>,
    renderer: Arc<dyn RendererClient>,
    assembler: Arc<PageAssembler>,
}

impl ViewService {
    pub fn new(
        cache: Arc<RenderCache>,
        renderer: Arc<dyn RendererClient>,
        assembler: Arc<PageAssembler>,
    ) -> Self {
        Self {
            cache,
            renderer,
            assembler,
        }
    }

    /// Render `name` with properties taken from any serializable value.
    pub async fn render<T: Serialize>(
        &self,
        name: &str,
        properties: &T,
        title: Option<&str>,
    ) -> Result<RenderedPage, AppError> {
        let properties = Properties::from_serializable(properties)?;
        let request = ViewRequest::new(name, properties)?;
        self.render_view(&request, title).await
    }

    /// Return the full page for `request`, rendering it on the first miss.
    ///
    /// The title lands in the page shell, so it is keyed alongside the view
    /// name and properties.
    pub async fn render_view(
        &self,
        request: &ViewRequest,
        title: Option<&str>,
    ) -> Result<RenderedPage, AppError> {
        let props_json = request.properties().to_canonical_json();
        let key = ViewKey::new(request.name(), fingerprint_json(&props_json)).with_title(title);

        let renderer = Arc::clone(&self.renderer);
        let assembler = Arc::clone(&self.assembler);
        let name = request.name().to_owned();
        let title = title.map(str::to_owned);

        let lookup = self
            .cache
            .get_or_render_key(key, move || async move {
                let fragment = renderer.render(&name, &props_json).await;
                let view = compose(&name, &props_json, &fragment)?;
                let context = PageShellContext::new(view, title, assembler.environment());
                let body = assembler.assemble(&context)?;
                debug!(
                    target: "mondrian::render",
                    view = %name,
                    server_rendered = !fragment.is_empty(),
                    bytes = body.len(),
                    "assembled page"
                );
                Ok::<_, RenderError>(CacheEntry::html(body).with_status(context.status))
            })
            .await?;

        Ok(RenderedPage {
            entry: lookup.entry,
            outcome: lookup.outcome,
        })
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        application::render::RenderedFragment,
        cache::CacheConfig,
        config::Environment,
        infra::assets::AssetManifest,
    };

    struct CountingRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RendererClient for CountingRenderer {
        async fn render(&self, _view: &str, _props_json: &str) -> RenderedFragment {
            self.calls.fetch_add(1, Ordering::SeqCst);
            RenderedFragment::Markup("<p>Hello</p>".into())
        }
    }

    fn service(renderer: Arc<CountingRenderer>) -> ViewService {
        let assembler = PageAssembler::new(
            "Mondrian",
            Environment::Development,
            &AssetManifest::development(),
        );
        ViewService::new(
            Arc::new(RenderCache::new(&CacheConfig::default())),
            renderer,
            Arc::new(assembler),
        )
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let renderer = Arc::new(CountingRenderer {
            calls: AtomicUsize::new(0),
        });
        let views = service(Arc::clone(&renderer));
        let request = ViewRequest::new("index", Properties::new()).unwrap();

        let first = views.render_view(&request, None).await.unwrap();
        let second = views.render_view(&request, None).await.unwrap();

        assert_eq!(first.outcome, CacheOutcome::Miss);
        assert_eq!(second.outcome, CacheOutcome::Hit);
        assert_eq!(first.entry.body, second.entry.body);
        assert_eq!(second.entry.status, axum::http::StatusCode::OK);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(views.cached_pages(), 1);
    }

    #[tokio::test]
    async fn titles_render_separate_pages() {
        let renderer = Arc::new(CountingRenderer {
            calls: AtomicUsize::new(0),
        });
        let views = service(Arc::clone(&renderer));
        let request = ViewRequest::new("index", Properties::new()).unwrap();

        let alpha = views.render_view(&request, Some("Alpha")).await.unwrap();
        let beta = views.render_view(&request, Some("Beta")).await.unwrap();
        let alpha_again = views.render_view(&request, Some("Alpha")).await.unwrap();

        let beta_html = std::str::from_utf8(&beta.entry.body).unwrap();
        assert!(beta_html.contains("<title>Beta - Mondrian</title>"));
        assert!(!beta_html.contains("Alpha"));
        assert_eq!(beta.outcome, CacheOutcome::Miss);
        assert_eq!(alpha_again.outcome, CacheOutcome::Hit);
        assert_eq!(alpha.entry.body, alpha_again.entry.body);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(views.cached_pages(), 2);
    }

    #[tokio::test]
    async fn equivalent_properties_share_an_entry() {
        let renderer = Arc::new(CountingRenderer {
            calls: AtomicUsize::new(0),
        });
        let views = service(Arc::clone(&renderer));

        views
            .render("editor", &json!({"a": 1, "b": {"c": 2, "d": 3}}), None)
            .await
            .unwrap();
        let page = views
            .render("editor", &json!({"b": {"d": 3, "c": 2}, "a": 1}), None)
            .await
            .unwrap();

        assert_eq!(page.outcome, CacheOutcome::Hit);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_object_properties_are_rejected_before_rendering() {
        let renderer = Arc::new(CountingRenderer {
            calls: AtomicUsize::new(0),
        });
        let views = service(Arc::clone(&renderer));

        let result = views.render("editor", &json!([1, 2, 3]), None).await;

        assert!(matches!(result, Err(AppError::Domain(_))));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }
}
