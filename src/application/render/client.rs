use async_trait::async_trait;

use super::types::RenderedFragment;

/// Produces server-side markup for a named view.
///
/// Implementations never fail the page: any problem talking to the
/// renderer degrades to [`RenderedFragment::Empty`].
#[async_trait]
pub trait RendererClient: Send + Sync {
    async fn render(&self, view: &str, props_json: &str) -> RenderedFragment;
}

/// Renderer used when server-side rendering is switched off. Every view is
/// mounted by the client script.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientOnlyRenderer;

#[async_trait]
impl RendererClient for ClientOnlyRenderer {
    async fn render(&self, _view: &str, _props_json: &str) -> RenderedFragment {
        RenderedFragment::Empty
    }
}
