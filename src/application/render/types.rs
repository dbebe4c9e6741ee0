use axum::http::StatusCode;
use thiserror::Error;

use crate::config::Environment;

/// Outcome of asking the renderer for a view's server-side markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedFragment {
    /// A single validated top-level node.
    Markup(String),
    /// The renderer was unreachable or answered with something unusable.
    /// The client script mounts the view from scratch.
    Empty,
}

impl RenderedFragment {
    pub fn markup(&self) -> Option<&str> {
        match self {
            RenderedFragment::Markup(markup) => Some(markup.as_str()),
            RenderedFragment::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RenderedFragment::Empty)
    }
}

/// A view wrapped in its hydration root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedView {
    pub name: String,
    pub props_json: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct PageShellContext {
    pub view: ComposedView,
    pub title: Option<String>,
    pub environment: Environment,
    /// Status the assembled page is served with.
    pub status: StatusCode,
}

impl PageShellContext {
    pub fn new(view: ComposedView, title: Option<String>, environment: Environment) -> Self {
        Self {
            view,
            title,
            environment,
            status: StatusCode::OK,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("{stage} template failed for `{view}`: {message}")]
    Template {
        stage: &'static str,
        view: String,
        message: String,
    },
}

impl RenderError {
    pub fn template(
        stage: &'static str,
        view: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Template {
            stage,
            view: view.into(),
            message: message.into(),
        }
    }
}
