use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Path, State},
    http::{
        HeaderMap, StatusCode,
        header::{ACCEPT_ENCODING, LOCATION},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    application::{
        error::{AppError, HttpError},
        newsletter::NewsletterService,
        view::ViewService,
    },
    domain::view::{Properties, ViewRequest},
    infra::assets::StaticDir,
};

use super::{
    middleware::{log_responses, set_request_context},
    response,
};

const EDITOR_VIEW: &str = "editor";
const INDEX_VIEW: &str = "index";

#[derive(Clone)]
pub struct HttpState {
    pub views: Arc<ViewService>,
    pub newsletter: Arc<NewsletterService>,
    pub build_assets: Arc<StaticDir>,
    pub source_assets: Arc<StaticDir>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(editor_view))
        .route("/files", get(index_view))
        .route("/files/", get(index_view))
        .route("/files/{*rest}", get(files_view))
        .route("/contributing", get(contributing_alias))
        .route("/newsletter/subscribe", post(newsletter_subscribe))
        .route("/build/{*path}", get(serve_build))
        .route("/assets/{*path}", get(serve_source))
        .route("/_health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn editor_view(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    render_view(&state, EDITOR_VIEW, &headers).await
}

async fn index_view(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    render_view(&state, INDEX_VIEW, &headers).await
}

/// `/files/{backend}/…` opens the editor on a backend path; any other path
/// under `/files` lists files.
async fn files_view(
    State(state): State<HttpState>,
    Path(rest): Path<String>,
    headers: HeaderMap,
) -> Response {
    match rest.split_once('/') {
        Some((backend, _)) if !backend.is_empty() => {
            debug!(target: "mondrian::http", backend, "opening editor for backend path");
            render_view(&state, EDITOR_VIEW, &headers).await
        }
        _ => render_view(&state, INDEX_VIEW, &headers).await,
    }
}

/// Both views hydrate from client-side routing, so their server props are
/// empty and every path under a prefix shares one cached page.
async fn render_view(state: &HttpState, name: &str, headers: &HeaderMap) -> Response {
    let request = match ViewRequest::new(name, Properties::new()) {
        Ok(request) => request,
        Err(err) => return AppError::from(err).into_response(),
    };

    let page = match state.views.render_view(&request, None).await {
        Ok(page) => page,
        Err(err) => return err.into_response(),
    };

    match response::write(
        page.entry.status,
        page.entry.body,
        page.entry.content_type,
        headers.get(ACCEPT_ENCODING),
    ) {
        Ok(response) => response,
        Err(err) => HttpError::from_error(
            "infra::http::public::render_view",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Response could not be written",
            &err,
        )
        .into_response(),
    }
}

/// Old URL that was shared publicly before the page moved to the root.
async fn contributing_alias() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, "/")])
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubscribeForm {
    email: String,
}

async fn newsletter_subscribe(
    State(state): State<HttpState>,
    Form(form): Form<SubscribeForm>,
) -> Response {
    match state.newsletter.subscribe(&form.email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn serve_build(State(state): State<HttpState>, path: Option<Path<String>>) -> Response {
    state.build_assets.serve(path.map(|Path(value)| value)).await
}

async fn serve_source(State(state): State<HttpState>, path: Option<Path<String>>) -> Response {
    state.source_assets.serve(path.map(|Path(value)| value)).await
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
