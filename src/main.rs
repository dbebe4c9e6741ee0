use std::{future::IntoFuture, process, sync::Arc};

use mondrian::{
    application::{
        error::AppError,
        newsletter::{NewsletterService, SubscriberDirectory, UnconfiguredDirectory},
        render::{ClientOnlyRenderer, PageAssembler, RendererClient},
        view::ViewService,
    },
    cache::{CacheConfig, RenderCache},
    config,
    infra::{
        assets::{AssetManifest, StaticDir},
        error::InfraError,
        http::{self, HttpState},
        mailchimp::MailchimpDirectory,
        renderer::HttpRendererClient,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_http_state(&settings)?;
    serve_http(&settings, state).await
}

fn build_http_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let environment = settings.site.environment;
    let manifest = AssetManifest::load(&settings.assets, environment)?;
    let assembler = PageAssembler::new(&settings.site.name, environment, &manifest);

    let renderer: Arc<dyn RendererClient> = if settings.renderer.enabled {
        let client =
            HttpRendererClient::new(settings.renderer.endpoint.clone(), settings.renderer.timeout)
                .map_err(|err| InfraError::configuration(format!("renderer client: {err}")))?;
        Arc::new(client)
    } else {
        Arc::new(ClientOnlyRenderer)
    };

    let cache = Arc::new(RenderCache::new(&CacheConfig::from(&settings.cache)));
    let views = ViewService::new(cache, renderer, Arc::new(assembler));

    let directory: Arc<dyn SubscriberDirectory> = match &settings.newsletter.mailing_list {
        Some(list) => Arc::new(MailchimpDirectory::new(&settings.newsletter.api_base, list)?),
        None => {
            warn!(
                target: "mondrian::newsletter",
                "no mailing list configured; newsletter signups will be refused"
            );
            Arc::new(UnconfiguredDirectory)
        }
    };

    Ok(HttpState {
        views: Arc::new(views),
        newsletter: Arc::new(NewsletterService::new(directory)),
        build_assets: Arc::new(StaticDir::new(
            &settings.assets.build_dir,
            environment,
            "infra::http::serve_build",
        )),
        source_assets: Arc::new(StaticDir::new(
            &settings.assets.source_dir,
            environment,
            "infra::http::serve_source",
        )),
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target: "mondrian::server",
        addr = %settings.server.addr,
        environment = %settings.site.environment,
        renderer = %settings.renderer.endpoint,
        server_rendering = settings.renderer.enabled,
        cache_enabled = settings.cache.enabled,
        cache_max_entries = settings.cache.max_entries.map(|n| n.get()),
        "listening"
    );

    let stop = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let stop = Arc::clone(&stop);
        async move { stop.notified().await }
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        result = &mut server => return flatten_server_result(result),
        () = shutdown_signal() => stop.notify_one(),
    }

    let grace = settings.server.graceful_shutdown;
    info!(target: "mondrian::server", grace_secs = grace.as_secs(), "draining connections");
    match tokio::time::timeout(grace, server).await {
        Ok(result) => flatten_server_result(result),
        Err(_) => {
            warn!(
                target: "mondrian::server",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

fn flatten_server_result(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target: "mondrian::server", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target: "mondrian::server", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!(target: "mondrian::server", "shutdown requested");
}
