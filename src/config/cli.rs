use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use url::Url;

/// Command-line arguments for the Mondrian binary.
#[derive(Debug, Parser)]
#[command(name = "mondrian", version, about = "Mondrian web front-end")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MONDRIAN_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP front-end.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the deployment environment (development|production).
    #[arg(long = "environment", value_name = "ENV")]
    pub environment: Option<String>,

    /// Override the renderer endpoint.
    #[arg(long = "renderer-endpoint", value_name = "URL")]
    pub renderer_endpoint: Option<Url>,

    /// Override the renderer timeout in milliseconds.
    #[arg(long = "renderer-timeout-ms", value_name = "MILLIS")]
    pub renderer_timeout_ms: Option<u64>,

    /// Toggle server-side rendering.
    #[arg(
        long = "renderer-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub renderer_enabled: Option<bool>,

    /// Toggle storage of rendered pages.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Cap the number of stored pages.
    #[arg(long = "cache-max-entries", value_name = "COUNT")]
    pub cache_max_entries: Option<usize>,

    /// Override the directory served under `/build/`.
    #[arg(long = "assets-build-dir", value_name = "PATH")]
    pub assets_build_dir: Option<PathBuf>,

    /// Override the production asset manifest path.
    #[arg(long = "assets-manifest-path", value_name = "PATH")]
    pub assets_manifest_path: Option<PathBuf>,
}
