//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    fmt,
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment as EnvironmentSource, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mondrian";
const ENV_PREFIX: &str = "MONDRIAN";
const LEGACY_ENVIRONMENT_VAR: &str = "MONDRIAN_ENV";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8060;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 10;
const DEFAULT_SITE_NAME: &str = "Mondrian";
const DEFAULT_RENDERER_ENDPOINT: &str = "http://127.0.0.1:8111/";
const DEFAULT_RENDERER_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_BUILD_DIR: &str = "build/dev";
const DEFAULT_SOURCE_DIR: &str = "src";
const DEFAULT_MANIFEST_PATH: &str = "build/prod/manifest.json";
const DEFAULT_CDN_BASE_URL: &str = "https://d3ozpu4dhcdupq.cloudfront.net";
const DEFAULT_NEWSLETTER_API_BASE: &str = "https://us17.api.mailchimp.com/3.0/";

/// Deployment environment. Process-wide and read-only once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "development" => Ok(Environment::Development),
            "prod" | "production" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment `{other}` (expected development or production)"
            )),
        }
    }
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub site: SiteSettings,
    pub renderer: RendererSettings,
    pub cache: CacheSettings,
    pub assets: AssetSettings,
    pub newsletter: NewsletterSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub name: String,
    pub environment: Environment,
}

#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// When false every view is mounted by the client script.
    pub enabled: bool,
    pub endpoint: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Unset keeps every rendered page for the life of the process.
    pub max_entries: Option<NonZeroUsize>,
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub build_dir: PathBuf,
    pub source_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub cdn_base_url: String,
}

#[derive(Debug, Clone)]
pub struct NewsletterSettings {
    pub api_base: Url,
    pub mailing_list: Option<MailingListSettings>,
}

#[derive(Clone)]
pub struct MailingListSettings {
    pub list_id: String,
    pub api_key: String,
}

impl fmt::Debug for MailingListSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailingListSettings")
            .field("list_id", &self.list_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(EnvironmentSource::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_legacy_environment(std::env::var(LEGACY_ENVIRONMENT_VAR).ok());

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    site: RawSiteSettings,
    renderer: RawRendererSettings,
    cache: RawCacheSettings,
    assets: RawAssetSettings,
    newsletter: RawNewsletterSettings,
}

impl RawSettings {
    /// `MONDRIAN_ENV` predates the layered configuration; it only fills the
    /// environment when no other source set it.
    fn apply_legacy_environment(&mut self, legacy: Option<String>) {
        if self.site.environment.is_some() {
            return;
        }
        if let Some(value) = legacy.filter(|value| !value.trim().is_empty()) {
            self.site.environment = Some(value);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(environment) = overrides.environment.as_ref() {
            self.site.environment = Some(environment.clone());
        }
        if let Some(endpoint) = overrides.renderer_endpoint.as_ref() {
            self.renderer.endpoint = Some(endpoint.to_string());
        }
        if let Some(timeout) = overrides.renderer_timeout_ms {
            self.renderer.timeout_ms = Some(timeout);
        }
        if let Some(enabled) = overrides.renderer_enabled {
            self.renderer.enabled = Some(enabled);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(max) = overrides.cache_max_entries {
            self.cache.max_entries = Some(max);
        }
        if let Some(dir) = overrides.assets_build_dir.as_ref() {
            self.assets.build_dir = Some(dir.clone());
        }
        if let Some(path) = overrides.assets_manifest_path.as_ref() {
            self.assets.manifest_path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            site,
            renderer,
            cache,
            assets,
            newsletter,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let site = build_site_settings(site)?;
        let renderer = build_renderer_settings(renderer)?;
        let cache = build_cache_settings(cache)?;
        let assets = build_asset_settings(assets, site.environment)?;
        let newsletter = build_newsletter_settings(newsletter)?;

        Ok(Self {
            server,
            logging,
            site,
            renderer,
            cache,
            assets,
            newsletter,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let name = site
        .name
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string());
    if name.is_empty() {
        return Err(LoadError::invalid("site.name", "must not be empty"));
    }

    let environment = match site.environment {
        Some(value) => Environment::from_str(&value)
            .map_err(|reason| LoadError::invalid("site.environment", reason))?,
        None => Environment::Development,
    };

    Ok(SiteSettings { name, environment })
}

fn build_renderer_settings(renderer: RawRendererSettings) -> Result<RendererSettings, LoadError> {
    let endpoint = renderer
        .endpoint
        .unwrap_or_else(|| DEFAULT_RENDERER_ENDPOINT.to_string());
    let endpoint = Url::parse(endpoint.trim())
        .map_err(|err| LoadError::invalid("renderer.endpoint", format!("invalid URL: {err}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "renderer.endpoint",
            "scheme must be http or https",
        ));
    }

    let timeout_ms = renderer.timeout_ms.unwrap_or(DEFAULT_RENDERER_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "renderer.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(RendererSettings {
        enabled: renderer.enabled.unwrap_or(true),
        endpoint,
        timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let max_entries = match cache.max_entries {
        Some(0) => {
            return Err(LoadError::invalid(
                "cache.max_entries",
                "must be greater than zero",
            ));
        }
        value => value.and_then(NonZeroUsize::new),
    };

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        max_entries,
    })
}

fn build_asset_settings(
    assets: RawAssetSettings,
    environment: Environment,
) -> Result<AssetSettings, LoadError> {
    let build_dir = non_empty_path(assets.build_dir, DEFAULT_BUILD_DIR, "assets.build_dir")?;
    let source_dir = non_empty_path(assets.source_dir, DEFAULT_SOURCE_DIR, "assets.source_dir")?;
    let manifest_path = non_empty_path(
        assets.manifest_path,
        DEFAULT_MANIFEST_PATH,
        "assets.manifest_path",
    )?;

    let cdn_base_url = match assets.cdn_base_url {
        Some(value) => value.trim().trim_end_matches('/').to_string(),
        None if environment.is_production() => DEFAULT_CDN_BASE_URL.to_string(),
        None => String::new(),
    };
    if !cdn_base_url.is_empty() {
        Url::parse(&cdn_base_url).map_err(|err| {
            LoadError::invalid("assets.cdn_base_url", format!("invalid URL: {err}"))
        })?;
    }

    Ok(AssetSettings {
        build_dir,
        source_dir,
        manifest_path,
        cdn_base_url,
    })
}

fn build_newsletter_settings(
    newsletter: RawNewsletterSettings,
) -> Result<NewsletterSettings, LoadError> {
    let api_base = newsletter
        .api_base
        .unwrap_or_else(|| DEFAULT_NEWSLETTER_API_BASE.to_string());
    let mut api_base = Url::parse(api_base.trim())
        .map_err(|err| LoadError::invalid("newsletter.api_base", format!("invalid URL: {err}")))?;
    if !api_base.path().ends_with('/') {
        let path = format!("{}/", api_base.path());
        api_base.set_path(&path);
    }

    let list_id = non_blank(newsletter.list_id);
    let api_key = non_blank(newsletter.api_key);
    let mailing_list = match (list_id, api_key) {
        (Some(list_id), Some(api_key)) => Some(MailingListSettings { list_id, api_key }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(LoadError::invalid(
                "newsletter.api_key",
                "required when newsletter.list_id is set",
            ));
        }
        (None, Some(_)) => {
            return Err(LoadError::invalid(
                "newsletter.list_id",
                "required when newsletter.api_key is set",
            ));
        }
    };

    Ok(NewsletterSettings {
        api_base,
        mailing_list,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    name: Option<String>,
    environment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRendererSettings {
    enabled: Option<bool>,
    endpoint: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    max_entries: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    build_dir: Option<PathBuf>,
    source_dir: Option<PathBuf>,
    manifest_path: Option<PathBuf>,
    cdn_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNewsletterSettings {
    api_base: Option<String>,
    list_id: Option<String>,
    api_key: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests;
