//! Asset manifest lookup and on-disk static file serving.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;
use tracing::info;

use crate::{
    application::error::ErrorReport,
    config::{AssetSettings, Environment},
};

use super::error::InfraError;

const BUILD_PREFIX: &str = "/build/";

/// Maps bundle names to the URLs the page shell links to.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    production: Option<ProductionManifest>,
}

#[derive(Debug, Clone)]
struct ProductionManifest {
    cdn_base_url: String,
    entries: HashMap<String, String>,
}

impl AssetManifest {
    /// Bundles are served unversioned from the local build directory.
    pub fn development() -> Self {
        Self { production: None }
    }

    pub fn production(cdn_base_url: impl Into<String>, entries: HashMap<String, String>) -> Self {
        let cdn_base_url = cdn_base_url.into().trim_end_matches('/').to_string();
        Self {
            production: Some(ProductionManifest {
                cdn_base_url,
                entries,
            }),
        }
    }

    /// Build the manifest for `environment`. Production reads the bundler's
    /// manifest file; a missing or malformed file is fatal.
    pub fn load(settings: &AssetSettings, environment: Environment) -> Result<Self, InfraError> {
        if !environment.is_production() {
            return Ok(Self::development());
        }

        let path = settings.manifest_path.as_path();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| InfraError::manifest(path, err.to_string()))?;
        let entries: HashMap<String, String> = serde_json::from_str(&raw)
            .map_err(|err| InfraError::manifest(path, err.to_string()))?;

        info!(
            target: "mondrian::assets",
            path = %path.display(),
            bundles = entries.len(),
            "loaded asset manifest"
        );
        Ok(Self::production(settings.cdn_base_url.clone(), entries))
    }

    /// URL for `name`. In production an unknown bundle resolves to its bare
    /// name, which the browser requests relative to the page.
    pub fn bundle(&self, name: &str) -> String {
        match &self.production {
            None => format!("{BUILD_PREFIX}{}", name.trim_start_matches('/')),
            Some(manifest) => match manifest.entries.get(name) {
                Some(path) => format!(
                    "{}{BUILD_PREFIX}{}",
                    manifest.cdn_base_url,
                    path.trim_start_matches('/')
                ),
                None => name.to_string(),
            },
        }
    }
}

/// A directory of files exposed under a URL prefix.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
    cache_control: &'static str,
    source: &'static str,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>, environment: Environment, source: &'static str) -> Self {
        let cache_control = if environment.is_production() {
            "public, max-age=31536000, immutable"
        } else {
            "no-cache"
        };
        Self {
            root: root.into(),
            cache_control,
            source,
        }
    }

    pub async fn serve(&self, path: Option<String>) -> Response {
        let Some(relative) = sanitize(path) else {
            return not_found_response(self.source);
        };

        match read_file(&self.root.join(&relative)).await {
            Ok(Some(contents)) => {
                let mime = mime_guess::from_path(&relative).first_or_octet_stream();
                build_response(Bytes::from(contents), mime, self.cache_control)
            }
            Ok(None) => not_found_response(self.source),
            Err(err) => {
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                ErrorReport::from_error(self.source, StatusCode::INTERNAL_SERVER_ERROR, &err)
                    .attach(&mut response);
                response
            }
        }
    }
}

/// Reject empty, directory and traversal paths; strip leading slashes.
fn sanitize(path: Option<String>) -> Option<PathBuf> {
    let candidate = path.unwrap_or_default();
    let candidate = candidate.trim_start_matches('/');

    if candidate.is_empty()
        || candidate.ends_with('/')
        || candidate.contains("..")
        || candidate.contains('\\')
        || candidate.contains('\0')
    {
        return None;
    }

    Some(PathBuf::from(candidate))
}

async fn read_file(path: &Path) -> Result<Option<Vec<u8>>, std::io::Error> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Ok(None),
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    }
    tokio::fs::read(path).await.map(Some)
}

fn not_found_response(source: &'static str) -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

fn build_response(bytes: Bytes, mime: Mime, cache_control: &'static str) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));

    response
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn settings(manifest_path: PathBuf) -> AssetSettings {
        AssetSettings {
            build_dir: PathBuf::from("build/dev"),
            source_dir: PathBuf::from("src"),
            manifest_path,
            cdn_base_url: "https://cdn.example.com/".into(),
        }
    }

    #[test]
    fn development_bundles_point_at_build_dir() {
        let manifest = AssetManifest::development();
        assert_eq!(
            manifest.bundle("bundles/app.bundle.js"),
            "/build/bundles/app.bundle.js"
        );
    }

    #[test]
    fn production_bundles_map_through_manifest() {
        let entries = HashMap::from([(
            "bundles/app.bundle.js".to_string(),
            "bundles/app.3f2a.bundle.js".to_string(),
        )]);
        let manifest = AssetManifest::production("https://cdn.example.com/", entries);

        assert_eq!(
            manifest.bundle("bundles/app.bundle.js"),
            "https://cdn.example.com/build/bundles/app.3f2a.bundle.js"
        );
        assert_eq!(manifest.bundle("bundles/other.js"), "bundles/other.js");
    }

    #[test]
    fn production_manifest_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bundles/app.bundle.js": "bundles/app.abc.js"}}"#).unwrap();

        let manifest =
            AssetManifest::load(&settings(file.path().to_path_buf()), Environment::Production)
                .unwrap();

        assert_eq!(
            manifest.bundle("bundles/app.bundle.js"),
            "https://cdn.example.com/build/bundles/app.abc.js"
        );
    }

    #[test]
    fn missing_production_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = AssetManifest::load(
            &settings(dir.path().join("manifest.json")),
            Environment::Production,
        );
        assert!(matches!(result, Err(InfraError::Manifest { .. })));
    }

    #[test]
    fn malformed_production_manifest_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        let result =
            AssetManifest::load(&settings(file.path().to_path_buf()), Environment::Production);
        assert!(matches!(result, Err(InfraError::Manifest { .. })));
    }

    #[test]
    fn development_ignores_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = AssetManifest::load(
            &settings(dir.path().join("missing.json")),
            Environment::Development,
        )
        .unwrap();
        assert_eq!(manifest.bundle("a.js"), "/build/a.js");
    }

    #[test]
    fn traversal_and_directory_paths_are_rejected() {
        assert!(sanitize(None).is_none());
        assert!(sanitize(Some(String::new())).is_none());
        assert!(sanitize(Some("../secret".into())).is_none());
        assert!(sanitize(Some("bundles/../../etc/passwd".into())).is_none());
        assert!(sanitize(Some("bundles/".into())).is_none());
        assert_eq!(
            sanitize(Some("/bundles/app.js".into())),
            Some(PathBuf::from("bundles/app.js"))
        );
    }

    #[tokio::test]
    async fn serves_files_with_guessed_mime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bundles")).unwrap();
        std::fs::write(dir.path().join("bundles/app.css"), "body { margin: 0 }").unwrap();
        let files = StaticDir::new(dir.path(), Environment::Development, "test");

        let response = files.serve(Some("bundles/app.css".into())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        let response = files.serve(Some("bundles".into())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = files.serve(Some("bundles/missing.js".into())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
