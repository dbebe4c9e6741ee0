use askama::Template;
use bytes::Bytes;

use crate::{
    config::Environment,
    infra::assets::AssetManifest,
    presentation::views::{PageAssets, PageShellTemplate},
};

use super::types::{PageShellContext, RenderError};

const STYLESHEET_BUNDLE: &str = "styles/bundles/app.css";
const VENDOR_BUNDLE: &str = "bundles/vendor.bundle.js";
const VIEWS_BUNDLE: &str = "bundles/views.bundle.js";
const APP_BUNDLE: &str = "bundles/app.bundle.js";

/// Embeds composed views into the page shell.
#[derive(Debug, Clone)]
pub struct PageAssembler {
    site_name: String,
    environment: Environment,
    assets: PageAssets,
}

impl PageAssembler {
    pub fn new(
        site_name: impl Into<String>,
        environment: Environment,
        manifest: &AssetManifest,
    ) -> Self {
        let assets = PageAssets {
            stylesheet: manifest.bundle(STYLESHEET_BUNDLE),
            vendor_script: manifest.bundle(VENDOR_BUNDLE),
            views_script: manifest.bundle(VIEWS_BUNDLE),
            app_script: manifest.bundle(APP_BUNDLE),
        };
        Self {
            site_name: site_name.into(),
            environment,
            assets,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn title(&self, title: Option<&str>) -> String {
        format_title(title, &self.site_name)
    }

    pub fn assemble(&self, context: &PageShellContext) -> Result<Bytes, RenderError> {
        let title = self.title(context.title.as_deref());
        let template = PageShellTemplate {
            title: &title,
            environment: context.environment.as_str(),
            view: &context.view.html,
            assets: &self.assets,
        };
        template.render().map(Bytes::from).map_err(|err| {
            RenderError::template("page shell", &context.view.name, err.to_string())
        })
    }
}

pub fn format_title(title: Option<&str>, site_name: &str) -> String {
    match title.map(str::trim).filter(|title| !title.is_empty()) {
        Some(title) => format!("{title} - {site_name}"),
        None => site_name.to_owned(),
    }
}
