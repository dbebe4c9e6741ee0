use askama::Template;

/// Hydration root for a server-rendered view. `child` is already
/// validated markup; the attribute values are escaped here.
#[derive(Template)]
#[template(
    source = r#"<div data-react-view="{{ name }}" data-react-props="{{ props }}">{{ child|safe }}</div>"#,
    ext = "html"
)]
pub struct ViewRootTemplate<'a> {
    pub name: &'a str,
    pub props: &'a str,
    pub child: &'a str,
}

/// URLs of the bundles every page loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAssets {
    pub stylesheet: String,
    pub vendor_script: String,
    pub views_script: String,
    pub app_script: String,
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageShellTemplate<'a> {
    pub title: &'a str,
    pub environment: &'a str,
    pub view: &'a str,
    pub assets: &'a PageAssets,
}
