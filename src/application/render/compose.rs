use askama::Template;

use crate::presentation::views::ViewRootTemplate;

use super::types::{ComposedView, RenderError, RenderedFragment};

/// Wrap a rendered fragment in the element the client script hydrates.
///
/// An [`RenderedFragment::Empty`] fragment yields a root with no children,
/// which the client mounts from scratch.
pub fn compose(
    name: &str,
    props_json: &str,
    fragment: &RenderedFragment,
) -> Result<ComposedView, RenderError> {
    let template = ViewRootTemplate {
        name,
        props: props_json,
        child: fragment.markup().unwrap_or_default(),
    };
    let html = template
        .render()
        .map_err(|err| RenderError::template("view root", name, err.to_string()))?;

    Ok(ComposedView {
        name: name.to_owned(),
        props_json: props_json.to_owned(),
        html,
    })
}
