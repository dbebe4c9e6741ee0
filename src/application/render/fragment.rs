//! Validation of renderer output.
//!
//! The hydration root may hold exactly one top-level node. Anything else
//! would desynchronise the client-side mount, so it is rejected and the
//! caller falls back to an empty root.

use scraper::{ElementRef, Html, Node};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentError {
    #[error("renderer returned no markup")]
    Empty,
    #[error("renderer returned {count} top-level nodes, expected one")]
    MultipleNodes { count: usize },
    #[error("renderer returned an unsupported top-level node")]
    Unsupported,
}

/// Parse `markup` and return its single top-level node re-serialised.
///
/// Surrounding whitespace is ignored; whitespace between two nodes counts
/// as a node of its own.
pub fn single_node(markup: &str) -> Result<String, FragmentError> {
    let trimmed = markup.trim();
    if trimmed.is_empty() {
        return Err(FragmentError::Empty);
    }

    let fragment = Html::parse_fragment(trimmed);
    let root = fragment.root_element();
    let mut nodes = root.children();
    let first = nodes.next().ok_or(FragmentError::Empty)?;
    let rest = nodes.count();
    if rest > 0 {
        return Err(FragmentError::MultipleNodes { count: rest + 1 });
    }

    if let Some(element) = ElementRef::wrap(first) {
        return Ok(element.html());
    }

    match first.value() {
        Node::Text(text) => Ok(escape_text(&text.text)),
        Node::Comment(comment) => Ok(format!("<!--{}-->", &*comment.comment)),
        _ => Err(FragmentError::Unsupported),
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
    out
}
