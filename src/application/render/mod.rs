//! View rendering pipeline.
//!
//! Each stage takes a value and returns a new one: the renderer client
//! yields a fragment, [`compose`] wraps it in the hydration root, and the
//! [`PageAssembler`] embeds that root into the page shell. Caching happens
//! one level up, in the view service.

mod assemble;
mod client;
mod compose;
mod fragment;
mod types;

pub use assemble::{PageAssembler, format_title};
pub use client::{ClientOnlyRenderer, RendererClient};
pub use compose::compose;
pub use fragment::{FragmentError, single_node};
pub use types::{ComposedView, PageShellContext, RenderError, RenderedFragment};
