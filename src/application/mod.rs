//! Application services.

pub mod error;
pub mod newsletter;
pub mod render;
pub mod view;
