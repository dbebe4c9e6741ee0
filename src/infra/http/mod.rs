mod middleware;
mod public;
pub mod response;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::{HttpState, build_router};
