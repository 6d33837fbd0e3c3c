//! Cartography: walking a site's link graph.

pub mod crawler;
pub mod frontier;
pub mod rate_limiter;
pub mod robots;
pub mod url;

pub use crawler::{Crawler, StopHandle, StopSignal};
pub use frontier::Frontier;
pub use self::url::{is_internal, normalize_url};
