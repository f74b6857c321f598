//! Dashboard-hosting adapters.

pub mod http;
pub mod memory;

pub use http::HttpDashboardHost;
pub use memory::InMemoryDashboardHost;
