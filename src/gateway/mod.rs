//! HTTP surface for the planner.

pub mod rate_limit;
pub mod server;
pub mod types;

pub use self::rate_limit::{RATE_LIMIT_WINDOW, RateLimiter};
pub use self::server::{GatewayState, NO_CACHE_HEADER, build_router, start_server, unwrap_body};
pub use self::types::{EndpointMetadata, ErrorResponse, NL_PLAN_PATH};
