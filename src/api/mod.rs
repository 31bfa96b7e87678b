//! API Module
//!
//! Local diagnostics HTTP surface over the cache manager.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Statistics of both namespaces
//! - `GET /images/preview` - Resolve a preview URL through the image cache
//! - `DELETE /cache` - Clear both namespaces
//! - `DELETE /cache/data` - Clear data entries, optionally by regex
//! - `DELETE /cache/images` - Clear preview URLs, optionally by file id
//! - `POST /cache/sweep` - Rerun the startup sweep and size checks

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
