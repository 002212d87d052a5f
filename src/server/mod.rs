//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /preview/tile/{id}/{z}/{x}/{y}.png                   │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │          routes             │  │
//! │  │ (requests, error JSON)   │  │ (router, CORS, tracing)     │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    bounds_handler, health_handler, register_handler, tile_handler, AppState, BoundsResponse,
    ErrorResponse, HealthResponse, RegisterRequest, RegisterResponse, TilePathParams,
    TileQueryParams,
};
pub use routes::{create_router, RouterConfig};
