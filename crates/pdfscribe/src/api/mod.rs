//! Webhook HTTP server.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Receive a Telegram update (path is configurable)
//! - `GET /health` - Health check endpoint
//!
//! Updates are validated, queued and acknowledged immediately; the bot works
//! through the queue in the background.
//!
//! # Example
//!
//! ```no_run
//! use pdfscribe::api::{ApiSizeLimits, ApiState, create_router};
//! use tokio::sync::mpsc;
//!
//! let (sender, _receiver) = mpsc::channel(256);
//! let state = ApiState::new(sender, Some("my-secret".to_string()));
//! let app = create_router(state, "/webhook", ApiSizeLimits::default());
//! ```

mod error;
mod handlers;
mod server;
mod types;

pub use error::ApiError;
pub use handlers::SECRET_TOKEN_HEADER;
pub use server::{create_router, serve, serve_with_shutdown, shutdown_signal};
pub use types::{ApiSizeLimits, ApiState, ErrorResponse, HealthResponse};
