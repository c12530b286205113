//! HTTP surface for workers.
//!
//! ## Endpoints
//!
//! - `GET /` - Login page
//! - `POST /login-form` - Check the worker id and redirect to the task page
//! - `GET /task?uid=` - Render the next uncompleted task
//! - `POST /submit` - Record a completed task
//! - `POST /delete-last` - Remove the most recent output row
//! - `GET /api/stats` - Progress as JSON
//! - `GET /api/health` - Health check
//!
//! Anything else is served from the static directory.

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
