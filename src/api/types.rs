//! API request and response types.

use serde::{Deserialize, Serialize};

/// Query string of the login page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginQuery {
    /// `invalidId` after a rejected login.
    pub msg: Option<String>,
}

/// Login form body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub uid: String,
}

/// Query string of the task page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    pub uid: Option<String>,
}

/// Progress response.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Rows in the output table
    pub num_completed: usize,

    /// Rows in the task table
    pub num_total: usize,

    /// Whether every task has a matching output row
    pub done: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
