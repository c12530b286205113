//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, Json, Redirect},
    routing::{get, post},
    Router,
};
use tokio::sync::Notify;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::record::Record;
use crate::render;
use crate::store::{CsvStore, StoreError, TabularStore};
use crate::turk::{LocalTurk, TurkError};
use crate::util::{internal_error, task_url};

use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TabularStore>,
    pub turk: LocalTurk,
    /// Fired once every task is done and the server should stop.
    pub shutdown: Notify,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store: Arc<dyn TabularStore> = Arc::new(CsvStore::new());
        let turk = LocalTurk::new(
            Arc::clone(&store),
            config.tasks.clone(),
            config.outputs.clone(),
        );
        Self::with_turk(config, store, turk)
    }

    pub fn with_turk(config: Config, store: Arc<dyn TabularStore>, turk: LocalTurk) -> Self {
        Self {
            config,
            store,
            turk,
            shutdown: Notify::new(),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/", get(login))
        .route("/login-form", post(login_form))
        .route("/task", get(task))
        .route("/submit", post(submit))
        .route("/delete-last", post(delete_last))
        .route("/api/stats", get(get_stats))
        .route("/api/health", get(health))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config.clone()));
    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Running local turk on {}", config.url());

    let shutdown_state = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown_state).await;
        })
        .await?;

    Ok(())
}

/// Wait for SIGTERM/SIGINT, or for the last task to be completed.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutdown signal received"),
        _ = terminate => tracing::info!("Shutdown signal received"),
        _ = state.shutdown.notified() => tracing::info!("All tasks done, shutting down"),
    }
}

/// Login page.
async fn login(Query(query): Query<LoginQuery>) -> Html<String> {
    let message = match query.msg.as_deref() {
        Some("invalidId") => Some("Invalid id, try again!"),
        _ => None,
    };
    Html(render::login_page(message))
}

/// Accept a worker id and send the worker to their first task.
async fn login_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, (StatusCode, String)> {
    let uid = form.uid.trim();
    if uid.is_empty() || !is_known_worker(&state, uid).await.map_err(internal_error)? {
        tracing::info!("Rejected login for {:?}", uid);
        return Ok(Redirect::to("/?msg=invalidId"));
    }
    Ok(Redirect::to(&task_url(uid)))
}

/// Without a user list every id is accepted; ids are labels, not credentials.
async fn is_known_worker(state: &AppState, uid: &str) -> Result<bool, StoreError> {
    let Some(users) = &state.config.users else {
        return Ok(true);
    };
    let rows = state.store.read_all(users).await?;
    Ok(rows.iter().any(|row| {
        row.get("uid")
            .is_some_and(|known| known.trim().eq_ignore_ascii_case(uid))
    }))
}

/// Render the next uncompleted task for a worker.
async fn task(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskQuery>,
) -> Result<Html<String>, (StatusCode, String)> {
    let uid = query.uid.unwrap_or_default();
    let uid = uid.trim();
    if uid.is_empty() {
        return Ok(Html(render::missing_uid_page()));
    }

    let stats = state.turk.next_task().await.map_err(internal_error)?;
    let Some(next) = &stats.task else {
        tracing::info!("All {} tasks are done", stats.num_total);
        if state.config.exit_when_done {
            state.shutdown.notify_one();
        }
        return Ok(Html(render::done_page()));
    };
    tracing::info!("Serving task to {}: {:?}", uid, next);

    let template = tokio::fs::read_to_string(&state.config.template)
        .await
        .map_err(internal_error)?;
    let flash = state.turk.take_flash();
    Ok(Html(render::task_page(
        &template,
        &stats,
        uid,
        flash.as_deref(),
    )))
}

/// Record a submitted form and move on to the next task.
async fn submit(
    State(state): State<Arc<AppState>>,
    Form(record): Form<Record>,
) -> Result<Redirect, (StatusCode, String)> {
    match state.turk.submit(&record).await {
        Ok(_) => {}
        Err(e @ TurkError::Store(StoreError::EmptyRecord(_))) => {
            return Err((StatusCode::BAD_REQUEST, e.to_string()));
        }
        Err(e) => return Err(internal_error(e)),
    }
    let uid = record.get("uid").unwrap_or_default();
    Ok(Redirect::to(&task_url(uid)))
}

/// Undo the most recent submission.
async fn delete_last(
    State(state): State<Arc<AppState>>,
) -> Result<Redirect, (StatusCode, String)> {
    match state.turk.undo_last().await {
        Ok(_) => Ok(Redirect::to("/")),
        Err(e @ TurkError::NothingToUndo(_)) => Err((StatusCode::CONFLICT, e.to_string())),
        Err(e) => Err(internal_error(e)),
    }
}

/// Progress counts without rendering a task.
async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let stats = state.turk.next_task().await.map_err(internal_error)?;
    Ok(Json(StatsResponse {
        num_completed: stats.num_completed,
        num_total: stats.num_total,
        done: stats.is_done(),
    }))
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
