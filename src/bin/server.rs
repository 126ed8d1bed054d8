use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use panel_cutting::SearchError;
use panel_cutting::job::{Job, Report};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Applied when a request does not set its own time limit.
const DEFAULT_TIME_LIMIT_MS: u64 = 10_000;

fn status_for(err: &SearchError) -> StatusCode {
    match err {
        SearchError::Panel(_) => StatusCode::BAD_REQUEST,
        SearchError::NoSolution { .. } | SearchError::BudgetExceeded { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

async fn optimize(Json(mut job): Json<Job>) -> Result<Json<Report>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&job).unwrap_or_default(),
        "POST /optimize"
    );

    if job.wants.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no wanted panels".to_string()));
    }
    job.budget.time_limit_ms.get_or_insert(DEFAULT_TIME_LIMIT_MS);

    let solver = job.solver().map_err(|e| (status_for(&e), e.to_string()))?;

    let solution = tokio::task::spawn_blocking(move || solver.solve())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::info!(error = %e, "search failed");
            (status_for(&e), e.to_string())
        })?;

    Ok(Json(Report::from(&solution)))
}

#[tokio::main]
async fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
