use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::http::StatusCode;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::alias::CLOF;
use crate::delivery::ConvergenceMonitor;
use crate::metrics::render_metrics;
use crate::metrics::QUEUE_DEPTH_METRIC;
use crate::storage::ChangeLog;
use crate::targets::TargetHealthMonitor;
use crate::targets::TargetRegistry;
use crate::Result;
use crate::TypeConfig;

/// Everything the admin handlers read or act on.
pub struct AdminContext<T>
where T: TypeConfig
{
    pub change_log: Arc<CLOF<T>>,
    pub convergence: Arc<ConvergenceMonitor>,
    pub health: Arc<TargetHealthMonitor>,
    pub targets: Arc<TargetRegistry<T>>,
    pub partitions: u32,
}

/// Operator-facing snapshot of the pipeline, served as JSON on `/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub queue_depth: u64,
    pub last_sequence: u64,
    pub min_delivered_sequence: u64,
    pub dead_letter_count: u64,
    pub capture_bookmark: Option<BookmarkStatus>,
    pub targets: Vec<TargetStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkStatus {
    pub updated_frontier: Option<String>,
    pub deleted_frontier: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetStatus {
    pub name: String,
    pub degraded: bool,
    pub probe_failures: u32,
    pub cursors: Vec<CursorStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorStatus {
    pub partition: u32,
    pub sequence: u64,
}

/// Serves `/metrics`, `/status` and `/reset` until the shutdown signal
/// fires.
pub async fn start_admin_server<T>(
    ctx: Arc<AdminContext<T>>,
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) where
    T: TypeConfig,
{
    let routes = admin_routes(ctx);

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    info!(%addr, "admin server started");
    server.await;
}

pub(crate) fn admin_routes<T>(
    ctx: Arc<AdminContext<T>>
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone
where T: TypeConfig {
    let metrics_route = warp::path!("metrics")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(metrics_handler);

    let status_route = warp::path!("status")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(status_handler);

    let reset_route = warp::path!("reset")
        .and(warp::post())
        .and(with_context(ctx))
        .and_then(reset_handler);

    metrics_route.or(status_route).or(reset_route)
}

fn with_context<T>(
    ctx: Arc<AdminContext<T>>
) -> impl Filter<Extract = (Arc<AdminContext<T>>,), Error = Infallible> + Clone
where T: TypeConfig {
    warp::any().map(move || ctx.clone())
}

async fn metrics_handler<T>(ctx: Arc<AdminContext<T>>) -> std::result::Result<impl Reply, Rejection>
where T: TypeConfig {
    // Refresh the depth gauge at scrape time
    QUEUE_DEPTH_METRIC.set(ctx.change_log.len() as i64);
    Ok(render_metrics())
}

async fn status_handler<T>(ctx: Arc<AdminContext<T>>) -> std::result::Result<impl Reply, Rejection>
where T: TypeConfig {
    match build_status(&ctx) {
        Ok(report) => Ok(warp::reply::with_status(
            warp::reply::json(&report),
            StatusCode::OK,
        )),
        Err(e) => {
            error!(?e, "status report failed");
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({"error": e.to_string()})),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn reset_handler<T>(ctx: Arc<AdminContext<T>>) -> std::result::Result<impl Reply, Rejection>
where T: TypeConfig {
    match ctx.change_log.reset() {
        Ok(()) => {
            ctx.convergence.reset();
            info!("change queue reset via admin endpoint");
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "status": "reset",
                    "nextSequence": ctx.change_log.last_sequence() + 1,
                })),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            error!(?e, "reset via admin endpoint failed");
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({"error": e.to_string()})),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

pub(crate) fn build_status<T>(ctx: &AdminContext<T>) -> Result<StatusReport>
where T: TypeConfig {
    let capture_bookmark = ctx.change_log.bookmark()?.map(|b| BookmarkStatus {
        updated_frontier: b.updated_frontier,
        deleted_frontier: b.deleted_frontier,
    });

    let mut targets = Vec::new();
    for (name, _) in ctx.targets.iter() {
        let mut cursors = Vec::new();
        for partition in 0..ctx.partitions {
            cursors.push(CursorStatus {
                partition,
                sequence: ctx.change_log.delivery_cursor(name, partition)?,
            });
        }
        targets.push(TargetStatus {
            name: name.clone(),
            degraded: ctx.health.is_degraded(name),
            probe_failures: ctx.health.failure_count(name),
            cursors,
        });
    }

    Ok(StatusReport {
        queue_depth: ctx.change_log.len(),
        last_sequence: ctx.change_log.last_sequence(),
        min_delivered_sequence: ctx.change_log.min_delivery_cursor()?,
        dead_letter_count: ctx.change_log.dead_letter_count(),
        capture_bookmark,
        targets,
    })
}
