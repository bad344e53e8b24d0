//! Aggregated application status.

use axum::{
    extract::{Path, State},
    Json,
};
use tokio::time::Instant;

use crate::http::server::AppState;
use crate::status::{aggregate, AggregatedStatus};

/// `GET /status/{arn}`
///
/// Always answers 200; sources that missed the deadline are marked in the body.
pub async fn get_status(
    State(state): State<AppState>,
    Path(arn): Path<String>,
) -> Json<AggregatedStatus> {
    let deadline = Instant::now() + state.status_deadline;
    Json(aggregate(&arn, &state.probes, deadline).await)
}
