//! Webhook handler for GitHub push events

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::SharedState;
use crate::event::{Decision, classify};
use crate::job::DeployRecord;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Handles the GitHub webhook POST request.
///
/// Synchronization runs before responding. Its failures are logged and never
/// reported to the sender.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !state.verifier.verify(&body, signature) {
        error!("Signature verification failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid signature"})),
        );
    }

    let event = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let push = match classify(event, &body, &state.branch_ref) {
        Decision::Proceed(push) => push,
        ignored => {
            let message = ignored.ignore_message().unwrap_or_default();
            info!("{}", message);
            state
                .history
                .lock()
                .await
                .push(DeployRecord::skipped(event, message.clone()));
            return (StatusCode::OK, Json(json!({"message": message})));
        }
    };

    info!("Deploy branch push detected!");
    info!("Pusher: {}", push.pusher);
    for commit in &push.commits {
        info!(" - Commit: {} {}", commit.short_id(), commit.message);
    }

    let mut record = DeployRecord::from_push(&push);
    let outcome = state.synchronizer.sync().await;
    if outcome.is_success() {
        info!("Deployment {} finished: {}", record.id, outcome);
    } else {
        warn!("Deployment {} finished: {}", record.id, outcome);
    }
    record.complete(outcome);
    state.history.lock().await.push(record);

    (
        StatusCode::OK,
        Json(json!({"message": "Webhook processed successfully"})),
    )
}
