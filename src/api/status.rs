use axum::{Json, extract::State as AxumState};
use serde_json::{Value, json};

use crate::SharedState;

const RECENT_DEPLOYS: usize = 10;

pub async fn root() -> &'static str {
    "git_deploy_hook is running"
}

/// Returns server information and the most recent webhook deliveries
pub async fn status(AxumState(state): AxumState<SharedState>) -> Json<Value> {
    let history = state.history.lock().await;

    Json(json!({
        "server": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
        },
        "target": {
            "branch_ref": state.branch_ref,
            "repo_path": state.synchronizer.target().repo_path,
        },
        "deploys": {
            "last": history.last_deploy(),
            "recent": history.recent(RECENT_DEPLOYS),
            "total": history.len(),
        }
    }))
}
