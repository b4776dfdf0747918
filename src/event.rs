//! GitHub push notifications and the decision whether they trigger a deployment

use serde_json::Value;

pub const PUSH_EVENT: &str = "push";
const UNKNOWN_PUSHER: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitSummary {
    pub id: String,
    pub message: String,
}

impl CommitSummary {
    /// Abbreviated commit id, as `git log --oneline` prints it
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map(|(idx, _)| idx)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }

    /// Commit entries that are not objects are skipped; missing or non-string
    /// fields become empty strings.
    fn from_value(value: &Value) -> Option<Self> {
        let commit = value.as_object()?;
        let field = |name: &str| {
            commit
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            id: field("id"),
            message: field("message"),
        })
    }
}

/// A push to the deployment branch
#[derive(Debug, Clone, PartialEq)]
pub struct PushNotification {
    pub git_ref: String,
    pub commits: Vec<CommitSummary>,
    pub pusher: String,
}

impl PushNotification {
    pub fn head_commit(&self) -> Option<&CommitSummary> {
        self.commits.last()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Proceed(PushNotification),
    IgnoreEvent(String),
    IgnoreBranch(String),
}

impl Decision {
    /// Response message for the webhook sender when no deployment is attempted
    pub fn ignore_message(&self) -> Option<String> {
        match self {
            Decision::Proceed(_) => None,
            Decision::IgnoreEvent(event) => Some(format!("Ignored event: {}", event)),
            Decision::IgnoreBranch(git_ref) => Some(format!("Ignored branch: {}", git_ref)),
        }
    }
}

/// Decides whether a verified webhook should trigger a synchronization.
///
/// Only `push` events whose `ref` equals `branch_ref` proceed. The body is only
/// parsed for push events; an unparseable body is treated as a push without a ref.
/// Each field is read on its own, so a malformed `commits` or `pusher` never
/// hides a matching `ref`.
pub fn classify(event_type: &str, body: &[u8], branch_ref: &str) -> Decision {
    if event_type != PUSH_EVENT {
        return Decision::IgnoreEvent(event_type.to_string());
    }

    let payload: Value = serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::warn!("Could not parse push payload: {}", e);
        Value::Null
    });

    let git_ref = payload
        .get("ref")
        .and_then(|r| r.as_str())
        .unwrap_or_default()
        .to_string();
    if git_ref != branch_ref {
        return Decision::IgnoreBranch(git_ref);
    }

    let commits: Vec<CommitSummary> = payload
        .get("commits")
        .and_then(|c| c.as_array())
        .map(|commits| commits.iter().filter_map(CommitSummary::from_value).collect())
        .unwrap_or_default();
    let pusher = payload
        .get("pusher")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or(UNKNOWN_PUSHER)
        .to_string();

    Decision::Proceed(PushNotification {
        git_ref,
        commits,
        pusher,
    })
}
