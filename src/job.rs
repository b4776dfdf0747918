use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

use crate::event::PushNotification;
use crate::sync::SyncOutcome;

/// Number of deployment records kept in memory
pub const DEFAULT_MAX_RECORDS: usize = 24;

/// One verified webhook delivery and what it led to
#[derive(Debug, Clone, Serialize)]
pub struct DeployRecord {
    pub id: String,
    pub event: String,
    pub git_ref: Option<String>,
    pub pusher: Option<String>,
    pub commit_count: usize,
    pub head_commit: Option<String>,
    pub received_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<SyncOutcome>,
}

impl DeployRecord {
    /// Record for a delivery that did not trigger a synchronization
    pub fn skipped(event: impl Into<String>, reason: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            event: event.into(),
            git_ref: None,
            pusher: None,
            commit_count: 0,
            head_commit: None,
            received_at: now,
            completed_at: Some(now),
            outcome: Some(SyncOutcome::Skipped(reason)),
        }
    }

    /// Record for a push that is about to be synchronized
    pub fn from_push(push: &PushNotification) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            event: crate::event::PUSH_EVENT.to_string(),
            git_ref: Some(push.git_ref.clone()),
            pusher: Some(push.pusher.clone()),
            commit_count: push.commits.len(),
            head_commit: push.head_commit().map(|c| c.id.clone()),
            received_at: Utc::now(),
            completed_at: None,
            outcome: None,
        }
    }

    pub fn complete(&mut self, outcome: SyncOutcome) {
        self.completed_at = Some(Utc::now());
        self.outcome = Some(outcome);
    }
}

/// Bounded in-memory history, newest first
#[derive(Debug)]
pub struct DeployHistory {
    records: VecDeque<DeployRecord>,
    max_records: usize,
}

impl DeployHistory {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_records),
            max_records,
        }
    }

    pub fn push(&mut self, record: DeployRecord) {
        self.records.push_front(record);
        self.records.truncate(self.max_records);
    }

    pub fn recent(&self, limit: usize) -> Vec<DeployRecord> {
        self.records.iter().take(limit).cloned().collect()
    }

    /// Most recent record that attempted a synchronization
    pub fn last_deploy(&self) -> Option<&DeployRecord> {
        self.records
            .iter()
            .find(|r| !matches!(r.outcome, Some(SyncOutcome::Skipped(_))))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for DeployHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CommitSummary;

    fn push() -> PushNotification {
        PushNotification {
            git_ref: "refs/heads/deploy".to_string(),
            commits: vec![
                CommitSummary {
                    id: "aaa1111".to_string(),
                    message: "first".to_string(),
                },
                CommitSummary {
                    id: "bbb2222".to_string(),
                    message: "second".to_string(),
                },
            ],
            pusher: "octocat".to_string(),
        }
    }

    #[test]
    fn record_from_push_tracks_head_commit() {
        let mut record = DeployRecord::from_push(&push());
        assert_eq!(record.commit_count, 2);
        assert_eq!(record.head_commit.as_deref(), Some("bbb2222"));
        assert!(record.outcome.is_none());

        record.complete(SyncOutcome::Reset);
        assert_eq!(record.outcome, Some(SyncOutcome::Reset));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn history_is_bounded_and_newest_first() {
        let mut history = DeployHistory::new(2);
        for event in ["ping", "issues", "pull_request"] {
            history.push(DeployRecord::skipped(event, format!("Ignored event: {}", event)));
        }

        assert_eq!(history.len(), 2);
        let recent = history.recent(10);
        assert_eq!(recent[0].event, "pull_request");
        assert_eq!(recent[1].event, "issues");
        assert!(history.last_deploy().is_none());
    }

    #[test]
    fn last_deploy_skips_ignored_deliveries() {
        let mut history = DeployHistory::default();
        let mut record = DeployRecord::from_push(&push());
        record.complete(SyncOutcome::Cloned);
        history.push(record);
        history.push(DeployRecord::skipped("ping", "Ignored event: ping".to_string()));

        let last = history.last_deploy().unwrap();
        assert_eq!(last.outcome, Some(SyncOutcome::Cloned));
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let record = DeployRecord::skipped("ping", "Ignored event: ping".to_string());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"]["outcome"], "skipped");
        assert_eq!(json["outcome"]["reason"], "Ignored event: ping");
    }
}
