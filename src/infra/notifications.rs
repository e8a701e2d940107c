//! Notification log
//!
//! Sequenced record of ledger notifications with a broadcast channel for live
//! subscribers. Only the most recent `retention` records are kept; sequence
//! numbers keep counting past evicted records.

use std::collections::VecDeque;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::domain::{Notification, NotificationRecord};

use super::NotificationSink;

/// Default broadcast buffer per subscriber
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

/// Default number of records kept for `since` queries
pub const DEFAULT_RETENTION: usize = 10_000;

#[derive(Debug, Default)]
struct Retained {
    records: VecDeque<NotificationRecord>,
    last_sequence: u64,
}

pub struct NotificationLog {
    retained: RwLock<Retained>,
    retention: usize,
    sender: broadcast::Sender<NotificationRecord>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SUBSCRIBER_CAPACITY, DEFAULT_RETENTION)
    }

    pub fn with_limits(subscriber_capacity: usize, retention: usize) -> Self {
        let (sender, _) = broadcast::channel(subscriber_capacity.max(1));
        Self {
            retained: RwLock::new(Retained::default()),
            retention: retention.max(1),
            sender,
        }
    }

    /// Read `NOTIFICATION_RETENTION`, falling back to [`DEFAULT_RETENTION`]
    pub fn from_env() -> Self {
        let retention = std::env::var("NOTIFICATION_RETENTION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETENTION);
        Self::with_limits(DEFAULT_SUBSCRIBER_CAPACITY, retention)
    }

    /// Receive every notification published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationRecord> {
        self.sender.subscribe()
    }

    /// Retained records, oldest first
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.retained
            .read()
            .map(|r| r.records.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Up to `limit` retained records with a sequence number greater than `after`
    pub fn since(&self, after: u64, limit: usize) -> Vec<NotificationRecord> {
        self.retained
            .read()
            .map(|r| {
                let start = r.records.partition_point(|record| record.sequence <= after);
                r.records.iter().skip(start).take(limit).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Sequence number of the newest record, 0 before the first
    pub fn last_sequence(&self) -> u64 {
        self.retained.read().map(|r| r.last_sequence).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.retained.read().map(|r| r.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for NotificationLog {
    fn publish(&self, notification: Notification) {
        let mut retained = match self.retained.write() {
            Ok(retained) => retained,
            Err(poisoned) => {
                warn!("Notification log lock poisoned; recovering");
                poisoned.into_inner()
            }
        };

        retained.last_sequence += 1;
        let record = NotificationRecord {
            sequence: retained.last_sequence,
            notification,
        };
        info!(
            sequence = record.sequence,
            notification = record.notification.name(),
            "Notification emitted"
        );

        if retained.records.len() == self.retention {
            retained.records.pop_front();
        }
        retained.records.push_back(record.clone());
        // No live subscribers is not an error
        let _ = self.sender.send(record);
    }
}

impl std::fmt::Debug for NotificationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationLog")
            .field("records", &self.len())
            .field("retention", &self.retention)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisId, ReportId};

    #[test]
    fn test_sequences_start_at_one() {
        let log = NotificationLog::new();
        log.publish(Notification::AnalysisRequested {
            report_id: ReportId::new(1),
        });
        log.publish(Notification::RiskIdentified {
            analysis_id: AnalysisId::new(1),
        });

        let sequences: Vec<u64> = log.records().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(log.since(1, 10).len(), 1);
        assert!(log.since(0, 0).is_empty());
    }

    #[test]
    fn test_retention_evicts_oldest_records() {
        let log = NotificationLog::with_limits(8, 3);
        for id in 1..=5 {
            log.publish(Notification::RiskIdentified {
                analysis_id: AnalysisId::new(id),
            });
        }

        let sequences: Vec<u64> = log.records().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);
        assert_eq!(log.last_sequence(), 5);

        let page: Vec<u64> = log.since(0, 2).iter().map(|r| r.sequence).collect();
        assert_eq!(page, vec![3, 4]);
        assert_eq!(log.since(4, 10).len(), 1);
        assert!(log.since(5, 10).is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let log = NotificationLog::new();
        let mut rx = log.subscribe();

        log.publish(Notification::RiskIdentified {
            analysis_id: AnalysisId::new(1),
        });
        log.publish(Notification::AnalysisRevealed {
            analysis_id: AnalysisId::new(1),
        });

        assert_eq!(rx.recv().await.unwrap().notification.name(), "RiskIdentified");
        assert_eq!(rx.recv().await.unwrap().notification.name(), "AnalysisRevealed");
    }
}
