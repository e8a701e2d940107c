//! Pending-request table
//!
//! Maps an oracle request id to the purpose and target it was dispatched
//! for. An entry exists exactly while its decrypt is dispatched and not yet
//! resolved; `take` is the single consumption point.

use std::collections::HashMap;

use crate::domain::{PendingRequest, RequestId};

use super::{LedgerError, Result};

#[derive(Debug, Default)]
pub struct PendingRequestTable {
    entries: HashMap<RequestId, PendingRequest>,
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatched request. Oracle request ids must never repeat.
    pub fn insert(&mut self, request: PendingRequest) -> Result<()> {
        if self.entries.contains_key(&request.request_id) {
            return Err(LedgerError::Internal(format!(
                "oracle reissued request id {}",
                request.request_id
            )));
        }
        self.entries.insert(request.request_id, request);
        Ok(())
    }

    pub fn get(&self, request_id: &RequestId) -> Option<&PendingRequest> {
        self.entries.get(request_id)
    }

    /// Remove and return an entry
    pub fn take(&mut self, request_id: &RequestId) -> Option<PendingRequest> {
        self.entries.remove(request_id)
    }

    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.entries.contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by dispatch time
    pub fn list(&self) -> Vec<PendingRequest> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by_key(|p| p.dispatched_at);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecryptTarget, LocationCode};

    fn area_request() -> PendingRequest {
        PendingRequest::new(
            RequestId::new(),
            DecryptTarget::AreaStatsReveal {
                location: LocationCode::new(3),
            },
        )
    }

    #[test]
    fn test_take_consumes_once() {
        let mut table = PendingRequestTable::new();
        let request = area_request();
        let id = request.request_id;
        table.insert(request).unwrap();

        assert!(table.contains(&id));
        assert!(table.take(&id).is_some());
        assert!(table.take(&id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = PendingRequestTable::new();
        let request = area_request();
        table.insert(request.clone()).unwrap();

        assert!(matches!(table.insert(request), Err(LedgerError::Internal(_))));
        assert_eq!(table.len(), 1);
    }
}
