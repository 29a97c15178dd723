//! In-memory [`OmsGateway`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::types::PendingPage;
use super::{
    Credentials, LocationId, OmsError, OmsGateway, OutageRecord, PageWindow, PendingFilter,
    Session, Submission,
};

/// Serves a fixed list of outages and records every call it receives.
#[derive(Default)]
pub struct MockGateway {
    pub records: Vec<OutageRecord>,
    /// Reported `total_records`; defaults to `records.len()`.
    pub total_override: Option<usize>,
    pub candidates: HashMap<String, Vec<LocationId>>,
    pub failing_lookups: HashSet<String>,
    pub failing_submits: HashSet<String>,
    pub reject_login: bool,
    pub fail_pending: bool,
    pub page_requests: Mutex<Vec<PageWindow>>,
    pub submissions: Mutex<Vec<Submission>>,
}

impl MockGateway {
    pub fn with_records(records: Vec<OutageRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn candidates(mut self, outage_id: &str, ids: &[LocationId]) -> Self {
        self.candidates.insert(outage_id.to_string(), ids.to_vec());
        self
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.page_requests
            .lock()
            .unwrap()
            .iter()
            .map(|w| w.offset)
            .collect()
    }

    pub fn submitted(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

fn mock_error(what: &str) -> OmsError {
    OmsError::ApiError {
        status: 500,
        message: format!("mock {what} failure"),
    }
}

impl OmsGateway for MockGateway {
    async fn login(&self, credentials: &Credentials) -> Result<Session, OmsError> {
        if self.reject_login {
            return Err(OmsError::Rejected("mock login refused".into()));
        }
        Ok(Session::new("mock-token", credentials.emp_no.clone()))
    }

    async fn fetch_pending_page(
        &self,
        _session: &Session,
        _filter: &PendingFilter,
        window: PageWindow,
    ) -> Result<PendingPage, OmsError> {
        self.page_requests.lock().unwrap().push(window);
        if self.fail_pending {
            return Err(mock_error("pending"));
        }
        let start = window.offset.min(self.records.len());
        let end = (window.offset + window.limit).min(self.records.len());
        Ok(PendingPage {
            records: self.records[start..end].to_vec(),
            total_records: self.total_override.unwrap_or(self.records.len()),
        })
    }

    async fn fetch_location_candidates(
        &self,
        _session: &Session,
        outage_id: &str,
        _feeder_id: Option<i64>,
        _pole_type: Option<&str>,
    ) -> Result<Vec<LocationId>, OmsError> {
        if self.failing_lookups.contains(outage_id) {
            return Err(mock_error("lookup"));
        }
        Ok(self.candidates.get(outage_id).cloned().unwrap_or_default())
    }

    async fn submit_classification(
        &self,
        _session: &Session,
        submission: &Submission,
    ) -> Result<(), OmsError> {
        if self.failing_submits.contains(&submission.outage_id) {
            return Err(mock_error("submit"));
        }
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(())
    }
}

/// Outage with only an id and a pre-formatted duration.
pub fn outage(id: &str, duration: &str) -> OutageRecord {
    OutageRecord {
        id: id.to_string(),
        feeder_id: Some(1),
        duration: duration.to_string(),
        ..OutageRecord::default()
    }
}
