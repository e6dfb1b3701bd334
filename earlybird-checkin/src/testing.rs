//! Fakes for the collaborators the check-in engine talks to.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use earlybird_core::{ArtifactName, ArtifactStore, Notifier, SiteClient, TransportError};
use earlybird_shared::CheckinEvent;
use tokio::time::Instant;

use crate::scheduler::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub target: String,
    pub fields: Vec<(String, String)>,
}

/// Answers requests from a fixed script, in order, regardless of the target.
pub struct ScriptedSite {
    responses: Mutex<VecDeque<Result<String, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedSite {
    pub fn new(responses: Vec<Result<String, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn answer(&self, request: RecordedRequest) -> Result<String, TransportError> {
        let target = request.target.clone();
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted request to {}", target))
    }
}

#[async_trait]
impl SiteClient for ScriptedSite {
    async fn get(&self, path: &str) -> Result<String, TransportError> {
        self.answer(RecordedRequest {
            method: "GET",
            target: path.to_string(),
            fields: Vec::new(),
        })
    }

    async fn post_form(
        &self,
        target: &str,
        fields: &[(String, String)],
    ) -> Result<String, TransportError> {
        self.answer(RecordedRequest {
            method: "POST",
            target: target.to_string(),
            fields: fields.to_vec(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<CheckinEvent>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.subject()).collect()
    }

    pub fn events(&self) -> Vec<CheckinEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &CheckinEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Keeps artifacts in memory. `failing()` refuses every write.
#[derive(Default)]
pub struct MemoryArtifactStore {
    fail: bool,
    stored: Mutex<Vec<(String, String)>>,
}

impl MemoryArtifactStore {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn stored(&self) -> Vec<(String, String)> {
        self.stored.lock().unwrap().clone()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn persist(&self, name: &ArtifactName, body: &str) -> io::Result<PathBuf> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        let file_name = name.file_name();
        self.stored
            .lock()
            .unwrap()
            .push((file_name.clone(), body.to_string()));
        Ok(PathBuf::from(file_name))
    }
}

/// Wall clock pinned at `start` that moves with tokio's (paused) time.
pub struct PausedClock {
    start: DateTime<Utc>,
    origin: Instant,
}

impl PausedClock {
    pub fn at(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { start, origin: Instant::now() })
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        self.start + chrono::Duration::from_std(self.origin.elapsed()).unwrap()
    }
}
