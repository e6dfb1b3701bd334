use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use earlybird_shared::CheckinEvent;

/// Hands check-in events to the passenger. Delivery is best effort; nothing in the
/// check-in path waits on or reacts to its outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &CheckinEvent);
}

/// Keeps the raw boarding pass page of every successful check-in.
pub trait ArtifactStore: Send + Sync {
    fn persist(&self, name: &ArtifactName, body: &str) -> io::Result<PathBuf>;
}

/// Artifact identity: one file per reservation, flight and departure date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName {
    confirmation: String,
    flight_number: u32,
    departs_on: NaiveDate,
}

impl ArtifactName {
    pub fn new(confirmation: &str, flight_number: u32, departs_on: NaiveDate) -> Self {
        let confirmation = confirmation
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Self {
            confirmation,
            flight_number,
            departs_on,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "boardingpass-{}-{}-{}.html",
            self.confirmation,
            self.flight_number,
            self.departs_on.format("%Y%m%d")
        )
    }
}
