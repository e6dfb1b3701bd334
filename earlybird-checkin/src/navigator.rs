use std::sync::Arc;

use async_trait::async_trait;
use earlybird_core::{
    ArtifactName, ArtifactStore, CheckinForm, FormLookupError, SiteClient, SiteMarkup,
    TransportError,
};
use earlybird_shared::{BoardingPosition, Flight, Reservation};
use tracing::{debug, info, warn};

/// Security tokens plus the passenger selection the airline expects echoed back.
pub const MIN_ECHOED_FIELDS: usize = 4;

/// Why an attempt did not get through. Every variant is worth another try.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SoftFailure {
    #[error("Check-in form not found: {0}")]
    FormNotFound(#[from] FormLookupError),
    #[error("Check-in rejected by the airline")]
    Rejected,
    #[error("Check-in form carries {found} of at least {min} hidden fields", min = MIN_ECHOED_FIELDS)]
    IncompleteForm { found: usize },
    #[error("Check-in form has no submission target")]
    MissingFinalTarget,
    #[error(transparent)]
    SlowSite(TransportError),
    #[error("Attempt did not finish within {0:?}")]
    TimedOut(std::time::Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Checked in. `None` when the boarding pass no longer shows the position where we
    /// look for it.
    Succeeded { position: Option<BoardingPosition> },
    SoftFailed(SoftFailure),
}

/// Steps of one check-in attempt.
#[derive(Debug)]
enum NavigatorState {
    Idle,
    LookupFetched { target: String },
    IdentitySubmitted { page: String },
    ConfirmationReceived { action: String, hidden_fields: Vec<(String, String)> },
    Succeeded { position: Option<BoardingPosition> },
    SoftFailed(SoftFailure),
}

/// A single check-in attempt for one flight. `Err` is a hard failure.
#[async_trait]
pub trait CheckinAttempt: Send + Sync {
    async fn attempt(
        &self,
        reservation: &Reservation,
        flight: &Flight,
    ) -> Result<AttemptOutcome, TransportError>;
}

/// Walks the airline's check-in forms: entry page, identity submission, passenger
/// confirmation, boarding pass.
pub struct CheckinNavigator {
    client: Arc<dyn SiteClient>,
    markup: Arc<dyn SiteMarkup>,
    artifacts: Arc<dyn ArtifactStore>,
    checkin_path: String,
}

impl CheckinNavigator {
    pub fn new(
        client: Arc<dyn SiteClient>,
        markup: Arc<dyn SiteMarkup>,
        artifacts: Arc<dyn ArtifactStore>,
        checkin_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            markup,
            artifacts,
            checkin_path: checkin_path.into(),
        }
    }

    async fn step(
        &self,
        state: NavigatorState,
        reservation: &Reservation,
        flight: &Flight,
    ) -> Result<NavigatorState, TransportError> {
        let next = match state {
            NavigatorState::Idle => {
                let page = self.client.get(&self.checkin_path).await?;
                match self.markup.extract_checkin_target(&page) {
                    Ok(target) => NavigatorState::LookupFetched { target },
                    Err(e) => NavigatorState::SoftFailed(e.into()),
                }
            }
            NavigatorState::LookupFetched { target } => {
                let page = self
                    .client
                    .post_form(&target, &identity_fields(reservation))
                    .await?;
                NavigatorState::IdentitySubmitted { page }
            }
            NavigatorState::IdentitySubmitted { page } => {
                match self.markup.extract_checkin_form(&page) {
                    CheckinForm::Rejected => NavigatorState::SoftFailed(SoftFailure::Rejected),
                    CheckinForm::Ready { hidden_fields, .. }
                        if hidden_fields.len() < MIN_ECHOED_FIELDS =>
                    {
                        NavigatorState::SoftFailed(SoftFailure::IncompleteForm {
                            found: hidden_fields.len(),
                        })
                    }
                    CheckinForm::Ready { action: None, .. } => {
                        NavigatorState::SoftFailed(SoftFailure::MissingFinalTarget)
                    }
                    CheckinForm::Ready { action: Some(action), hidden_fields } => {
                        NavigatorState::ConfirmationReceived { action, hidden_fields }
                    }
                }
            }
            NavigatorState::ConfirmationReceived { action, hidden_fields } => {
                let body = self.client.post_form(&action, &hidden_fields).await?;
                self.keep_boarding_pass(reservation, flight, &body);
                NavigatorState::Succeeded {
                    position: self.markup.extract_boarding_position(&body),
                }
            }
            done @ (NavigatorState::Succeeded { .. } | NavigatorState::SoftFailed(_)) => done,
        };
        Ok(next)
    }

    fn keep_boarding_pass(&self, reservation: &Reservation, flight: &Flight, body: &str) {
        let name = ArtifactName::new(
            reservation.confirmation.expose(),
            flight.number,
            flight.departs_at.date_naive(),
        );
        // Checked in either way; a lost copy of the page is not worth a retry.
        match self.artifacts.persist(&name, body) {
            Ok(path) => debug!(path = %path.display(), "Boarding pass kept"),
            Err(e) => warn!(error = %e, file = %name.file_name(), "Failed to keep boarding pass"),
        }
    }
}

#[async_trait]
impl CheckinAttempt for CheckinNavigator {
    async fn attempt(
        &self,
        reservation: &Reservation,
        flight: &Flight,
    ) -> Result<AttemptOutcome, TransportError> {
        let mut state = NavigatorState::Idle;
        loop {
            state = self.step(state, reservation, flight).await?;
            match state {
                NavigatorState::Succeeded { position } => {
                    info!(
                        confirmation = %reservation.confirmation,
                        flight = flight.number,
                        position = %position.map(|p| p.to_string()).unwrap_or_else(|| "not found".into()),
                        "Checked in"
                    );
                    return Ok(AttemptOutcome::Succeeded { position });
                }
                NavigatorState::SoftFailed(reason) => {
                    warn!(
                        confirmation = %reservation.confirmation,
                        flight = flight.number,
                        reason = %reason,
                        "Check in attempt failed"
                    );
                    return Ok(AttemptOutcome::SoftFailed(reason));
                }
                ref next => debug!(flight = flight.number, state = state_name(next), "Check in step"),
            }
        }
    }
}

fn identity_fields(reservation: &Reservation) -> Vec<(String, String)> {
    vec![
        (
            "recordLocator".to_string(),
            reservation.confirmation.expose().to_string(),
        ),
        ("firstName".to_string(), reservation.first_name.clone()),
        ("lastName".to_string(), reservation.last_name.clone()),
    ]
}

fn state_name(state: &NavigatorState) -> &'static str {
    match state {
        NavigatorState::Idle => "idle",
        NavigatorState::LookupFetched { .. } => "lookup_fetched",
        NavigatorState::IdentitySubmitted { .. } => "identity_submitted",
        NavigatorState::ConfirmationReceived { .. } => "confirmation_received",
        NavigatorState::Succeeded { .. } => "succeeded",
        NavigatorState::SoftFailed(_) => "soft_failed",
    }
}
