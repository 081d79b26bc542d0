//! Research submission flow: validate, start a session, poll it.

use std::sync::Arc;

use shared::{domain::SessionId, protocol::FeatureRequest};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    forms::FeatureForm,
    poller::{PollerConfig, PollerState, StatusPoller},
    presentation::{view_state, StatusView},
    ClientError, ResearchBackend,
};

pub struct ResearchDashboard {
    backend: Arc<dyn ResearchBackend>,
    poller: StatusPoller,
    last_request: Option<FeatureRequest>,
    error: Option<String>,
}

impl ResearchDashboard {
    pub fn new(backend: Arc<dyn ResearchBackend>, config: PollerConfig) -> Self {
        Self {
            poller: StatusPoller::new(Arc::clone(&backend), config),
            backend,
            last_request: None,
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_request(&self) -> Option<&FeatureRequest> {
        self.last_request.as_ref()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.poller.subscribe()
    }

    pub fn state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn view(&self) -> StatusView {
        view_state(&self.poller.state())
    }

    /// Validates `form`, starts a research session, and begins polling it.
    pub async fn submit(&mut self, form: &FeatureForm) -> Result<SessionId, ClientError> {
        let request = match form.validate() {
            Ok(request) => request,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        };
        self.start(request).await
    }

    /// Resubmits the last accepted request as a new session.
    pub async fn retry(&mut self) -> Result<SessionId, ClientError> {
        let Some(request) = self.last_request.clone() else {
            let err = ClientError::Rejected("no previous research request to retry".to_string());
            self.error = Some(err.to_string());
            return Err(err);
        };
        self.start(request).await
    }

    /// Follows an existing session without submitting anything.
    pub fn watch(&mut self, session_id: impl Into<SessionId>) -> Result<(), ClientError> {
        match self.poller.start(session_id) {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Stops polling and clears the session, snapshot, and any error.
    pub fn reset(&mut self) {
        self.poller.reset();
        self.error = None;
    }

    async fn start(&mut self, request: FeatureRequest) -> Result<SessionId, ClientError> {
        self.poller.stop();
        let response = match self.backend.start_research(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(feature = %request.name, error = %err, "failed to start research");
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        info!(session_id = %response.session_id, feature = %request.name, "research session started");
        self.last_request = Some(request);
        self.watch(response.session_id.clone())?;
        Ok(response.session_id)
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
