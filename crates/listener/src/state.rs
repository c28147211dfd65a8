//! Shared state for webhook handlers.

use pipeline::{TeamName, WebhookService};

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct ListenerState {
    /// Runs authentication, resolution and dispatch.
    pub service: WebhookService,
    /// Team used by routes that do not name one.
    pub default_team: TeamName,
}

impl ListenerState {
    /// Creates handler state.
    pub fn new(service: WebhookService, default_team: TeamName) -> Self {
        Self {
            service,
            default_team,
        }
    }
}
