use crate::interview::driver::InterviewDriver;
use crate::interview::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Runs interview turns against the model and storage collaborators.
    pub driver: InterviewDriver,
}

impl AppState {
    pub fn new(driver: InterviewDriver) -> Self {
        Self {
            sessions: SessionStore::new(),
            driver,
        }
    }
}
