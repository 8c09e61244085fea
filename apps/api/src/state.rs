use std::time::Duration;

use discepto_application::Discepto;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub discepto: Discepto,
    pub request_timeout: Duration,
}
