use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use discepto_application::{Cancellation, CancellationTrigger};
use discepto_core::{AppError, AppResult};
use discepto_domain::UserId;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the id of the user authenticated by the upstream proxy.
pub const USER_HEADER: &str = "x-discepto-user";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request data every handler receives.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub user_id: Option<UserId>,
    pub cancellation: Cancellation,
}

impl RequestContext {
    pub fn new(user_id: Option<UserId>, cancellation: Cancellation) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id,
            cancellation,
        }
    }
}

/// Fires a cancellation trigger once the deadline passes. Dropping the timer
/// aborts it, so an unwound or dropped request never leaves it running.
struct DeadlineTimer {
    task: JoinHandle<()>,
}

impl DeadlineTimer {
    fn start(deadline: Duration, request_id: Uuid, trigger: CancellationTrigger) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!(%request_id, ?deadline, "request deadline exceeded");
            trigger.cancel();
        });

        Self { task }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Attaches the acting user and a deadline-bound cancellation signal.
pub async fn request_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let user_id = acting_user_id(request.headers())?;
    let (trigger, cancellation) = Cancellation::new();
    let context = RequestContext::new(user_id, cancellation);
    let request_id = context.request_id;

    let timer = DeadlineTimer::start(state.request_timeout, request_id, trigger);

    debug!(%request_id, user_id = ?user_id, "request context attached");
    request.extensions_mut().insert(context);
    let mut response = next.run(request).await;
    drop(timer);

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    Ok(response)
}

fn acting_user_id(headers: &HeaderMap) -> AppResult<Option<UserId>> {
    let Some(value) = headers.get(USER_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .map(|id| Some(UserId::new(id)))
        .ok_or_else(|| AppError::InvalidFormat(format!("{USER_HEADER} must be a user id")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{HeaderMap, HeaderValue};
    use discepto_application::Cancellation;
    use discepto_core::AppError;
    use discepto_domain::UserId;
    use uuid::Uuid;

    use super::{DeadlineTimer, USER_HEADER, acting_user_id};

    #[tokio::test]
    async fn deadline_timer_cancels_when_it_elapses() {
        let (trigger, cancellation) = Cancellation::new();
        let _timer = DeadlineTimer::start(Duration::from_millis(5), Uuid::new_v4(), trigger);

        let fired = tokio::time::timeout(Duration::from_secs(5), cancellation.cancelled()).await;
        assert!(fired.is_ok());
        assert!(cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_deadline_timer_never_fires() {
        let (trigger, cancellation) = Cancellation::new();
        let timer = DeadlineTimer::start(Duration::from_millis(20), Uuid::new_v4(), trigger);
        drop(timer);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!cancellation.is_cancelled());
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(matches!(acting_user_id(&HeaderMap::new()), Ok(None)));
    }

    #[test]
    fn numeric_header_names_the_acting_user() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(acting_user_id(&headers).ok(), Some(Some(UserId::new(42))));
    }

    #[test]
    fn garbage_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("alice"));
        assert!(matches!(
            acting_user_id(&headers),
            Err(AppError::InvalidFormat(_))
        ));
    }
}
