//! Transparent access-token renewal for outbound requests.
//!
//! When a request comes back `401`, [`SessionClient`] refreshes the access
//! token once and replays the request. Concurrent `401`s share that single
//! refresh: the first caller performs it, the rest wait on a oneshot channel
//! and are released with its outcome. A request sent to the refresh path
//! directly takes part in the same flight rather than starting a second one.

use http::{StatusCode, header};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use super::cookie_jar::SessionCookies;
use super::transport::{ClientRequest, ClientResponse, Transport, TransportError};

/// Why a refresh did not produce a new access token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("refresh rejected with status {0}")]
    Rejected(StatusCode),
    #[error("refresh transport failure: {0}")]
    Transport(String),
    #[error("refresh timed out")]
    TimedOut,
    #[error("refresh abandoned before it settled")]
    Abandoned,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The session could not be renewed; the caller should send the user to
    /// the login page.
    #[error("session expired: {0}")]
    SessionExpired(RefreshError),
}

type RefreshOutcome = Result<ClientResponse, RefreshError>;
type Waiter = oneshot::Sender<RefreshOutcome>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<Waiter>,
}

struct Inner<T> {
    transport: T,
    cookies: SessionCookies,
    refresh_path: String,
    refresh_timeout: Option<Duration>,
    state: Mutex<RefreshState>,
}

/// HTTP client that keeps a session alive across access-token expiry.
pub struct SessionClient<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SessionClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> SessionClient<T> {
    pub fn new(transport: T, refresh_path: impl Into<String>) -> Self {
        Self::build(transport, refresh_path.into(), None)
    }

    /// Give up on a refresh that has not settled within `timeout`. Without
    /// this a hung refresh keeps every waiter parked.
    pub fn with_refresh_timeout(
        transport: T,
        refresh_path: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self::build(transport, refresh_path.into(), Some(timeout))
    }

    fn build(transport: T, refresh_path: String, refresh_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                cookies: SessionCookies::new(),
                refresh_path,
                refresh_timeout,
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    pub fn cookies(&self) -> &SessionCookies {
        &self.inner.cookies
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Send `request`, renewing the access token and replaying once on `401`.
    ///
    /// A request for the refresh path joins the refresh already in flight, or
    /// leads one, and is never retried. Its failure is a [`ClientError::SessionExpired`].
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: ClientRequest) -> Result<ClientResponse, ClientError> {
        if self.is_refresh(&request) {
            return self.renew_session().await.map_err(ClientError::SessionExpired);
        }

        let response = self.dispatch(request.clone()).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // The replay below goes straight to the transport, so this request
        // cannot come back through here a second time.
        self.renew_session()
            .await
            .map_err(ClientError::SessionExpired)?;

        debug!("Replaying request after refresh");
        Ok(self.dispatch(request).await?)
    }

    /// Wait for a fresh access token, starting a refresh only if none is
    /// already in flight.
    async fn renew_session(&self) -> RefreshOutcome {
        let waiting = {
            let mut state = self.lock_state();
            if state.in_progress {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.in_progress = true;
                None
            }
        };

        if let Some(rx) = waiting {
            debug!("Refresh already in flight, queueing");
            return rx.await.unwrap_or(Err(RefreshError::Abandoned));
        }

        let flight = InFlight {
            state: &self.inner.state,
            settled: false,
        };
        let outcome = self.call_refresh().await;
        flight.settle(outcome.clone());
        outcome
    }

    async fn call_refresh(&self) -> RefreshOutcome {
        let request = ClientRequest::post(self.inner.refresh_path.clone());
        let attempt = self.dispatch(request);

        let response = match self.inner.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| RefreshError::TimedOut)?,
            None => attempt.await,
        }
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if response.status.is_success() {
            debug!("Access token refreshed");
            Ok(response)
        } else {
            warn!(status = %response.status, "Refresh rejected");
            Err(RefreshError::Rejected(response.status))
        }
    }

    /// One round trip with the jar's cookies attached and any `Set-Cookie`
    /// absorbed.
    async fn dispatch(&self, mut request: ClientRequest) -> Result<ClientResponse, TransportError> {
        if let Some(cookie) = self.inner.cookies.header() {
            request.headers.insert(header::COOKIE, cookie);
        }
        let response = self.inner.transport.send(request).await?;
        self.inner.cookies.absorb(&response.headers);
        Ok(response)
    }

    fn is_refresh(&self, request: &ClientRequest) -> bool {
        request.route() == self.inner.refresh_path
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        lock(&self.inner.state)
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Held by the caller performing the refresh. Clears the in-progress flag and
/// releases every waiter exactly once, on success, failure or cancellation.
struct InFlight<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: RefreshOutcome) {
        self.release(outcome);
        self.settled = true;
    }

    fn release(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = lock(self.state);
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            // A waiter that gave up has nothing to be told.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.release(Err(RefreshError::Abandoned));
        }
    }
}
