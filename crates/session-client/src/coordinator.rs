//! Single-flight session renewal.
//!
//! Every call goes through [`RefreshCoordinator::execute`]. A 401 on a
//! non-exempt path means the session has lapsed: the first such caller moves
//! the coordinator from `Idle` to `Refreshing` and a single renewal exchange
//! starts; callers that hit a 401 while it is in flight queue behind it. When
//! the renewal settles every queued caller replays its own request once on
//! success, or fails with the renewal's error. A 401 for a request sent before
//! a renewal succeeded is answered by that renewal: the caller replays without
//! starting another.
//!
//! # Guarantees
//!
//! - At most one renewal exchange is in flight per coordinator.
//! - The phase check and the enqueue happen under one lock, so concurrent
//!   401s can't both start a renewal.
//! - A 401 delivered after the renewal it raced with succeeded replays
//!   directly.
//! - The renewal runs in its own task behind a drop guard. Timeout, panic, or
//!   runtime shutdown still resolve every waiter and return to `Idle`.
//! - Cancelling a caller never stalls the others.
//! - A failed renewal does not clear the session store.

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::session_store::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use common::types::RefreshResponse;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::instrument;

/// Endpoints whose 401s go straight to the caller.
const RENEWAL_EXEMPT: [&str; 3] = ["login", "register", "refresh"];

type Waiter = oneshot::Sender<Result<(), ClientError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Refreshing,
}

struct CoordinatorState {
    phase: Phase,
    waiters: Vec<Waiter>,
    /// Bumped on every successful renewal.
    generation: u64,
}

/// Whether `path` is one of the renewal endpoints themselves.
pub fn is_renewal_exempt(path: &str) -> bool {
    let route = path
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let last = route.rsplit('/').next().unwrap_or_default();
    RENEWAL_EXEMPT.contains(&last)
}

/// Client-side single-flight controller.
///
/// One instance per client process. Clones share state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    session: SessionStore,
    refresh_path: String,
    renewal_timeout: Duration,
    state: Arc<Mutex<CoordinatorState>>,
    renewals: Arc<AtomicUsize>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: SessionStore,
        config: &ClientConfig,
    ) -> Self {
        Self {
            transport,
            session,
            refresh_path: config.endpoint("refresh"),
            renewal_timeout: config.renewal_timeout,
            state: Arc::new(Mutex::new(CoordinatorState {
                phase: Phase::Idle,
                waiters: Vec::new(),
                generation: 0,
            })),
            renewals: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Send `request`, renewing the session and replaying once if it lapsed.
    ///
    /// Non-2xx responses other than a renewable 401 are returned as-is.
    ///
    /// # Errors
    ///
    /// - Transport failures of the original request or its replay
    /// - The renewal's error when the session could not be renewed
    #[instrument(
        skip_all,
        name = "client.coordinator.execute",
        fields(path = %request.route())
    )]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let sent_at = self.lock_state().generation;
        let response = self.transport.send(&request).await?;

        if !needs_renewal(&request, &response) {
            return Ok(response);
        }

        tracing::debug!(target: "client.coordinator", "Session lapsed, waiting for renewal");
        self.await_renewal(sent_at).await?;

        tracing::debug!(target: "client.coordinator", "Replaying request after renewal");
        self.transport.send(&request).await
    }

    /// Whether a renewal is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.lock_state().phase == Phase::Refreshing
    }

    /// Number of renewal exchanges started so far.
    pub fn renewal_count(&self) -> usize {
        self.renewals.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for a renewal newer than `sent_at`, starting one if needed.
    async fn await_renewal(&self, sent_at: u64) -> Result<(), ClientError> {
        let (sender, receiver) = oneshot::channel();

        let start = {
            let mut state = self.lock_state();
            if state.phase == Phase::Idle && state.generation != sent_at {
                tracing::trace!(
                    target: "client.coordinator",
                    "Session renewed since the request was sent"
                );
                return Ok(());
            }
            state.waiters.push(sender);
            let idle = state.phase == Phase::Idle;
            if idle {
                state.phase = Phase::Refreshing;
            }
            idle
        };

        if start {
            self.spawn_renewal();
        } else {
            tracing::trace!(target: "client.coordinator", "Renewal already in flight, queued");
        }

        receiver.await.unwrap_or(Err(ClientError::RenewalAborted))
    }

    fn spawn_renewal(&self) {
        let mut guard = RenewalGuard {
            state: self.state.clone(),
            settled: false,
        };
        let transport = self.transport.clone();
        let session = self.session.clone();
        let request = ApiRequest::post(self.refresh_path.clone());
        let timeout = self.renewal_timeout;
        self.renewals.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, transport.send(&request)).await {
                Err(_) => {
                    tracing::warn!(
                        target: "client.coordinator",
                        timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        "Session renewal timed out"
                    );
                    Err(ClientError::RenewalTimedOut)
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        target: "client.coordinator",
                        error = %e,
                        "Session renewal failed"
                    );
                    Err(e)
                }
                Ok(Ok(response)) => renewal_outcome(response, &session),
            };

            guard.settle(outcome);
        });
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_path", &self.refresh_path)
            .field("renewal_timeout", &self.renewal_timeout)
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

/// A 401 on a non-exempt path that isn't an invalid token.
fn needs_renewal(request: &ApiRequest, response: &ApiResponse) -> bool {
    if response.status != 401 || is_renewal_exempt(&request.path) {
        return false;
    }
    !response
        .error_body()
        .is_some_and(|body| body.is_invalid_token())
}

fn renewal_outcome(response: ApiResponse, session: &SessionStore) -> Result<(), ClientError> {
    if response.status == 401 || response.status == 403 {
        tracing::info!(
            target: "client.coordinator",
            status = response.status,
            "Session renewal refused"
        );
        return Err(ClientError::SessionExpired);
    }

    let response = response.error_for_status()?;

    match response.json::<RefreshResponse>() {
        Ok(RefreshResponse { user: Some(user), .. }) => session.set(user),
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(
                target: "client.coordinator",
                error = %e,
                "Renewal body not understood"
            );
        }
    }

    tracing::debug!(target: "client.coordinator", "Session renewed");
    Ok(())
}

/// Resolves every waiter and returns the phase to `Idle`, on drop if not
/// settled explicitly.
struct RenewalGuard {
    state: Arc<Mutex<CoordinatorState>>,
    settled: bool,
}

impl RenewalGuard {
    fn settle(&mut self, outcome: Result<(), ClientError>) {
        self.settled = true;

        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.phase = Phase::Idle;
            if outcome.is_ok() {
                state.generation = state.generation.wrapping_add(1);
            }
            std::mem::take(&mut state.waiters)
        };

        tracing::debug!(
            target: "client.coordinator",
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "Renewal settled"
        );

        for waiter in waiters {
            // A dropped receiver is a cancelled caller.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for RenewalGuard {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(target: "client.coordinator", "Renewal ended without an outcome");
            self.settle(Err(ClientError::RenewalAborted));
        }
    }
}
