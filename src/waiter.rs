//! Operation waiter
//!
//! One polling loop shared by every resource kind: probe, test predicates,
//! sleep, repeat until success, failure or the deadline. Probe errors are
//! logged and treated as "not yet"; only the failure predicate or the
//! deadline end a wait unsuccessfully.

use crate::error::{CloudError, Result};
use crate::status::{CanonicalStatus, Status};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

/// Default delay between probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default wait budget
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Polling cadence and budget for a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl WaitOptions {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT)
    }
}

/// Terminal observation of a wait
enum Outcome<S> {
    Success(S),
    Failure(S),
}

/// Shared loop. `classify` returns `None` while the state is still pending.
/// Each attempt is bounded by the remaining budget; on expiry returns the time
/// waited and the last swallowed error.
async fn poll_loop<S, F, Fut, C>(
    mut probe: F,
    classify: C,
    opts: &WaitOptions,
    what: &str,
) -> std::result::Result<Outcome<S>, (Duration, Option<String>)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    C: Fn(S) -> Option<Outcome<S>>,
{
    let started = Instant::now();
    let mut last_error: Option<String> = None;
    let mut probes: u32 = 0;

    loop {
        probes += 1;
        let remaining = opts.timeout.saturating_sub(started.elapsed());
        match timeout(remaining, probe()).await {
            Ok(Ok(state)) => {
                if let Some(done) = classify(state) {
                    tracing::debug!("wait for {} finished after {} probes", what, probes);
                    return Ok(done);
                }
            },
            Ok(Err(e)) => {
                tracing::warn!("probe {} for {} failed, retrying: {}", probes, what, e);
                last_error = Some(e.to_string());
            },
            Err(_) => {
                tracing::warn!("attempt {} for {} outlived the wait budget", probes, what);
                let stalled = format!("attempt {} did not answer before the deadline", probes);
                return Err((started.elapsed(), last_error.or(Some(stalled))));
            },
        }

        let elapsed = started.elapsed();
        if elapsed >= opts.timeout {
            tracing::warn!(
                "gave up waiting for {} after {} probes ({:?})",
                what,
                probes,
                elapsed
            );
            return Err((elapsed, last_error));
        }

        sleep(opts.poll_interval.min(opts.timeout - elapsed)).await;
    }
}

/// Poll until `is_success` or `is_failure` holds for a probed state.
///
/// Returns the successful state, [`CloudError::OperationFailed`] when the
/// failure predicate fires, or [`CloudError::Timeout`] when neither fires
/// within `opts.timeout` (measured from the call, monotonic).
pub async fn wait_until<S, F, Fut, P, Q>(
    probe: F,
    is_success: P,
    is_failure: Q,
    opts: &WaitOptions,
    what: &str,
) -> Result<S>
where
    S: fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    P: Fn(&S) -> bool,
    Q: Fn(&S) -> bool,
{
    let classify = |state: S| {
        if is_success(&state) {
            Some(Outcome::Success(state))
        } else if is_failure(&state) {
            Some(Outcome::Failure(state))
        } else {
            None
        }
    };

    match poll_loop(probe, classify, opts, what).await {
        Ok(Outcome::Success(state)) => Ok(state),
        Ok(Outcome::Failure(state)) => Err(CloudError::OperationFailed {
            id: what.to_string(),
            reason: format!("{:?}", state),
        }),
        Err((waited, last_error)) => Err(CloudError::Timeout {
            what: what.to_string(),
            waited_secs: waited.as_secs(),
            last_error,
        }),
    }
}

/// Poll until `is_done` holds. Returns `false` on timeout.
///
/// Fire-and-confirm flavor: no failure predicate, so the only negative
/// outcome is "not confirmed in time". Callers must not read `false` as done.
pub async fn wait_confirm<S, F, Fut, P>(
    probe: F,
    is_done: P,
    opts: &WaitOptions,
    what: &str,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    P: Fn(&S) -> bool,
{
    let classify = |state: S| is_done(&state).then_some(Outcome::Success(state));

    matches!(
        poll_loop(probe, classify, opts, what).await,
        Ok(Outcome::Success(_))
    )
}

/// Something whose canonical status can be re-read on demand
pub trait Pollable: Sync {
    /// Label used in logs and errors
    fn describe(&self) -> String;

    /// Fetch the current status from the provider
    fn probe_status(&self) -> BoxFuture<'_, Result<Status>>;
}

/// Wait until `target` reports `wanted`. A `failed` status ends the wait
/// with [`CloudError::OperationFailed`] unless `failed` is what was asked for.
pub async fn wait_for_status<P>(
    target: &P,
    wanted: CanonicalStatus,
    opts: &WaitOptions,
) -> Result<Status>
where
    P: Pollable + ?Sized,
{
    let what = format!("{} to become {}", target.describe(), wanted);
    wait_until(
        || target.probe_status(),
        |s: &Status| s.canonical() == wanted,
        |s: &Status| s.is_failed(),
        opts,
        &what,
    )
    .await
}
