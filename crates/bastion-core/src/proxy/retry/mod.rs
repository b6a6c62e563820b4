//! Retry coordinator.
//!
//! Drives the attempts of one request: checks the circuit breaker once,
//! selects an endpoint, runs the connector call in its own task, classifies
//! the outcome against the slow-call threshold and retries on another
//! endpoint until the retry budget is spent. Every non-success outcome is
//! reported to the breaker, and no further attempt is dialed once the
//! breaker is open.

pub mod attempt;
pub mod replay;

#[cfg(test)]
mod tests;

pub use attempt::{Attempt, AttemptOutcome, RetrySession};
pub use replay::ReplayBody;

use bastion_types::{FailoverConfig, ProxyError, SlowCallMode};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use super::common::circuit_breaker::{
    BreakerPolicy, CircuitBreakerKey, CircuitBreakerManager, CircuitState,
};
use super::connector::ConnectorError;
use super::endpoint::{Endpoint, EndpointGroup};
use super::prometheus;

/// Where the attempts of a request go.
#[derive(Debug, Clone)]
pub enum AttemptTarget {
    /// Every attempt hits this endpoint
    Endpoint(Arc<Endpoint>),
    /// Each attempt asks the group's load balancer
    Group(Arc<EndpointGroup>),
}

impl AttemptTarget {
    pub fn group_name(&self) -> &str {
        match self {
            Self::Endpoint(endpoint) => &endpoint.group,
            Self::Group(group) => group.name(),
        }
    }

    fn select(&self, tried: &[String]) -> Option<Arc<Endpoint>> {
        match self {
            Self::Endpoint(endpoint) => Some(Arc::clone(endpoint)),
            Self::Group(group) => group.next_excluding(tried),
        }
    }
}

/// Per-request inputs of the coordinator.
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub api_id: String,
    pub subscription: Option<String>,
    pub failover: FailoverConfig,
    pub trace_id: String,
}

impl RetryContext {
    pub fn breaker_key(&self, group: &str) -> CircuitBreakerKey {
        let scope =
            if self.failover.per_subscription { self.subscription.as_deref() } else { None };
        CircuitBreakerKey::new(&self.api_id, group, scope)
    }
}

/// Result of the winning attempt.
#[derive(Debug)]
pub struct Delivered<T> {
    pub value: T,
    pub endpoint: Arc<Endpoint>,
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    breaker: Arc<CircuitBreakerManager>,
}

impl RetryCoordinator {
    pub fn new(breaker: Arc<CircuitBreakerManager>) -> Self {
        Self { breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreakerManager> {
        &self.breaker
    }

    /// Run `op` against the endpoints of `target` until one attempt succeeds
    /// or the retry budget is exhausted.
    ///
    /// `op` is invoked once per attempt; its future is spawned so that a slow
    /// call can be abandoned without cancelling the underlying I/O. Abandoned
    /// results are dropped and never reach the caller.
    pub async fn execute<T, F, Fut>(
        &self,
        ctx: &RetryContext,
        target: &AttemptTarget,
        mut op: F,
    ) -> Result<Delivered<T>, ProxyError>
    where
        T: Send + 'static,
        F: FnMut(Arc<Endpoint>) -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>> + Send + 'static,
    {
        let failover = &ctx.failover;
        let group = target.group_name().to_string();
        let key = ctx.breaker_key(&group);
        let policy = BreakerPolicy::from(failover);

        if failover.enabled {
            if let Err(retry_in) = self.breaker.should_allow(&key, &policy) {
                warn!(
                    api_id = %ctx.api_id,
                    group = %group,
                    trace_id = %ctx.trace_id,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "Circuit open, rejecting without contacting backend"
                );
                prometheus::record_circuit_rejection(&ctx.api_id);
                return Err(ProxyError::CircuitOpen { api_id: ctx.api_id.clone(), group });
            }
        }

        let mut session = RetrySession::new(if failover.enabled { failover.max_retries } else { 0 });

        loop {
            let Some(endpoint) = target.select(&session.tried_endpoints()) else {
                return Err(ProxyError::NoEndpoint { group });
            };
            let number = session.next_number();
            let started_at = Instant::now();

            let (outcome, result) = run_attempt(failover, op(Arc::clone(&endpoint))).await;

            let elapsed = started_at.elapsed();
            debug!(
                api_id = %ctx.api_id,
                group = %group,
                endpoint = %endpoint.name,
                attempt = number,
                trace_id = %ctx.trace_id,
                outcome = outcome.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Attempt finished"
            );
            prometheus::record_attempt(&ctx.api_id, outcome.as_str());
            session.push(Attempt {
                number,
                endpoint: endpoint.name.clone(),
                started_at,
                elapsed,
                outcome,
                error: result.as_ref().err().cloned(),
            });

            if failover.enabled {
                if outcome.is_breaker_failure() {
                    let reason = result.as_ref().err().map_or("slow call", String::as_str);
                    self.breaker.record_failure(&key, reason, &policy);
                } else {
                    self.breaker.record_success(&key);
                }
            }
            // A breaker opened by this or a concurrent request stops further attempts
            let circuit_open = failover.enabled && self.breaker.get_state(&key) == CircuitState::Open;

            match result {
                Ok(value) if outcome == AttemptOutcome::Success => {
                    return Ok(Delivered { value, endpoint, attempts: session.into_attempts() });
                },
                Ok(value) => {
                    if circuit_open || !session.take_retry() {
                        info!(
                            api_id = %ctx.api_id,
                            endpoint = %endpoint.name,
                            trace_id = %ctx.trace_id,
                            circuit_open,
                            "Forwarding slow response, no further attempt allowed"
                        );
                        return Ok(Delivered { value, endpoint, attempts: session.into_attempts() });
                    }
                    // Superseded by the retry
                    drop(value);
                },
                Err(reason) => {
                    if circuit_open && session.remaining_retries() > 0 {
                        warn!(
                            api_id = %ctx.api_id,
                            group = %group,
                            trace_id = %ctx.trace_id,
                            attempts = session.attempts().len(),
                            "Circuit opened during retries, abandoning remaining attempts"
                        );
                        return Err(ProxyError::CircuitOpen { api_id: ctx.api_id.clone(), group });
                    }
                    if !session.take_retry() {
                        let error = attempt_error(outcome, &endpoint, failover, reason);
                        let attempts = session.attempts().len() as u32;
                        warn!(
                            api_id = %ctx.api_id,
                            group = %group,
                            trace_id = %ctx.trace_id,
                            attempts,
                            error = %error,
                            "All attempts failed"
                        );
                        if attempts > 1 {
                            return Err(ProxyError::BudgetExhausted {
                                attempts,
                                last_error: error.to_string(),
                            });
                        }
                        return Err(error);
                    }
                },
            }

            debug!(
                api_id = %ctx.api_id,
                trace_id = %ctx.trace_id,
                remaining = session.remaining_retries(),
                "Retrying on next endpoint"
            );
        }
    }
}

async fn run_attempt<T, Fut>(
    failover: &FailoverConfig,
    call: Fut,
) -> (AttemptOutcome, Result<T, String>)
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, ConnectorError>> + Send + 'static,
{
    let mut handle = tokio::spawn(call);

    if !failover.enabled {
        return classify(handle.await, false);
    }

    let threshold = failover.slow_call_duration();
    match failover.slow_call_mode {
        SlowCallMode::Race => match tokio::time::timeout(threshold, &mut handle).await {
            Ok(joined) => classify(joined, false),
            // Dropping the handle detaches the task; its result is discarded
            Err(_) => (
                AttemptOutcome::SlowCall,
                Err(format!("no response within {}ms", failover.slow_call_duration_ms)),
            ),
        },
        SlowCallMode::Measure => {
            let started = Instant::now();
            let joined = handle.await;
            classify(joined, started.elapsed() >= threshold)
        },
    }
}

fn classify<T>(
    joined: Result<Result<T, ConnectorError>, JoinError>,
    slow: bool,
) -> (AttemptOutcome, Result<T, String>) {
    match joined {
        Ok(Ok(value)) if slow => (AttemptOutcome::SlowSuccess, Ok(value)),
        Ok(Ok(value)) => (AttemptOutcome::Success, Ok(value)),
        Ok(Err(ConnectorError::Connect(message))) => (AttemptOutcome::ConnectFailure, Err(message)),
        Ok(Err(ConnectorError::Call(message))) => (AttemptOutcome::CallFailure, Err(message)),
        Err(join_error) => (AttemptOutcome::CallFailure, Err(join_error.to_string())),
    }
}

fn attempt_error(
    outcome: AttemptOutcome,
    endpoint: &Endpoint,
    failover: &FailoverConfig,
    message: String,
) -> ProxyError {
    let endpoint = endpoint.name.clone();
    match outcome {
        AttemptOutcome::SlowCall | AttemptOutcome::SlowSuccess => {
            ProxyError::SlowCall { endpoint, threshold_ms: failover.slow_call_duration_ms }
        },
        AttemptOutcome::ConnectFailure => ProxyError::ConnectFailure { endpoint, message },
        AttemptOutcome::CallFailure | AttemptOutcome::Success => {
            ProxyError::CallFailure { endpoint, message }
        },
    }
}
