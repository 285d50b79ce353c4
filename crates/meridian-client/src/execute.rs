//! The retrying execution engine
//!
//! One loop serves every request kind through the [`Execute`] capability:
//! the request supplies its wire envelope, its status classification, and
//! its output mapping; the engine owns node selection, per-attempt
//! deadlines, backoff, and give-up conditions. Attempts for one request are
//! strictly sequential.

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::{WireRequest, WireResponse};
use meridian_core::{AccountId, ExecutionState, MeridianError, Timestamp, TransactionId};
use rand::Rng;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace, warn};

/// Capability implemented by each executable request kind
pub trait Execute: Send + Sync {
    /// What a resolved request yields
    type Output;

    /// Short name of the wire operation, for logging
    fn operation(&self) -> &'static str;

    /// The transaction this request concerns, for error reporting
    fn transaction_id(&self) -> Option<&TransactionId>;

    /// Explicit node restriction, when the request carries one
    fn node_account_ids(&self) -> Option<&[AccountId]>;

    /// End of the validity window, for requests that expire
    fn valid_until(&self) -> Option<Timestamp>;

    /// The wire request for a dispatch to the named node
    fn make_request(&self, node_account_id: &AccountId) -> Result<WireRequest, ClientError>;

    /// Classify a response into an execution state
    fn classify(&self, response: &WireResponse) -> ExecutionState;

    /// The terminal error a non-retryable response maps to
    fn terminal_error(&self, response: &WireResponse) -> ClientError;

    /// Map a successful response into the request's output
    fn make_output(
        &self,
        node_account_id: &AccountId,
        response: WireResponse,
    ) -> Result<Self::Output, ClientError>;
}

/// Jittered exponential retry delay for the given 1-based attempt
fn retry_delay(config: &ClientConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base = config.min_backoff().saturating_mul(1u32 << exponent);
    let capped = base.min(config.max_backoff());
    capped.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
}

/// Track nodes found unhealthy this rotation. Returns true once every pool
/// member has been tried, at which point the rotation starts over and the
/// engine must sleep instead of spinning across a fully impaired pool.
fn note_unhealthy(rotation: &mut Vec<AccountId>, id: &AccountId, pool_len: usize) -> bool {
    if !rotation.contains(id) {
        rotation.push(id.clone());
    }
    if rotation.len() >= pool_len {
        rotation.clear();
        true
    } else {
        false
    }
}

/// Sleep `delay`, failing with `Timeout` if that would cross `deadline`
async fn sleep_within(delay: Duration, deadline: Instant, config: &ClientConfig) -> Result<(), ClientError> {
    if Instant::now() + delay > deadline {
        return Err(ClientError::Timeout {
            timeout: config.request_timeout(),
        });
    }
    sleep(delay).await;
    Ok(())
}

/// Drive `request` to a terminal outcome against `client`'s network.
///
/// The loop is bounded by `max_attempts` and the overall request deadline.
/// Success records node health and returns the mapped output; `Retry`
/// penalizes the node and sleeps a jittered exponential delay before
/// preferring a different node; `NodeUnhealthy` penalizes the node and
/// rotates without sleeping until the whole pool has been tried once;
/// `RequestError` returns the request's terminal error immediately.
pub async fn execute<E: Execute>(client: &Client, request: &E) -> Result<E::Output, ClientError> {
    let config = client.config();
    let deadline = Instant::now() + config.request_timeout();
    let pool = match request.node_account_ids() {
        Some(ids) => client.pool().restrict(ids)?,
        None => client.pool().clone(),
    };

    let mut rotation: Vec<AccountId> = Vec::new();
    let mut last_error: Option<ClientError> = None;

    for attempt in 1..=config.max_attempts() {
        if let Some(valid_until) = request.valid_until() {
            if valid_until.is_past() {
                return Err(match request.transaction_id() {
                    Some(id) => ClientError::RequestExpired {
                        transaction_id: id.clone(),
                    },
                    None => ClientError::config("request expired without a transaction id"),
                });
            }
        }
        if Instant::now() >= deadline {
            return Err(ClientError::Timeout {
                timeout: config.request_timeout(),
            });
        }

        let selected = pool.select(&rotation);
        if !selected.delay.is_zero() {
            debug!(
                operation = request.operation(),
                node = %selected.node.account_id(),
                delay = ?selected.delay,
                "waiting for node readmission"
            );
            sleep_within(selected.delay, deadline, config).await?;
        }
        let node = selected.node;

        let wire = request.make_request(node.account_id())?;
        trace!(
            operation = request.operation(),
            node = %node.account_id(),
            attempt,
            "dispatching"
        );

        let sent = timeout(config.attempt_timeout(), client.transport().send(&node, wire)).await;
        let response = match sent {
            Err(_elapsed) => Err(crate::transport::TransportError::DeadlineExceeded(
                config.attempt_timeout(),
            )),
            Ok(result) => result,
        };

        let response = match response {
            Ok(response) => response,
            Err(err) if err.is_retryable() => {
                warn!(
                    operation = request.operation(),
                    node = %node.account_id(),
                    error = %err,
                    "transport failure, rotating node"
                );
                node.record_failure();
                let exhausted = note_unhealthy(&mut rotation, node.account_id(), pool.len());
                last_error = Some(ClientError::Transport(err));
                if exhausted {
                    sleep_within(retry_delay(config, attempt), deadline, config).await?;
                }
                continue;
            }
            Err(err) => return Err(ClientError::Transport(err)),
        };

        match request.classify(&response) {
            ExecutionState::Success => {
                node.record_success();
                return request.make_output(node.account_id(), response);
            }
            ExecutionState::Retry => {
                let delay = retry_delay(config, attempt);
                debug!(
                    operation = request.operation(),
                    node = %node.account_id(),
                    attempt,
                    delay = ?delay,
                    "transient response, backing off"
                );
                // Sticky-node avoidance: penalize the node and prefer a
                // different one next attempt, in addition to backing off.
                node.record_failure();
                note_unhealthy(&mut rotation, node.account_id(), pool.len());
                last_error = Some(request.terminal_error(&response));
                sleep_within(delay, deadline, config).await?;
            }
            ExecutionState::NodeUnhealthy => {
                debug!(
                    operation = request.operation(),
                    node = %node.account_id(),
                    attempt,
                    "node unhealthy, rotating"
                );
                node.record_failure();
                last_error = Some(request.terminal_error(&response));
                let exhausted = note_unhealthy(&mut rotation, node.account_id(), pool.len());
                if exhausted {
                    sleep_within(retry_delay(config, attempt), deadline, config).await?;
                }
            }
            ExecutionState::RequestError => {
                let error = request.terminal_error(&response);
                debug!(
                    operation = request.operation(),
                    node = %node.account_id(),
                    error = %error,
                    "terminal response"
                );
                return Err(error);
            }
        }
    }

    let last = last_error.unwrap_or_else(|| {
        ClientError::Core(MeridianError::invalid("request made no attempts"))
    });
    Err(ClientError::MaxAttemptsExceeded {
        attempts: config.max_attempts(),
        last: Box::new(last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_is_bounded_by_configuration() {
        let config = ClientConfig::default();
        for attempt in 1..=20 {
            let delay = retry_delay(&config, attempt);
            assert!(delay <= config.max_backoff());
            assert!(delay >= config.min_backoff() / 2);
        }
    }

    #[test]
    fn rotation_resets_after_covering_the_pool() {
        let mut rotation = Vec::new();
        let a = AccountId::from_num(3);
        let b = AccountId::from_num(4);
        assert!(!note_unhealthy(&mut rotation, &a, 2));
        assert!(!note_unhealthy(&mut rotation, &a, 2));
        assert!(note_unhealthy(&mut rotation, &b, 2));
        assert!(rotation.is_empty());
    }
}
