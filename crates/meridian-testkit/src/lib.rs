//! Test support for Meridian clients
//!
//! The centerpiece is [`MockTransport`]: a [`Transport`] that replays a
//! script of responses and records every dispatch, so engine tests can
//! assert exactly how many attempts were made and which nodes saw them.
//! Deterministic fixtures for pools, operators, and clients keep engine
//! tests free of setup noise.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use meridian_client::{
    Client, Node, NodePool, Operator, Transport, TransportError, WireRequest, WireResponse,
};
use meridian_core::{AccountId, PrivateKey, Status};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// One scripted transport outcome
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Return this response
    Respond(WireResponse),
    /// Fail with this transport error
    Fail(TransportError),
    /// Never resolve, so the caller's attempt deadline fires
    Hang,
}

/// One recorded dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    /// The node the engine dispatched to
    pub node_account_id: AccountId,
    /// The wire request as handed to the transport
    pub request: WireRequest,
}

/// A transport that replays a script and records every dispatch.
///
/// Steps are consumed in order; once the script is exhausted the fallback
/// step (when set) repeats indefinitely, otherwise further dispatches fail
/// with a non-retryable error so a test cannot silently loop.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<ScriptStep>>,
    fallback: Option<ScriptStep>,
    log: Mutex<Vec<DispatchRecord>>,
}

impl MockTransport {
    /// A transport replaying `steps` in order
    pub fn scripted(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            fallback: None,
            log: Mutex::new(Vec::new()),
        }
    }

    /// A transport answering every dispatch with `step`
    pub fn always(step: ScriptStep) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(step),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Repeat `step` once the script runs out
    pub fn with_fallback(mut self, step: ScriptStep) -> Self {
        self.fallback = Some(step);
        self
    }

    /// Number of dispatches seen so far
    pub fn dispatch_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Every dispatch seen so far, in order
    pub fn dispatches(&self) -> Vec<DispatchRecord> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        node: &Node,
        request: WireRequest,
    ) -> Result<WireResponse, TransportError> {
        self.log.lock().push(DispatchRecord {
            node_account_id: node.account_id().clone(),
            request,
        });
        let step = self
            .script
            .lock()
            .pop_front()
            .or_else(|| self.fallback.clone());
        match step {
            Some(ScriptStep::Respond(response)) => Ok(response),
            Some(ScriptStep::Fail(error)) => Err(error),
            Some(ScriptStep::Hang) => std::future::pending().await,
            None => Err(TransportError::Other("mock script exhausted".into())),
        }
    }
}

/// A precheck response with the given status
pub fn precheck(status: Status) -> ScriptStep {
    ScriptStep::Respond(WireResponse::Precheck { status })
}

/// A receipt response: precheck `Ok`, receipt carrying `status`
pub fn receipt_with_status(status: Status) -> ScriptStep {
    ScriptStep::Respond(WireResponse::Receipt {
        precheck: Status::Ok,
        receipt: Some(meridian_client::TransactionReceipt::of(status)),
    })
}

/// A receipt response where the node has no receipt yet
pub fn receipt_missing() -> ScriptStep {
    ScriptStep::Respond(WireResponse::Receipt {
        precheck: Status::ReceiptNotFound,
        receipt: None,
    })
}

/// A deterministic pool of `n` plaintext nodes with account ids `0.0.3..`
pub fn test_pool(n: u64) -> NodePool {
    let nodes = (0..n)
        .map(|i| {
            Node::new(
                format!("10.0.0.{}:50211", i + 1),
                AccountId::from_num(3 + i),
            )
        })
        .collect();
    match NodePool::new(nodes) {
        Ok(pool) => pool,
        Err(_) => unreachable!("fixture pool construction is infallible for n >= 1"),
    }
}

/// The fixed operator account used by test fixtures
pub fn test_operator_account() -> AccountId {
    AccountId::from_num(950)
}

/// A deterministic operator: account `0.0.950`, fixed key material
pub fn test_operator() -> Operator {
    Operator::new(test_operator_account(), test_signer())
}

/// The fixed private key behind [`test_operator`]
pub fn test_signer() -> PrivateKey {
    PrivateKey::from_bytes(&[7; 32])
}

/// A client over `n` test nodes, the test operator, and `transport`
pub fn test_client(n: u64, transport: Arc<MockTransport>) -> Client {
    Client::new(test_pool(n), transport).with_operator(test_operator())
}

/// Install a subscriber printing engine traces for the current test run.
///
/// Honors `RUST_LOG`; repeated calls are no-ops so tests can call this
/// unconditionally.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
