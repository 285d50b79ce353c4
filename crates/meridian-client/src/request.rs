//! Transaction drafting, freezing, and signing
//!
//! A draft is freely mutable. Freezing consumes it: defaults are resolved
//! (transaction id from the operator, node subset from the pool), transfers
//! are canonicalized, and one canonical body is serialized per target node,
//! differing only in the embedded node account id. The frozen form is
//! immutable by construction; signatures attach to the frozen bytes, so
//! every retry resubmits the identical envelope and the network can
//! deduplicate by content.

use crate::client::Client;
use crate::error::ClientError;
use crate::execute::{execute, Execute};
use crate::receipt::TransactionResponse;
use crate::transport::{WireRequest, WireResponse};
use meridian_core::{
    classify_submission, serialization, AccountId, ExecutionState, Hbar, Key, NftId, NftTransfer,
    SignatureMap, SignaturePair, Signer, Timestamp, TokenId, TokenTransfer,
    TokenTransferList, TransactionId,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest permitted memo, in bytes
pub const MAX_MEMO_BYTES: usize = 100;
/// Default validity window
pub const DEFAULT_VALID_DURATION: Duration = Duration::from_secs(120);
/// Longest permitted validity window
pub const MAX_VALID_DURATION: Duration = Duration::from_secs(180);

/// The signable content of one per-node envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TransactionBody {
    pub transaction_id: TransactionId,
    /// `None` only in the fingerprint form, which is node-independent
    pub node_account_id: Option<AccountId>,
    pub max_fee: Option<Hbar>,
    pub memo: String,
    pub valid_duration_secs: u64,
    pub token_transfers: Vec<TokenTransferList>,
}

/// One per-node frozen envelope: canonical body bytes plus signatures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// The node this envelope is addressed to
    pub node_account_id: AccountId,
    /// Canonical body bytes; signatures cover exactly these
    pub body: Vec<u8>,
    /// Signatures collected over `body`
    pub signatures: SignatureMap,
}

/// A mutable transfer transaction under construction
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    token_transfers: Vec<TokenTransfer>,
    nft_transfers: Vec<NftTransfer>,
    memo: String,
    max_fee: Option<Hbar>,
    valid_duration: Option<Duration>,
    node_account_ids: Option<Vec<AccountId>>,
    transaction_id: Option<TransactionId>,
}

impl TransactionDraft {
    /// An empty draft
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fungible transfer
    pub fn add_token_transfer(
        mut self,
        token_id: TokenId,
        account_id: AccountId,
        amount: i64,
    ) -> Self {
        self.token_transfers
            .push(TokenTransfer::new(token_id, account_id, amount));
        self
    }

    /// Add a fungible transfer spending an approved allowance
    pub fn add_approved_token_transfer(
        mut self,
        token_id: TokenId,
        account_id: AccountId,
        amount: i64,
    ) -> Self {
        let mut transfer = TokenTransfer::new(token_id, account_id, amount);
        transfer.approved = true;
        self.token_transfers.push(transfer);
        self
    }

    /// Add a fungible transfer asserting the token's decimals
    pub fn add_token_transfer_with_decimals(
        mut self,
        token_id: TokenId,
        account_id: AccountId,
        amount: i64,
        decimals: u32,
    ) -> Self {
        let mut transfer = TokenTransfer::new(token_id, account_id, amount);
        transfer.expected_decimals = Some(decimals);
        self.token_transfers.push(transfer);
        self
    }

    /// Add a non-fungible transfer
    pub fn add_nft_transfer(mut self, nft: NftId, sender: AccountId, receiver: AccountId) -> Self {
        self.nft_transfers.push(NftTransfer {
            token_id: nft.token_id,
            sender,
            receiver,
            serial: nft.serial,
            approved: false,
        });
        self
    }

    /// Add a non-fungible transfer spending an approved allowance
    pub fn add_approved_nft_transfer(
        mut self,
        nft: NftId,
        sender: AccountId,
        receiver: AccountId,
    ) -> Self {
        self.nft_transfers.push(NftTransfer {
            token_id: nft.token_id,
            sender,
            receiver,
            serial: nft.serial,
            approved: true,
        });
        self
    }

    /// Set the memo; length is validated at freeze
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Cap the fee the payer is willing to be charged
    pub fn max_fee(mut self, max_fee: Hbar) -> Self {
        self.max_fee = Some(max_fee);
        self
    }

    /// Set the validity window; bounds are validated at freeze
    pub fn valid_duration(mut self, valid_duration: Duration) -> Self {
        self.valid_duration = Some(valid_duration);
        self
    }

    /// Restrict submission to the named nodes
    pub fn node_account_ids(mut self, node_account_ids: Vec<AccountId>) -> Self {
        self.node_account_ids = Some(node_account_ids);
        self
    }

    /// Set an explicit transaction id instead of deriving one at freeze
    pub fn transaction_id(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Resolve defaults, canonicalize, and serialize into a frozen
    /// transaction. Consumes the draft; the result cannot be modified.
    pub fn freeze(self, client: &Client) -> Result<FrozenTransaction, ClientError> {
        // Rejected locally: no node ever sees an oversized memo, so this is
        // a construction error, not a network precheck.
        if self.memo.len() > MAX_MEMO_BYTES {
            return Err(ClientError::config(format!(
                "memo must not exceed {MAX_MEMO_BYTES} bytes"
            )));
        }
        let valid_duration = self.valid_duration.unwrap_or(DEFAULT_VALID_DURATION);
        if valid_duration.is_zero() || valid_duration > MAX_VALID_DURATION {
            return Err(ClientError::config(format!(
                "valid_duration must be within (0, {}s]",
                MAX_VALID_DURATION.as_secs()
            )));
        }

        let transaction_id = match self.transaction_id {
            Some(id) => id,
            None => TransactionId::generate(client.require_operator()?.account_id.clone()),
        };

        let node_account_ids = match self.node_account_ids {
            Some(ids) => {
                // Validates that every named node exists in the pool.
                client.pool().restrict(&ids)?;
                ids
            }
            None => client.pool().account_ids(),
        };

        let token_transfers =
            meridian_core::canonical_transfer_lists(self.token_transfers, self.nft_transfers)
                .map_err(ClientError::Core)?;

        let mut body = TransactionBody {
            transaction_id: transaction_id.clone(),
            node_account_id: None,
            max_fee: self.max_fee,
            memo: self.memo,
            valid_duration_secs: valid_duration.as_secs(),
            token_transfers,
        };

        // Fingerprint over the node-independent form.
        let fingerprint = serialization::hash_canonical(&body).map_err(ClientError::Core)?;

        let mut envelopes = Vec::with_capacity(node_account_ids.len());
        for node_account_id in &node_account_ids {
            body.node_account_id = Some(node_account_id.clone());
            let bytes = serialization::to_vec(&body).map_err(ClientError::Core)?;
            envelopes.push(SignedEnvelope {
                node_account_id: node_account_id.clone(),
                body: bytes,
                signatures: SignatureMap::new(),
            });
        }

        let valid_until = transaction_id.valid_start.plus(valid_duration);
        Ok(FrozenTransaction {
            transaction_id,
            node_account_ids,
            valid_until,
            fingerprint,
            envelopes,
        })
    }
}

/// An immutable, signable, executable transaction
#[derive(Debug, Clone)]
pub struct FrozenTransaction {
    transaction_id: TransactionId,
    node_account_ids: Vec<AccountId>,
    valid_until: Timestamp,
    fingerprint: [u8; 32],
    envelopes: Vec<SignedEnvelope>,
}

impl FrozenTransaction {
    /// The transaction id resolved at freeze
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// The nodes this transaction may be submitted to
    pub fn node_account_ids(&self) -> &[AccountId] {
        &self.node_account_ids
    }

    /// End of the validity window
    pub fn valid_until(&self) -> Timestamp {
        self.valid_until
    }

    /// Node-independent content fingerprint
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// The frozen envelope addressed to the named node
    pub fn envelope_for(&self, node_account_id: &AccountId) -> Option<&SignedEnvelope> {
        self.envelopes
            .iter()
            .find(|e| e.node_account_id == *node_account_id)
    }

    /// Sign every per-node envelope with `signer`.
    ///
    /// A second signature from the same public key is a structural error.
    pub fn sign_with(mut self, signer: &dyn Signer) -> Result<Self, ClientError> {
        let public_key = signer.public_key();
        for envelope in &mut self.envelopes {
            let signature = signer.sign(&envelope.body);
            envelope
                .signatures
                .add(SignaturePair {
                    public_key,
                    signature,
                })
                .map_err(ClientError::Core)?;
        }
        Ok(self)
    }

    /// Sign with the client's operator
    pub fn sign_with_operator(self, client: &Client) -> Result<Self, ClientError> {
        let operator = client.require_operator()?.clone();
        self.sign_with(operator.signer.as_ref())
    }

    /// Whether the collected signatures structurally satisfy `key` on
    /// every per-node envelope
    pub fn signatures_satisfy(&self, key: &Key) -> bool {
        self.envelopes
            .iter()
            .all(|e| key.is_satisfied_by(&e.signatures))
    }

    /// Submit until a node accepts custody or the engine gives up
    pub async fn execute(&self, client: &Client) -> Result<TransactionResponse, ClientError> {
        execute(client, self).await
    }
}

impl Execute for FrozenTransaction {
    type Output = TransactionResponse;

    fn operation(&self) -> &'static str {
        "submitTransaction"
    }

    fn transaction_id(&self) -> Option<&TransactionId> {
        Some(&self.transaction_id)
    }

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        Some(&self.node_account_ids)
    }

    fn valid_until(&self) -> Option<Timestamp> {
        Some(self.valid_until)
    }

    fn make_request(&self, node_account_id: &AccountId) -> Result<WireRequest, ClientError> {
        self.envelope_for(node_account_id)
            .cloned()
            .map(WireRequest::Submit)
            .ok_or_else(|| {
                ClientError::config(format!("no frozen envelope for node {node_account_id}"))
            })
    }

    fn classify(&self, response: &WireResponse) -> ExecutionState {
        match response {
            WireResponse::Precheck { status } => classify_submission(*status),
            WireResponse::Receipt { .. } => ExecutionState::RequestError,
        }
    }

    fn terminal_error(&self, response: &WireResponse) -> ClientError {
        match response {
            WireResponse::Precheck { status } => ClientError::Precheck {
                status: *status,
                transaction_id: Some(self.transaction_id.clone()),
            },
            WireResponse::Receipt { .. } => ClientError::UnexpectedResponse,
        }
    }

    fn make_output(
        &self,
        node_account_id: &AccountId,
        _response: WireResponse,
    ) -> Result<Self::Output, ClientError> {
        Ok(TransactionResponse {
            transaction_id: self.transaction_id.clone(),
            node_account_id: node_account_id.clone(),
            transaction_hash: self.fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Operator;
    use crate::node::Node;
    use crate::pool::NodePool;
    use crate::transport::{Transport, TransportError};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use meridian_core::{KeyList, PrivateKey};
    use std::sync::Arc;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn send(
            &self,
            _node: &Node,
            _request: WireRequest,
        ) -> Result<WireResponse, TransportError> {
            Err(TransportError::Other("transport unused in this test".into()))
        }
    }

    fn client(nodes: u64) -> Client {
        let pool = NodePool::new(
            (0..nodes)
                .map(|i| {
                    Node::new(
                        format!("10.0.0.{}:50211", i + 1),
                        AccountId::from_num(3 + i),
                    )
                })
                .collect(),
        )
        .unwrap();
        Client::new(pool, Arc::new(NoTransport)).with_operator(Operator::new(
            AccountId::from_num(950),
            PrivateKey::from_bytes(&[7; 32]),
        ))
    }

    fn draft() -> TransactionDraft {
        TransactionDraft::new().add_token_transfer(
            TokenId::from_num(500),
            AccountId::from_num(10),
            -25,
        )
    }

    #[test]
    fn freeze_resolves_operator_transaction_id_and_all_nodes() {
        let client = client(3);
        let frozen = draft().freeze(&client).unwrap();
        assert_eq!(
            frozen.transaction_id().account_id,
            AccountId::from_num(950)
        );
        assert_eq!(frozen.node_account_ids().len(), 3);
        for id in frozen.node_account_ids() {
            assert!(frozen.envelope_for(id).is_some());
        }
    }

    #[test]
    fn envelopes_differ_only_by_node_and_share_a_fingerprint() {
        let client = client(2);
        let frozen = draft().freeze(&client).unwrap();
        let a = frozen.envelope_for(&AccountId::from_num(3)).unwrap();
        let b = frozen.envelope_for(&AccountId::from_num(4)).unwrap();
        assert_ne!(a.body, b.body);

        let body_a: TransactionBody = serialization::from_slice(&a.body).unwrap();
        let body_b: TransactionBody = serialization::from_slice(&b.body).unwrap();
        assert_eq!(body_a.node_account_id, Some(AccountId::from_num(3)));
        assert_eq!(body_b.node_account_id, Some(AccountId::from_num(4)));

        let mut neutral_a = body_a;
        neutral_a.node_account_id = None;
        let mut neutral_b = body_b;
        neutral_b.node_account_id = None;
        assert_eq!(neutral_a, neutral_b);
        assert_eq!(
            serialization::hash_canonical(&neutral_a).unwrap(),
            frozen.fingerprint()
        );
    }

    #[test]
    fn identical_drafts_share_a_fingerprint_regardless_of_insertion_order() {
        let client = client(1);
        let id = TransactionId::with_valid_start(
            AccountId::from_num(950),
            Timestamp::new(1_000_000, 0),
        );
        let forward = TransactionDraft::new()
            .transaction_id(id.clone())
            .add_token_transfer(TokenId::from_num(500), AccountId::from_num(10), -25)
            .add_token_transfer(TokenId::from_num(500), AccountId::from_num(11), 25)
            .freeze(&client)
            .unwrap();
        let reversed = TransactionDraft::new()
            .transaction_id(id)
            .add_token_transfer(TokenId::from_num(500), AccountId::from_num(11), 25)
            .add_token_transfer(TokenId::from_num(500), AccountId::from_num(10), -25)
            .freeze(&client)
            .unwrap();
        assert_eq!(forward.fingerprint(), reversed.fingerprint());
    }

    #[test]
    fn freeze_without_operator_or_explicit_id_fails() {
        let pool = NodePool::new(vec![Node::new("10.0.0.1:50211", AccountId::from_num(3))]).unwrap();
        let client = Client::new(pool, Arc::new(NoTransport));
        assert_matches!(draft().freeze(&client), Err(ClientError::Config { .. }));
    }

    #[test]
    fn freeze_rejects_oversized_memo_and_unknown_nodes() {
        let client = client(1);
        let long_memo = "m".repeat(MAX_MEMO_BYTES + 1);
        assert_matches!(
            draft().memo(long_memo).freeze(&client),
            Err(ClientError::Config { .. })
        );
        assert_matches!(
            draft()
                .node_account_ids(vec![AccountId::from_num(99)])
                .freeze(&client),
            Err(ClientError::Config { .. })
        );
    }

    #[test]
    fn signing_covers_every_envelope_and_rejects_duplicates() {
        let client = client(2);
        let signer = PrivateKey::from_bytes(&[9; 32]);
        let frozen = draft().freeze(&client).unwrap().sign_with(&signer).unwrap();

        for id in frozen.node_account_ids().to_vec() {
            let envelope = frozen.envelope_for(&id).unwrap();
            assert_eq!(envelope.signatures.len(), 1);
            let pair = envelope.signatures.iter().next().unwrap();
            assert!(pair.public_key.verify(&envelope.body, &pair.signature));
        }

        assert_matches!(
            frozen.sign_with(&signer),
            Err(ClientError::Core(
                meridian_core::MeridianError::DuplicateSignature { .. }
            ))
        );
    }

    #[test]
    fn signature_satisfaction_bridges_to_the_key_model() {
        let client = client(1);
        let (a, b) = (
            PrivateKey::from_bytes(&[1; 32]),
            PrivateKey::from_bytes(&[2; 32]),
        );
        let threshold: Key = KeyList::with_threshold(
            vec![
                Key::Single(a.public_key()),
                Key::Single(b.public_key()),
            ],
            1,
        )
        .into();

        let frozen = draft().freeze(&client).unwrap();
        assert!(!frozen.signatures_satisfy(&threshold));
        let frozen = frozen.sign_with(&b).unwrap();
        assert!(frozen.signatures_satisfy(&threshold));
    }
}
