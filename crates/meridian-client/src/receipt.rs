//! Receipts and eventual-consistency resolution
//!
//! Submission acceptance only means a node took custody of the request.
//! The terminal outcome materializes later as a receipt, so resolution is
//! a second executable request that polls until a terminal status exists.
//! A resolved receipt may still carry a failing status; validating that is
//! a separate, explicit step.

use crate::client::Client;
use crate::error::ClientError;
use crate::execute::{execute, Execute};
use crate::transport::{WireRequest, WireResponse};
use meridian_core::{
    classify_receipt, AccountId, ContractId, ExecutionState, FileId, ScheduleId, Status,
    Timestamp, TokenId, TopicId, TransactionId,
};
use serde::{Deserialize, Serialize};

/// The terminal outcome of a transaction, as recorded at consensus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// The terminal status
    pub status: Status,
    /// The account created by the transaction, when applicable
    pub account_id: Option<AccountId>,
    /// The token created by the transaction, when applicable
    pub token_id: Option<TokenId>,
    /// The contract created by the transaction, when applicable
    pub contract_id: Option<ContractId>,
    /// The file created by the transaction, when applicable
    pub file_id: Option<FileId>,
    /// The topic created by the transaction, when applicable
    pub topic_id: Option<TopicId>,
    /// The schedule created by the transaction, when applicable
    pub schedule_id: Option<ScheduleId>,
    /// Serial numbers minted by the transaction, when applicable
    pub serials: Vec<i64>,
}

impl TransactionReceipt {
    /// A receipt carrying only a status
    pub fn of(status: Status) -> Self {
        Self {
            status,
            account_id: None,
            token_id: None,
            contract_id: None,
            file_id: None,
            topic_id: None,
            schedule_id: None,
            serials: Vec::new(),
        }
    }

    /// Error unless the receipt's status is `Success`.
    ///
    /// Resolution success and business success are distinct: a resolved
    /// receipt may record that the network rejected the transaction.
    pub fn validate_status(&self, transaction_id: &TransactionId) -> Result<&Self, ClientError> {
        if self.status == Status::Success {
            Ok(self)
        } else {
            Err(ClientError::ReceiptStatus {
                transaction_id: transaction_id.clone(),
                receipt: self.clone(),
            })
        }
    }
}

/// Polls for the receipt of one transaction until a terminal status exists
#[derive(Debug, Clone)]
pub struct TransactionReceiptQuery {
    transaction_id: TransactionId,
    node_account_ids: Option<Vec<AccountId>>,
}

impl TransactionReceiptQuery {
    /// Query for the receipt of `transaction_id`
    pub fn new(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            node_account_ids: None,
        }
    }

    /// Restrict the query to the named nodes
    pub fn with_node_account_ids(mut self, node_account_ids: Vec<AccountId>) -> Self {
        self.node_account_ids = Some(node_account_ids);
        self
    }

    /// Poll until a terminal receipt exists or the engine gives up
    pub async fn execute(&self, client: &Client) -> Result<TransactionReceipt, ClientError> {
        execute(client, self).await
    }
}

impl Execute for TransactionReceiptQuery {
    type Output = TransactionReceipt;

    fn operation(&self) -> &'static str {
        "getTransactionReceipt"
    }

    fn transaction_id(&self) -> Option<&TransactionId> {
        Some(&self.transaction_id)
    }

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        self.node_account_ids.as_deref()
    }

    fn valid_until(&self) -> Option<Timestamp> {
        // Receipt polling is bounded by the engine deadline, not by the
        // transaction's validity window: the window limits submission,
        // while the receipt outlives it.
        None
    }

    fn make_request(&self, _node_account_id: &AccountId) -> Result<WireRequest, ClientError> {
        Ok(WireRequest::ReceiptQuery {
            transaction_id: self.transaction_id.clone(),
        })
    }

    fn classify(&self, response: &WireResponse) -> ExecutionState {
        match response {
            WireResponse::Receipt { precheck, receipt } => {
                classify_receipt(*precheck, receipt.as_ref().map(|r| r.status))
            }
            // A bare precheck means the query itself was turned away.
            WireResponse::Precheck { status } => classify_receipt(*status, None),
        }
    }

    fn terminal_error(&self, response: &WireResponse) -> ClientError {
        match response {
            // The poll itself went through; the carried receipt status is
            // what the caller was actually waiting on.
            WireResponse::Receipt {
                precheck: Status::Ok,
                receipt: Some(receipt),
            } => ClientError::ReceiptStatus {
                transaction_id: self.transaction_id.clone(),
                receipt: receipt.clone(),
            },
            WireResponse::Receipt { precheck, .. } => ClientError::Precheck {
                status: *precheck,
                transaction_id: Some(self.transaction_id.clone()),
            },
            WireResponse::Precheck { status } => ClientError::Precheck {
                status: *status,
                transaction_id: Some(self.transaction_id.clone()),
            },
        }
    }

    fn make_output(
        &self,
        _node_account_id: &AccountId,
        response: WireResponse,
    ) -> Result<Self::Output, ClientError> {
        match response {
            WireResponse::Receipt {
                receipt: Some(receipt),
                ..
            } => Ok(receipt),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

/// Proof that a node accepted a submission, and the handle for resolving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// The submitted transaction
    pub transaction_id: TransactionId,
    /// The node that accepted the submission
    pub node_account_id: AccountId,
    /// Content fingerprint of the submitted body
    pub transaction_hash: [u8; 32],
}

impl TransactionResponse {
    /// Resolve the receipt and validate its business status.
    ///
    /// Polls until a terminal receipt exists, then errors with
    /// [`ClientError::ReceiptStatus`] if the transaction was rejected at
    /// consensus. Use [`TransactionReceiptQuery`] directly to obtain a
    /// rejected receipt without the validation error.
    pub async fn get_receipt(&self, client: &Client) -> Result<TransactionReceipt, ClientError> {
        let receipt = TransactionReceiptQuery::new(self.transaction_id.clone())
            .execute(client)
            .await?;
        receipt.validate_status(&self.transaction_id)?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn query() -> TransactionReceiptQuery {
        TransactionReceiptQuery::new(TransactionId::with_valid_start(
            AccountId::from_num(7),
            Timestamp::new(100, 0),
        ))
    }

    #[test]
    fn pending_receipt_classifies_as_retry() {
        let q = query();
        let pending = WireResponse::Receipt {
            precheck: Status::Ok,
            receipt: Some(TransactionReceipt::of(Status::Unknown)),
        };
        assert_eq!(q.classify(&pending), ExecutionState::Retry);

        let missing = WireResponse::Precheck {
            status: Status::ReceiptNotFound,
        };
        assert_eq!(q.classify(&missing), ExecutionState::Retry);
    }

    #[test]
    fn terminal_receipt_classifies_as_success_even_when_rejected() {
        let q = query();
        let rejected = WireResponse::Receipt {
            precheck: Status::Ok,
            receipt: Some(TransactionReceipt::of(Status::InsufficientAccountBalance)),
        };
        assert_eq!(q.classify(&rejected), ExecutionState::Success);
    }

    #[test]
    fn transient_receipt_errors_name_the_observed_status() {
        let q = query();
        let pending = WireResponse::Receipt {
            precheck: Status::Ok,
            receipt: Some(TransactionReceipt::of(Status::Unknown)),
        };
        assert_matches!(
            q.terminal_error(&pending),
            ClientError::ReceiptStatus { ref receipt, .. }
                if receipt.status == Status::Unknown
        );

        let turned_away = WireResponse::Precheck {
            status: Status::Busy,
        };
        assert_matches!(
            q.terminal_error(&turned_away),
            ClientError::Precheck {
                status: Status::Busy,
                ..
            }
        );
    }

    #[test]
    fn validate_status_rejects_failed_receipts() {
        let id = TransactionId::with_valid_start(AccountId::from_num(7), Timestamp::new(100, 0));
        let receipt = TransactionReceipt::of(Status::InsufficientAccountBalance);
        assert_matches!(
            receipt.validate_status(&id),
            Err(ClientError::ReceiptStatus { .. })
        );
        assert!(TransactionReceipt::of(Status::Success)
            .validate_status(&id)
            .is_ok());
    }
}
